//! walctl
//!
//! Read-only inspection of a write-ahead log directory.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use writeahead::segment::{directory, replay_segment};

/// walctl
#[derive(Parser, Debug)]
#[command(name = "walctl")]
#[command(about = "Inspect write-ahead log segments")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List segments with their sizes and block counts
    Segments {
        /// Log directory
        directory: PathBuf,
    },

    /// Print every record of one or all segments
    Dump {
        /// Log directory
        directory: PathBuf,

        /// Only this segment
        #[arg(short, long)]
        segment: Option<u64>,

        /// Print payloads (lossy UTF-8)
        #[arg(short, long)]
        payloads: bool,
    },

    /// Check every segment for torn or corrupt frames
    Verify {
        /// Log directory
        directory: PathBuf,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,writeahead=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let outcome = match args.command {
        Commands::Segments { directory } => segments(&directory),
        Commands::Dump {
            directory,
            segment,
            payloads,
        } => dump(&directory, segment, payloads),
        Commands::Verify { directory } => verify(&directory),
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            tracing::error!("walctl failed: {}", e);
            process::exit(1);
        }
    }
}

fn segments(dir: &Path) -> writeahead::Result<bool> {
    for id in directory::list_segment_ids(dir)? {
        let replayed = replay_segment(dir, id)?;
        println!(
            "{:>8}  {:>12} bytes  {:>8} frames  {:>8} blocks  {:>6} keys",
            id,
            replayed.file_len,
            replayed.frames,
            replayed.segment.block_count(),
            replayed.segment.key_count()
        );
    }
    Ok(true)
}

fn dump(dir: &Path, only: Option<u64>, payloads: bool) -> writeahead::Result<bool> {
    let ids = match only {
        Some(id) => vec![id],
        None => directory::list_segment_ids(dir)?,
    };

    for id in ids {
        let replayed = replay_segment(dir, id)?;
        println!("segment {}", id);
        for block in replayed.segment.blocks() {
            let position = block.position().unwrap_or_default();
            let length = block.length().unwrap_or_default();
            if payloads {
                let entry = replayed.segment.load(&block)?;
                println!(
                    "  @{:<10} {:>6}B {:?} {}",
                    position,
                    length,
                    block.keys(),
                    String::from_utf8_lossy(entry.payload())
                );
            } else {
                println!("  @{:<10} {:>6}B {:?}", position, length, block.keys());
            }
        }
    }
    Ok(true)
}

fn verify(dir: &Path) -> writeahead::Result<bool> {
    let mut clean = true;

    for id in directory::list_segment_ids(dir)? {
        let replayed = replay_segment(dir, id)?;
        match replayed.stop {
            Some(reason) if replayed.has_torn_tail() => {
                clean = false;
                println!(
                    "{:>8}  DAMAGED  {} at byte {} of {}",
                    id, reason, replayed.valid_len, replayed.file_len
                );
            }
            _ => println!("{:>8}  ok       {} frames", id, replayed.frames),
        }
    }

    Ok(clean)
}
