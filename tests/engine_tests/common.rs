//! Shared helpers for log tests

use std::path::Path;

use tempfile::TempDir;
use writeahead::codec::encode_record;
use writeahead::{Config, SyncStrategy, WriteAhead};

pub fn setup_temp_log() -> (TempDir, WriteAhead) {
    let temp_dir = TempDir::new().unwrap();
    let log = open_log(temp_dir.path());
    (temp_dir, log)
}

pub fn open_log(dir: &Path) -> WriteAhead {
    let config = Config::builder()
        .directory(dir)
        .sync_strategy(SyncStrategy::EveryBatch) // Sync every batch for test reliability
        .build();
    WriteAhead::open(config).unwrap()
}

/// On-disk size of a single-record frame
pub fn frame_len(keys: &[&str], payload: &[u8]) -> u64 {
    let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    encode_record(&keys, payload).unwrap().len() as u64
}
