//! Segment directory
//!
//! Naming and file handling for segment files. A segment file is named by
//! its decimal id (`0`, `1`, `2`, ...); anything else in the directory is
//! ignored.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Discover segment ids in `dir`, sorted oldest first
pub fn list_segment_ids(dir: &Path) -> io::Result<Vec<u64>> {
    let mut ids = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if let Some(id) = parse_segment_id(&path) {
                ids.push(id);
            }
        }
    }

    ids.sort_unstable();
    Ok(ids)
}

/// File path of segment `id`
pub fn segment_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(id.to_string())
}

/// Parse a segment id from a file name
/// "42" → Some(42), "42.tmp" → None
pub fn parse_segment_id(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

/// Create a new, empty segment file; fails if it already exists
pub fn create_segment(dir: &Path, id: u64) -> io::Result<File> {
    OpenOptions::new()
        .create_new(true)
        .append(true)
        .open(segment_path(dir, id))
}

/// Open segment `id` for appending, creating it if missing
pub fn open_append(dir: &Path, id: u64) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(segment_path(dir, id))
}

/// Remove the file of a retired segment
pub fn remove_segment(dir: &Path, id: u64) -> io::Result<()> {
    fs::remove_file(segment_path(dir, id))
}
