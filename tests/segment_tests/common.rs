//! Shared helpers: build segment files by hand

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use writeahead::codec::encode_record;
use writeahead::segment::directory;

/// Append one single-record frame per `(keys, payload)` to segment `id`,
/// returning the frame lengths. Keys are comma separated.
pub fn write_segment(dir: &Path, id: u64, records: &[(&str, &str)]) -> Vec<u64> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(directory::segment_path(dir, id))
        .unwrap();

    let mut lengths = Vec::new();
    for (keys, payload) in records {
        let keys: Vec<String> = keys
            .split(',')
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        let frame = encode_record(&keys, payload.as_bytes()).unwrap();
        file.write_all(&frame).unwrap();
        lengths.push(frame.len() as u64);
    }
    lengths
}

/// Append raw bytes to segment `id`
pub fn append_garbage(dir: &Path, id: u64, bytes: &[u8]) {
    let mut file = OpenOptions::new()
        .append(true)
        .open(directory::segment_path(dir, id))
        .unwrap();
    file.write_all(bytes).unwrap();
}

pub fn file_len(dir: &Path, id: u64) -> u64 {
    fs::metadata(directory::segment_path(dir, id)).unwrap().len()
}
