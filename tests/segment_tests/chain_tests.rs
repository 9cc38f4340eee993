//! Tests for SegmentChain lookups over recovered segments

use tempfile::TempDir;
use writeahead::segment::{recover, SegmentChain, SegmentState};

use crate::common::write_segment;

fn chain_of(dir: &std::path::Path) -> SegmentChain {
    let (segments, _) = recover(dir).unwrap();
    SegmentChain::new(segments)
}

#[test]
fn test_only_last_segment_is_active() {
    let temp = TempDir::new().unwrap();
    write_segment(temp.path(), 0, &[("a", "1")]);
    write_segment(temp.path(), 1, &[("a", "2")]);
    write_segment(temp.path(), 2, &[]);

    let chain = chain_of(temp.path());

    assert_eq!(chain.ids(), vec![0, 1, 2]);
    assert_eq!(chain.active().unwrap().id(), 2);
    assert_eq!(chain.active().unwrap().state(), SegmentState::Active);
    assert_eq!(chain.oldest_retirable().unwrap().state(), SegmentState::ReadOnly);
}

#[test]
fn test_latest_prefers_newest_segment() {
    let temp = TempDir::new().unwrap();
    write_segment(temp.path(), 0, &[("a", "old"), ("b", "only-old")]);
    write_segment(temp.path(), 1, &[("a", "new")]);

    let chain = chain_of(temp.path());

    assert_eq!(&chain.latest("a").unwrap().unwrap().payload()[..], b"new");
    assert_eq!(&chain.latest("b").unwrap().unwrap().payload()[..], b"only-old");
    assert!(chain.latest("missing").unwrap().is_none());
}

#[test]
fn test_read_returns_history_oldest_first() {
    let temp = TempDir::new().unwrap();
    write_segment(temp.path(), 0, &[("a", "1"), ("a,b", "2")]);
    write_segment(temp.path(), 1, &[("a", "3")]);

    let chain = chain_of(temp.path());
    let history: Vec<_> = chain.read("a").unwrap().iter().map(|p| p.to_vec()).collect();

    assert_eq!(history, vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
    assert_eq!(chain.read("b").unwrap().len(), 1);
    assert!(chain.read("missing").unwrap().is_empty());
}

#[test]
fn test_head_is_empty_with_a_single_segment() {
    let temp = TempDir::new().unwrap();
    write_segment(temp.path(), 0, &[("a", "1")]);

    let chain = chain_of(temp.path());

    assert!(chain.head().unwrap().is_empty());
    assert!(chain.oldest_retirable().is_none());
}

#[test]
fn test_head_lists_only_the_oldest_segment() {
    let temp = TempDir::new().unwrap();
    write_segment(temp.path(), 0, &[("a", "1"), ("b", "2")]);
    write_segment(temp.path(), 1, &[("c", "3")]);

    let chain = chain_of(temp.path());
    let head = chain.head().unwrap();

    assert_eq!(head.len(), 2);
    assert_eq!(head[0].keys(), ["a".to_string()]);
    assert_eq!(head[1].keys(), ["b".to_string()]);
}
