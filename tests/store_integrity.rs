//! Legacy store integrity tests
//!
//! Corruption must fail the open, never yield partial data. Resource bounds
//! (handle pool, create-if-missing) hold across reopen.

use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};

use aerodb_migrate::storage::{segment_file_name, Direction, KvStore, StoreOptions, WriteBatch};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn create_temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

fn options() -> StoreOptions {
    StoreOptions::default().with_create_if_missing(true)
}

fn flip_byte(path: &std::path::Path, from_end: u64) {
    let len = fs::metadata(path).unwrap().len();
    let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(len - from_end)).unwrap();
    let mut byte = [0u8; 1];
    std::io::Read::read_exact(&mut file, &mut byte).unwrap();
    file.seek(SeekFrom::Start(len - from_end)).unwrap();
    file.write_all(&[byte[0] ^ 0xFF]).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Corruption
// =============================================================================

/// A flipped value byte fails the checksum and the whole open.
#[test]
fn test_corrupt_segment_fails_open() {
    let temp_dir = create_temp_data_dir();
    {
        let store = KvStore::open(temp_dir.path(), options()).unwrap();
        store.put(b"series:cpu".to_vec(), b"payload-one".to_vec()).unwrap();
        store.put(b"series:mem".to_vec(), b"payload-two".to_vec()).unwrap();
        store.close();
    }

    // Last 4 bytes are the checksum; 6 from the end is inside the value.
    flip_byte(&temp_dir.path().join(segment_file_name(1)), 6);

    let err = KvStore::open(temp_dir.path(), options()).err().unwrap();
    assert_eq!(err.code().code(), "AERO_STORE_CORRUPTION");
    assert!(err.is_fatal());
}

/// A truncated tail is corruption too.
#[test]
fn test_truncated_segment_fails_open() {
    let temp_dir = create_temp_data_dir();
    {
        let store = KvStore::open(temp_dir.path(), options()).unwrap();
        store.put(b"k".to_vec(), b"v".repeat(64)).unwrap();
        store.close();
    }

    let path = temp_dir.path().join(segment_file_name(1));
    let len = fs::metadata(&path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(len - 10).unwrap();

    let err = KvStore::open(temp_dir.path(), options()).err().unwrap();
    assert_eq!(err.code().code(), "AERO_STORE_CORRUPTION");
}

// =============================================================================
// Open semantics
// =============================================================================

#[test]
fn test_create_if_missing_on_absent_shard() {
    let temp_dir = create_temp_data_dir();
    let path = temp_dir.path().join("shard_db").join("9");

    let store = KvStore::open(&path, options()).unwrap();
    assert!(path.is_dir());
    assert_eq!(store.stats().unwrap().keys, 0);
    assert!(store.keys_with_prefix(b"").unwrap().is_empty());
}

#[test]
fn test_missing_store_without_create_is_not_found() {
    let temp_dir = create_temp_data_dir();
    let path = temp_dir.path().join("absent");

    let err = KvStore::open(&path, StoreOptions::default()).err().unwrap();
    assert_eq!(err.code().code(), "AERO_STORE_NOT_FOUND");
    assert!(!path.exists());
}

/// Latest record wins and tombstones survive reopen.
#[test]
fn test_reopen_replays_overwrites_and_deletes() {
    let temp_dir = create_temp_data_dir();
    {
        let store = KvStore::open(temp_dir.path(), options()).unwrap();
        let mut batch = WriteBatch::new();
        batch.put(b"a".to_vec(), b"1".to_vec());
        batch.put(b"b".to_vec(), b"1".to_vec());
        batch.put(b"a".to_vec(), b"2".to_vec());
        batch.delete(b"b".to_vec());
        store.write(batch).unwrap();
        store.close();
    }

    let store = KvStore::open(temp_dir.path(), options()).unwrap();
    assert_eq!(store.get(b"a").unwrap(), Some(b"2".to_vec()));
    assert_eq!(store.get(b"b").unwrap(), None);
    assert_eq!(store.stats().unwrap().keys, 1);
}

// =============================================================================
// Iteration and resource bounds
// =============================================================================

#[test]
fn test_reverse_prefix_iteration() {
    let temp_dir = create_temp_data_dir();
    let store = KvStore::open(temp_dir.path(), options()).unwrap();
    for i in 0u8..5 {
        store.put(vec![b'p', i], vec![i]).unwrap();
    }
    store.put(b"q".to_vec(), b"other".to_vec()).unwrap();

    let values: Vec<u8> = store
        .iter_prefix(b"p", Direction::Reverse)
        .map(|entry| entry.unwrap().1[0])
        .collect();
    assert_eq!(values, vec![4, 3, 2, 1, 0]);
}

/// Reads spread over many segments never hold more handles than allowed.
#[test]
fn test_open_handles_bounded_across_segments() {
    let temp_dir = create_temp_data_dir();
    let options = options().with_max_open_files(2).with_segment_size(1).with_cache_size(0);
    let store = KvStore::open(temp_dir.path(), options).unwrap();

    for i in 0u8..6 {
        store.put(vec![b'k', i], vec![i; 8]).unwrap();
    }
    assert!(store.stats().unwrap().active_segment >= 6);

    for _ in 0..2 {
        for i in 0u8..6 {
            assert_eq!(store.get(&[b'k', i]).unwrap(), Some(vec![i; 8]));
            assert!(store.stats().unwrap().open_handles <= 2);
        }
    }

    store.close();
    let reopened = KvStore::open(temp_dir.path(), options).unwrap();
    assert_eq!(reopened.stats().unwrap().keys, 6);
    assert_eq!(reopened.stats().unwrap().open_handles, 0);
}
