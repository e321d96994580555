//! Journal Recovery Tests
//!
//! - Every acknowledged event survives a restart
//! - Replay rebuilds identical buckets, ledgers and versioning states
//! - Sequence numbers and rename disambiguators continue after restart
//! - Any corruption makes open fail; there is no partial replay

use std::fs::{self, OpenOptions};
use std::io::Write;

use arczone::applier::ObjectWrite;
use arczone::namespace::BucketState;
use arczone::versioning::VersioningState;
use arczone::wal::journal_path;
use arczone::{ArchiveConfig, ArchiveEngine, ArchiveError};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn open_engine(dir: &TempDir) -> ArchiveEngine {
    ArchiveEngine::open(ArchiveConfig::new(dir.path())).expect("Failed to open engine")
}

/// Builds a small archive: two buckets, one retired, a few versions.
fn populate(engine: &ArchiveEngine) {
    engine.on_bucket_create("photos").unwrap();
    engine.on_bucket_create("logs").unwrap();

    engine
        .on_object_write(&ObjectWrite::new("photos", "cat.jpg", 10, "e1").with_source_version("s1"))
        .unwrap();
    engine
        .on_object_write(&ObjectWrite::new("photos", "cat.jpg", 11, "e2").with_source_version("s2"))
        .unwrap();
    engine.on_object_delete("photos", "cat.jpg").unwrap();

    engine
        .on_object_write(&ObjectWrite::new("logs", "day1", 5, "e3"))
        .unwrap();
    engine.on_bucket_delete("logs").unwrap();
}

// =============================================================================
// Restart reproduces state
// =============================================================================

#[test]
fn test_restart_reproduces_state() {
    let dir = TempDir::new().unwrap();

    let (buckets_before, photos_id, ledger_before, last_seq) = {
        let engine = open_engine(&dir);
        populate(&engine);
        let photos_id = engine.resolve_active("photos").unwrap();
        (
            engine.list_buckets().unwrap(),
            photos_id.clone(),
            engine.get_ledger(&photos_id, "cat.jpg").unwrap(),
            engine.last_sequence_number().unwrap(),
        )
    };

    let engine = open_engine(&dir);
    assert_eq!(engine.list_buckets().unwrap(), buckets_before);
    assert_eq!(engine.get_ledger(&photos_id, "cat.jpg").unwrap(), ledger_before);
    assert_eq!(engine.last_sequence_number().unwrap(), last_seq);
    assert_eq!(engine.metrics().records_replayed, last_seq);

    let photos = engine.bucket(&photos_id).unwrap();
    assert_eq!(photos.versioning(), VersioningState::On);

    let logs = engine.generations("logs").unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].state(), BucketState::Retired);
    assert_eq!(
        engine
            .get_latest(logs[0].archive_bucket_id(), "day1")
            .unwrap()
            .etag(),
        Some("e3")
    );
}

#[test]
fn test_dedup_survives_restart() {
    let dir = TempDir::new().unwrap();
    let write = ObjectWrite::new("b", "foo", 3, "e1").with_source_version("s1");

    let first = {
        let engine = open_engine(&dir);
        engine.on_bucket_create("b").unwrap();
        engine.on_object_write(&write).unwrap()
    };

    let engine = open_engine(&dir);
    let again = engine.on_object_write(&write).unwrap();
    assert!(again.deduplicated);
    assert_eq!(again.version_id, first.version_id);
}

#[test]
fn test_numbering_continues_after_restart() {
    let dir = TempDir::new().unwrap();

    let (first_rename, last_version) = {
        let engine = open_engine(&dir);
        engine.on_bucket_create("a").unwrap();
        let v = engine
            .on_object_write(&ObjectWrite::new("a", "k", 1, "e"))
            .unwrap()
            .version_id;
        (engine.on_bucket_delete("a").unwrap(), v)
    };
    assert_eq!(first_rename, "a-deleted-1");

    let engine = open_engine(&dir);
    engine.on_bucket_create("b").unwrap();
    let v = engine
        .on_object_write(&ObjectWrite::new("b", "k", 1, "e"))
        .unwrap()
        .version_id;
    assert!(v.as_str() > last_version.as_str());
    assert_eq!(engine.on_bucket_delete("b").unwrap(), "b-deleted-2");
}

#[test]
fn test_empty_journal_opens_clean() {
    let dir = TempDir::new().unwrap();
    drop(open_engine(&dir));

    let engine = open_engine(&dir);
    assert!(engine.list_buckets().unwrap().is_empty());
    assert_eq!(engine.last_sequence_number().unwrap(), 0);
}

// =============================================================================
// Corruption is fatal
// =============================================================================

#[test]
fn test_flipped_byte_fails_open() {
    let dir = TempDir::new().unwrap();
    {
        let engine = open_engine(&dir);
        populate(&engine);
    }

    let path = journal_path(dir.path());
    let mut bytes = fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let err = ArchiveEngine::open(ArchiveConfig::new(dir.path())).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, ArchiveError::Journal(_)));
}

#[test]
fn test_truncated_tail_fails_open() {
    let dir = TempDir::new().unwrap();
    {
        let engine = open_engine(&dir);
        populate(&engine);
    }

    let path = journal_path(dir.path());
    let len = fs::metadata(&path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(len - 3).unwrap();

    let err = ArchiveEngine::open(ArchiveConfig::new(dir.path())).unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn test_trailing_garbage_fails_open() {
    let dir = TempDir::new().unwrap();
    {
        let engine = open_engine(&dir);
        engine.on_bucket_create("b").unwrap();
    }

    let path = journal_path(dir.path());
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[0xAB; 32]).unwrap();

    assert!(ArchiveEngine::open(ArchiveConfig::new(dir.path())).is_err());
}
