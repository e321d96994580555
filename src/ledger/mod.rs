//! Version Ledger
//!
//! Per-(archive bucket, key) history of retained object versions and delete
//! markers. Leaf data structure: no locking, no journaling, no knowledge of
//! buckets. The engine owns every entry and serializes access per key.
//!
//! - `ObjectVersion` - one revision or delete marker
//! - `VersionLedgerEntry` - newest-first history of one key

mod entry;
mod version;

pub use entry::VersionLedgerEntry;
pub use version::{
    LogicalTimestamp, ObjectVersion, SourceIdentity, VersionId, VersionKind, SOURCE_NULL_VERSION,
    UNVERSIONED,
};
