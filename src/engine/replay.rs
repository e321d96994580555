//! Journal replay at startup
//!
//! - Starts at byte 0 and reads sequentially
//! - Every record is checksum-verified by the reader
//! - Records carry post-decision state; replay re-applies, never re-decides
//! - On ANY corruption or inconsistency: abort, no partial state

use std::collections::HashMap;
use std::path::Path;

use crate::errors::{ArchiveError, ArchiveResult};
use crate::ledger::{ObjectVersion, VersionLedgerEntry};
use crate::namespace::{NamespaceTable, RenameTarget};
use crate::versioning::VersioningState;
use crate::wal::{journal_path, JournalPayload, JournalReader, JournalRecord};

use super::state::LedgerKey;

/// Statistics from journal replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub records_replayed: u64,
    pub buckets_created: u64,
    pub buckets_retired: u64,
    pub versions_appended: u64,
    pub delete_markers_appended: u64,
    pub delete_markers_removed: u64,
    pub versioning_activations: u64,
    pub final_sequence: u64,
}

/// State rebuilt from the journal, before it is wrapped in locks.
#[derive(Debug, Default)]
pub struct RecoveredState {
    pub namespace: NamespaceTable,
    pub ledgers: HashMap<LedgerKey, VersionLedgerEntry>,
}

impl RecoveredState {
    /// Re-applies one committed record.
    pub fn apply(&mut self, record: &JournalRecord, stats: &mut ReplayStats) -> ArchiveResult<()> {
        match &record.payload {
            JournalPayload::BucketCreated {
                logical_name,
                archive_bucket_id,
                generation,
                created_at,
            } => {
                self.namespace.commit_create(
                    logical_name,
                    archive_bucket_id,
                    *generation,
                    *created_at,
                )?;
                stats.buckets_created += 1;
            }
            JournalPayload::BucketRetired {
                logical_name,
                generation,
                renamed_id,
                disambiguator,
                retired_at,
            } => {
                let target = RenameTarget {
                    archive_bucket_id: renamed_id.clone(),
                    disambiguator: *disambiguator,
                };
                self.namespace
                    .commit_retire(logical_name, *generation, &target, *retired_at)?;
                stats.buckets_retired += 1;
            }
            JournalPayload::VersionAppended {
                archive_bucket_id,
                key,
                version_id,
                kind,
                source,
                activated_versioning,
            } => {
                let handle = self.namespace.bucket(archive_bucket_id)?.handle();

                if *activated_versioning {
                    let versioning = self.namespace.versioning_mut(handle)?;
                    if *versioning != VersioningState::Off {
                        return Err(ArchiveError::invariant(format!(
                            "bucket {} activated versioning twice (sequence {})",
                            archive_bucket_id, record.sequence_number
                        )));
                    }
                    versioning.coerce_for_write()?;
                    versioning.complete_activation();
                    stats.versioning_activations += 1;
                }

                let entry = self
                    .ledgers
                    .entry(LedgerKey::new(handle, key.clone()))
                    .or_insert_with(|| VersionLedgerEntry::new(key.clone()));
                entry.append(ObjectVersion::new(
                    version_id.clone(),
                    kind.clone(),
                    record.sequence_number,
                    source.clone(),
                ))?;

                if kind.is_delete_marker() {
                    stats.delete_markers_appended += 1;
                } else {
                    stats.versions_appended += 1;
                }
            }
            JournalPayload::DeleteMarkerRemoved {
                archive_bucket_id,
                key,
                version_id,
            } => {
                let handle = self.namespace.bucket(archive_bucket_id)?.handle();
                let entry = self
                    .ledgers
                    .get_mut(&LedgerKey::new(handle, key.clone()))
                    .ok_or_else(|| ArchiveError::no_such_key(key.clone()))?;
                entry.remove_delete_marker(version_id)?;
                stats.delete_markers_removed += 1;
            }
        }

        stats.records_replayed += 1;
        stats.final_sequence = record.sequence_number;
        Ok(())
    }
}

/// Replays the journal under `data_dir` into fresh state.
///
/// A missing journal replays as empty. Any record that does not apply
/// cleanly is reported as an invariant violation at its sequence number.
pub fn replay(data_dir: &Path) -> ArchiveResult<(RecoveredState, ReplayStats)> {
    let mut state = RecoveredState::default();
    let mut stats = ReplayStats::default();

    let path = journal_path(data_dir);
    if !path.exists() {
        return Ok((state, stats));
    }

    let reader = JournalReader::open(&path)?;
    for record in reader {
        let record = record?;
        state.apply(&record, &mut stats).map_err(|e| match e {
            ArchiveError::Journal(_) | ArchiveError::LockPoisoned(_) => e,
            other => ArchiveError::invariant(format!(
                "journal record {} does not apply: {}",
                record.sequence_number, other
            )),
        })?;
    }

    Ok((state, stats))
}
