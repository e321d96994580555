//! # Archive Engine
//!
//! Owns the namespace table, every version ledger, and the journal.
//! Every mutation is computed, journaled (write + fsync), and only then
//! published in memory; a journal failure leaves memory untouched.
//!
//! The event entry points (`on_*`, `apply`) live in `crate::applier`.

mod replay;
mod state;

pub use replay::{replay, RecoveredState, ReplayStats};
pub use state::LedgerKey;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::config::ArchiveConfig;
use crate::errors::{ArchiveError, ArchiveResult};
use crate::ledger::{ObjectVersion, VersionId, VersionLedgerEntry};
use crate::namespace::{BucketHandle, BucketRecord, NamespaceTable};
use crate::observability::{log_event, log_event_with_fields, Event, MetricsRegistry, MetricsSnapshot};
use crate::wal::{Appended, JournalPayload, JournalWriter};

pub(crate) use state::{lock_entry, ArchiveState};

pub struct ArchiveEngine {
    config: ArchiveConfig,
    pub(crate) state: ArchiveState,
    journal: Mutex<JournalWriter>,
    /// Set by the first FATAL journal error; no further commits after it.
    halted: AtomicBool,
    pub(crate) metrics: MetricsRegistry,
}

impl ArchiveEngine {
    /// Opens the archive under `config.data_dir`, replaying the journal.
    ///
    /// # Errors
    ///
    /// Any journal corruption or record that does not apply is FATAL and
    /// aborts the open; there is no partial replay.
    pub fn open(config: ArchiveConfig) -> ArchiveResult<Self> {
        config.validate()?;
        let data_dir = config.data_path().display().to_string();
        log_event_with_fields(Event::EngineOpenStart, &[("data_dir", &data_dir)]);

        log_event(Event::JournalReplayBegin);
        let (recovered, stats) = match replay(config.data_path()) {
            Ok(result) => result,
            Err(e) => {
                log_event_with_fields(
                    Event::JournalCorruption,
                    &[("code", e.code()), ("error", &e.to_string())],
                );
                return Err(e);
            }
        };
        log_event_with_fields(
            Event::JournalReplayComplete,
            &[
                ("records_replayed", &stats.records_replayed.to_string()),
                ("final_sequence", &stats.final_sequence.to_string()),
            ],
        );

        let journal = JournalWriter::open(config.data_path())?;
        if journal.last_sequence_number() != stats.final_sequence {
            return Err(ArchiveError::invariant(format!(
                "journal ends at sequence {} but replay stopped at {}",
                journal.last_sequence_number(),
                stats.final_sequence
            )));
        }

        let metrics = MetricsRegistry::new();
        metrics.add_records_replayed(stats.records_replayed);

        let engine = Self {
            state: ArchiveState::new(recovered.namespace, recovered.ledgers),
            journal: Mutex::new(journal),
            halted: AtomicBool::new(false),
            metrics,
            config,
        };

        let buckets = engine.state.read_namespace()?.records().len().to_string();
        log_event_with_fields(Event::EngineOpenComplete, &[("buckets", &buckets)]);
        Ok(engine)
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub(crate) fn lock_journal(&self) -> ArchiveResult<MutexGuard<'_, JournalWriter>> {
        self.journal
            .lock()
            .map_err(|_| ArchiveError::LockPoisoned("journal"))
    }

    /// Appends one record to the journal. The caller publishes only after
    /// this returns Ok.
    pub(crate) fn commit(
        &self,
        journal: &mut JournalWriter,
        payload: JournalPayload,
    ) -> ArchiveResult<Appended> {
        if self.is_halted() {
            return Err(ArchiveError::Halted);
        }
        match journal.append(payload) {
            Ok(appended) => {
                self.metrics.record_journal_append(appended.bytes_written);
                Ok(appended)
            }
            Err(e) => {
                if e.is_fatal() {
                    self.halted.store(true, Ordering::Release);
                }
                log_event_with_fields(
                    Event::JournalAppendFailed,
                    &[("code", e.code()), ("error", &e.to_string())],
                );
                Err(e.into())
            }
        }
    }

    /// True once a FATAL journal error has stopped the engine.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Last committed journal sequence number.
    pub fn last_sequence_number(&self) -> ArchiveResult<u64> {
        Ok(self.lock_journal()?.last_sequence_number())
    }

    // ---------------------------------------------------------------------
    // Namespace reads
    // ---------------------------------------------------------------------

    /// Archive id of the ACTIVE generation of `logical_name`.
    pub fn resolve_active(&self, logical_name: &str) -> ArchiveResult<String> {
        let namespace = self.state.read_namespace()?;
        Ok(namespace
            .resolve_active(logical_name)?
            .archive_bucket_id()
            .to_string())
    }

    /// Record lookup by current archive id, ACTIVE or RETIRED.
    pub fn bucket(&self, archive_bucket_id: &str) -> ArchiveResult<BucketRecord> {
        let namespace = self.state.read_namespace()?;
        Ok(namespace.bucket(archive_bucket_id)?.clone())
    }

    /// Every generation of `logical_name`, oldest first.
    pub fn generations(&self, logical_name: &str) -> ArchiveResult<Vec<BucketRecord>> {
        let namespace = self.state.read_namespace()?;
        Ok(namespace
            .generations(logical_name)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Every bucket record in creation order, retired ones included.
    pub fn list_buckets(&self) -> ArchiveResult<Vec<BucketRecord>> {
        let namespace = self.state.read_namespace()?;
        Ok(namespace.records().to_vec())
    }

    // ---------------------------------------------------------------------
    // Ledger reads
    // ---------------------------------------------------------------------

    fn handle_for(namespace: &NamespaceTable, archive_bucket_id: &str) -> ArchiveResult<BucketHandle> {
        Ok(namespace.bucket(archive_bucket_id)?.handle())
    }

    fn with_ledger<T>(
        &self,
        archive_bucket_id: &str,
        key: &str,
        read: impl FnOnce(&VersionLedgerEntry) -> ArchiveResult<T>,
    ) -> ArchiveResult<T> {
        let namespace = self.state.read_namespace()?;
        let handle = Self::handle_for(&namespace, archive_bucket_id)?;
        let shared = self
            .state
            .ledgers
            .get(&LedgerKey::new(handle, key))?
            .ok_or_else(|| ArchiveError::no_such_key(key))?;
        let entry = lock_entry(&shared)?;
        if entry.is_empty() {
            return Err(ArchiveError::no_such_key(key));
        }
        read(&entry)
    }

    /// Snapshot of the full ledger for `key`.
    pub fn get_ledger(&self, archive_bucket_id: &str, key: &str) -> ArchiveResult<VersionLedgerEntry> {
        self.with_ledger(archive_bucket_id, key, |entry| Ok(entry.clone()))
    }

    /// Versions and delete markers, newest first.
    pub fn list_versions(&self, archive_bucket_id: &str, key: &str) -> ArchiveResult<Vec<ObjectVersion>> {
        self.with_ledger(archive_bucket_id, key, |entry| Ok(entry.versions().to_vec()))
    }

    pub fn get_version(
        &self,
        archive_bucket_id: &str,
        key: &str,
        version_id: &VersionId,
    ) -> ArchiveResult<ObjectVersion> {
        self.with_ledger(archive_bucket_id, key, |entry| {
            entry.version(version_id).cloned()
        })
    }

    /// The latest view: `NoSuchKey` when the newest entry is a delete marker.
    pub fn get_latest(&self, archive_bucket_id: &str, key: &str) -> ArchiveResult<ObjectVersion> {
        self.with_ledger(archive_bucket_id, key, |entry| entry.latest_object().cloned())
    }

    /// Keys with retained history in a bucket, sorted.
    pub fn list_keys(&self, archive_bucket_id: &str) -> ArchiveResult<Vec<String>> {
        let namespace = self.state.read_namespace()?;
        let handle = Self::handle_for(&namespace, archive_bucket_id)?;
        self.state.ledgers.keys_in(handle)
    }

    // ---------------------------------------------------------------------
    // Archive-local mutation
    // ---------------------------------------------------------------------

    /// Removes one delete marker from a ledger, restoring whichever entry
    /// is now newest as latest. Object versions are never removed.
    pub fn delete_version(
        &self,
        archive_bucket_id: &str,
        key: &str,
        version_id: &VersionId,
    ) -> ArchiveResult<()> {
        let namespace = self.state.read_namespace()?;
        let handle = Self::handle_for(&namespace, archive_bucket_id)?;
        let shared = self
            .state
            .ledgers
            .get(&LedgerKey::new(handle, key))?
            .ok_or_else(|| ArchiveError::no_such_key(key))?;
        let mut entry = lock_entry(&shared)?;

        let target = entry.version(version_id)?;
        if !target.is_delete_marker() {
            self.metrics.increment_events_rejected();
            return Err(ArchiveError::VersionNotRemovable {
                key: key.to_string(),
                version_id: version_id.to_string(),
            });
        }

        {
            let mut journal = self.lock_journal()?;
            self.commit(
                &mut journal,
                JournalPayload::DeleteMarkerRemoved {
                    archive_bucket_id: archive_bucket_id.to_string(),
                    key: key.to_string(),
                    version_id: version_id.clone(),
                },
            )?;
        }

        entry.remove_delete_marker(version_id)?;
        self.metrics.increment_delete_markers_removed();
        log_event_with_fields(
            Event::DeleteMarkerRemoved,
            &[
                ("archive_bucket_id", archive_bucket_id),
                ("key", key),
                ("version_id", version_id.as_str()),
            ],
        );
        Ok(())
    }
}

impl std::fmt::Debug for ArchiveEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveEngine")
            .field("data_dir", &self.config.data_dir)
            .finish()
    }
}
