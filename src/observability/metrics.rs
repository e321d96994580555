//! Archive counters
//!
//! - Counters only, monotonic, reset on process start
//! - Relaxed atomics; exactness per counter, not across counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    journal_records: AtomicU64,
    journal_bytes: AtomicU64,
    records_replayed: AtomicU64,
    buckets_created: AtomicU64,
    buckets_retired: AtomicU64,
    versioning_activations: AtomicU64,
    versions_appended: AtomicU64,
    delete_markers_appended: AtomicU64,
    delete_markers_removed: AtomicU64,
    events_deduplicated: AtomicU64,
    events_ignored: AtomicU64,
    events_rejected: AtomicU64,
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub journal_records: u64,
    pub journal_bytes: u64,
    pub records_replayed: u64,
    pub buckets_created: u64,
    pub buckets_retired: u64,
    pub versioning_activations: u64,
    pub versions_appended: u64,
    pub delete_markers_appended: u64,
    pub delete_markers_removed: u64,
    pub events_deduplicated: u64,
    pub events_ignored: u64,
    pub events_rejected: u64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_journal_append(&self, bytes: u64) {
        self.journal_records.fetch_add(1, Ordering::Relaxed);
        self.journal_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_records_replayed(&self, count: u64) {
        self.records_replayed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_buckets_created(&self) {
        self.buckets_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_buckets_retired(&self) {
        self.buckets_retired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_versioning_activations(&self) {
        self.versioning_activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_versions_appended(&self) {
        self.versions_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_delete_markers_appended(&self) {
        self.delete_markers_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_delete_markers_removed(&self) {
        self.delete_markers_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_events_deduplicated(&self) {
        self.events_deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_events_ignored(&self) {
        self.events_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_events_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            journal_records: self.journal_records.load(Ordering::Relaxed),
            journal_bytes: self.journal_bytes.load(Ordering::Relaxed),
            records_replayed: self.records_replayed.load(Ordering::Relaxed),
            buckets_created: self.buckets_created.load(Ordering::Relaxed),
            buckets_retired: self.buckets_retired.load(Ordering::Relaxed),
            versioning_activations: self.versioning_activations.load(Ordering::Relaxed),
            versions_appended: self.versions_appended.load(Ordering::Relaxed),
            delete_markers_appended: self.delete_markers_appended.load(Ordering::Relaxed),
            delete_markers_removed: self.delete_markers_removed.load(Ordering::Relaxed),
            events_deduplicated: self.events_deduplicated.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
        }
    }
}
