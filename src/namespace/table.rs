//! # Bucket Namespace Table
//!
//! Append-only arena of bucket generations plus two indexes:
//! - logical name -> every generation, in generation order
//! - current archive bucket id -> arena slot
//!
//! Mutations are split into a pure `plan_*` step and a `commit_*` step so
//! the engine can journal an event before publishing it. Journal replay
//! goes through the same `commit_*` functions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::allocator::{IdAllocator, RenameTarget};
use super::record::{BucketHandle, BucketRecord, BucketState};
use crate::errors::{ArchiveError, ArchiveResult};
use crate::versioning::VersioningState;

/// Outcome of planning a bucket create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatePlan {
    /// An ACTIVE generation already exists; create is a no-op.
    Existing(String),
    /// A new generation must be minted.
    Mint {
        archive_bucket_id: String,
        generation: u64,
    },
}

/// A planned retire-and-rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetirePlan {
    pub handle: BucketHandle,
    pub generation: u64,
    pub target: RenameTarget,
}

#[derive(Debug, Default)]
pub struct NamespaceTable {
    records: Vec<BucketRecord>,
    by_name: HashMap<String, Vec<BucketHandle>>,
    by_id: HashMap<String, BucketHandle>,
    allocator: IdAllocator,
}

impl NamespaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record ever created, in creation order.
    pub fn records(&self) -> &[BucketRecord] {
        &self.records
    }

    pub fn record(&self, handle: BucketHandle) -> ArchiveResult<&BucketRecord> {
        self.records
            .get(handle.0)
            .ok_or_else(|| ArchiveError::invariant(format!("dangling bucket handle {}", handle.0)))
    }

    fn record_mut(&mut self, handle: BucketHandle) -> ArchiveResult<&mut BucketRecord> {
        self.records
            .get_mut(handle.0)
            .ok_or_else(|| ArchiveError::invariant(format!("dangling bucket handle {}", handle.0)))
    }

    /// All generations of `logical_name`, oldest first.
    pub fn generations(&self, logical_name: &str) -> Vec<&BucketRecord> {
        self.by_name
            .get(logical_name)
            .map(|handles| handles.iter().map(|h| &self.records[h.0]).collect())
            .unwrap_or_default()
    }

    fn active_handle(&self, logical_name: &str) -> Option<BucketHandle> {
        self.by_name.get(logical_name).and_then(|handles| {
            handles
                .last()
                .copied()
                .filter(|h| self.records[h.0].is_active())
        })
    }

    /// The ACTIVE generation for `logical_name`.
    pub fn resolve_active(&self, logical_name: &str) -> ArchiveResult<&BucketRecord> {
        self.active_handle(logical_name)
            .map(|h| &self.records[h.0])
            .ok_or_else(|| ArchiveError::NoSuchBucket(logical_name.to_string()))
    }

    /// Looks up a record, ACTIVE or RETIRED, by its current archive id.
    pub fn bucket(&self, archive_bucket_id: &str) -> ArchiveResult<&BucketRecord> {
        self.by_id
            .get(archive_bucket_id)
            .map(|h| &self.records[h.0])
            .ok_or_else(|| ArchiveError::NoSuchBucket(archive_bucket_id.to_string()))
    }

    pub fn count_in_state(&self, state: BucketState) -> usize {
        self.records.iter().filter(|r| r.state() == state).count()
    }

    pub fn allocator(&self) -> &IdAllocator {
        &self.allocator
    }

    pub fn versioning_mut(&mut self, handle: BucketHandle) -> ArchiveResult<&mut VersioningState> {
        Ok(self.record_mut(handle)?.versioning_mut())
    }

    pub fn plan_create(&self, logical_name: &str) -> CreatePlan {
        if let Some(handle) = self.active_handle(logical_name) {
            return CreatePlan::Existing(self.records[handle.0].archive_bucket_id().to_string());
        }

        let generation = self
            .by_name
            .get(logical_name)
            .map(|handles| handles.len() as u64)
            .unwrap_or(0);

        CreatePlan::Mint {
            archive_bucket_id: self.allocator.propose_active_id(logical_name),
            generation,
        }
    }

    pub fn plan_retire(&self, logical_name: &str, max_probes: u64) -> ArchiveResult<RetirePlan> {
        let handle = self
            .active_handle(logical_name)
            .ok_or_else(|| ArchiveError::NoSuchBucket(logical_name.to_string()))?;
        let target = self.allocator.propose_rename(logical_name, max_probes)?;

        Ok(RetirePlan {
            handle,
            generation: self.records[handle.0].generation(),
            target,
        })
    }

    /// Publishes a new ACTIVE generation.
    pub fn commit_create(
        &mut self,
        logical_name: &str,
        archive_bucket_id: &str,
        generation: u64,
        created_at: DateTime<Utc>,
    ) -> ArchiveResult<BucketHandle> {
        if self.active_handle(logical_name).is_some() {
            return Err(ArchiveError::invariant(format!(
                "bucket {} already has an ACTIVE generation",
                logical_name
            )));
        }
        let expected = self
            .by_name
            .get(logical_name)
            .map(|handles| handles.len() as u64)
            .unwrap_or(0);
        if generation != expected {
            return Err(ArchiveError::invariant(format!(
                "bucket {} generation {} out of order, expected {}",
                logical_name, generation, expected
            )));
        }

        self.allocator.mint(archive_bucket_id)?;

        let handle = BucketHandle(self.records.len());
        self.records.push(BucketRecord::new(
            handle,
            logical_name.to_string(),
            archive_bucket_id.to_string(),
            generation,
            created_at,
        ));
        self.by_name
            .entry(logical_name.to_string())
            .or_default()
            .push(handle);
        self.by_id.insert(archive_bucket_id.to_string(), handle);

        Ok(handle)
    }

    /// Retires the ACTIVE generation of `logical_name` under `target`.
    pub fn commit_retire(
        &mut self,
        logical_name: &str,
        generation: u64,
        target: &RenameTarget,
        retired_at: DateTime<Utc>,
    ) -> ArchiveResult<BucketHandle> {
        let handle = self
            .active_handle(logical_name)
            .ok_or_else(|| ArchiveError::NoSuchBucket(logical_name.to_string()))?;
        if self.records[handle.0].generation() != generation {
            return Err(ArchiveError::invariant(format!(
                "retire of {} generation {} does not match ACTIVE generation {}",
                logical_name,
                generation,
                self.records[handle.0].generation()
            )));
        }

        self.allocator.mint_rename(target)?;

        let record = &mut self.records[handle.0];
        self.by_id.remove(record.archive_bucket_id());
        record.retire(target.archive_bucket_id.clone(), retired_at);
        self.by_id.insert(target.archive_bucket_id.clone(), handle);

        Ok(handle)
    }
}
