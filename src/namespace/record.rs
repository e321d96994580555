//! # Bucket Records
//!
//! One record per generation of a logical bucket name. Records live in an
//! append-only arena and are addressed by `BucketHandle`; a retire renames
//! the record but never moves it, so ledgers keyed by handle stay put.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::versioning::VersioningState;

/// Arena slot of a bucket record. Stable for the lifetime of the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketHandle(pub(crate) usize);

impl BucketHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BucketState {
    Active,
    Retired,
}

/// One generation of a logical bucket name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRecord {
    handle: BucketHandle,
    logical_name: String,
    /// Current identifier: the minted id while ACTIVE, the rename target
    /// once RETIRED.
    archive_bucket_id: String,
    /// Identifier minted at creation, kept after a rename.
    minted_id: String,
    generation: u64,
    state: BucketState,
    versioning: VersioningState,
    created_at: DateTime<Utc>,
    retired_at: Option<DateTime<Utc>>,
}

impl BucketRecord {
    pub(crate) fn new(
        handle: BucketHandle,
        logical_name: String,
        archive_bucket_id: String,
        generation: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            handle,
            logical_name,
            minted_id: archive_bucket_id.clone(),
            archive_bucket_id,
            generation,
            state: BucketState::Active,
            versioning: VersioningState::Off,
            created_at,
            retired_at: None,
        }
    }

    pub fn handle(&self) -> BucketHandle {
        self.handle
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn archive_bucket_id(&self) -> &str {
        &self.archive_bucket_id
    }

    pub fn minted_id(&self) -> &str {
        &self.minted_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> BucketState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == BucketState::Active
    }

    pub fn versioning(&self) -> VersioningState {
        self.versioning
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn retired_at(&self) -> Option<DateTime<Utc>> {
        self.retired_at
    }

    pub(crate) fn versioning_mut(&mut self) -> &mut VersioningState {
        &mut self.versioning
    }

    pub(crate) fn retire(&mut self, renamed_id: String, retired_at: DateTime<Utc>) {
        self.archive_bucket_id = renamed_id;
        self.state = BucketState::Retired;
        self.retired_at = Some(retired_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_active_and_unversioned() {
        let record = BucketRecord::new(
            BucketHandle(0),
            "photos".into(),
            "photos.3f1c".into(),
            0,
            Utc::now(),
        );
        assert!(record.is_active());
        assert_eq!(record.versioning(), VersioningState::Off);
        assert_ne!(record.archive_bucket_id(), record.logical_name());
    }

    #[test]
    fn test_retire_renames_but_remembers_minted_id() {
        let mut record = BucketRecord::new(
            BucketHandle(0),
            "photos".into(),
            "photos.3f1c".into(),
            0,
            Utc::now(),
        );
        record.retire("photos-deleted-1".into(), Utc::now());
        assert_eq!(record.state(), BucketState::Retired);
        assert_eq!(record.archive_bucket_id(), "photos-deleted-1");
        assert_eq!(record.minted_id(), "photos.3f1c");
        assert!(record.retired_at().is_some());
    }
}
