//! VersionLedgerEntry - full retained history of one archived key
//!
//! - Versions are stored newest first, in arrival order at the archive
//! - At most one version is latest; exactly one when non-empty
//! - Object versions are never removed; only delete markers can be

use serde::{Deserialize, Serialize};

use super::version::{ObjectVersion, SourceIdentity, VersionId};
use crate::errors::{ArchiveError, ArchiveResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionLedgerEntry {
    key: String,
    /// Newest first.
    versions: Vec<ObjectVersion>,
}

impl VersionLedgerEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            versions: Vec::new(),
        }
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// All versions and delete markers, newest first.
    #[inline]
    pub fn versions(&self) -> &[ObjectVersion] {
        &self.versions
    }

    /// Object versions only, newest first.
    pub fn object_versions(&self) -> impl Iterator<Item = &ObjectVersion> {
        self.versions.iter().filter(|v| !v.is_delete_marker())
    }

    /// Delete markers only, newest first.
    pub fn delete_markers(&self) -> impl Iterator<Item = &ObjectVersion> {
        self.versions.iter().filter(|v| v.is_delete_marker())
    }

    /// The newest entry, which may be a delete marker.
    pub fn latest(&self) -> Option<&ObjectVersion> {
        self.versions.first()
    }

    /// The default "latest" view of the key.
    ///
    /// A key whose newest entry is a delete marker reads as absent.
    pub fn latest_object(&self) -> ArchiveResult<&ObjectVersion> {
        match self.latest() {
            Some(version) if !version.is_delete_marker() => Ok(version),
            _ => Err(ArchiveError::no_such_key(&self.key)),
        }
    }

    /// Looks up a version or delete marker by id.
    pub fn version(&self, version_id: &VersionId) -> ArchiveResult<&ObjectVersion> {
        self.versions
            .iter()
            .find(|v| v.version_id() == version_id)
            .ok_or_else(|| ArchiveError::no_such_version(&self.key, version_id))
    }

    /// Appends `version` as the newest entry and demotes the previous newest.
    ///
    /// Version ids must be unique within the ledger.
    pub fn append(&mut self, mut version: ObjectVersion) -> ArchiveResult<VersionId> {
        if self
            .versions
            .iter()
            .any(|v| v.version_id() == version.version_id())
        {
            return Err(ArchiveError::invariant(format!(
                "version id {} already present in ledger for {}",
                version.version_id(),
                self.key
            )));
        }

        if let Some(previous) = self.versions.first_mut() {
            previous.set_latest(false);
        }
        version.set_latest(true);
        let id = version.version_id().clone();
        self.versions.insert(0, version);
        Ok(id)
    }

    /// Removes one delete marker and re-elects the newest remaining entry
    /// as latest. Object versions are refused.
    pub fn remove_delete_marker(&mut self, version_id: &VersionId) -> ArchiveResult<ObjectVersion> {
        let position = self
            .versions
            .iter()
            .position(|v| v.version_id() == version_id)
            .ok_or_else(|| ArchiveError::no_such_version(&self.key, version_id))?;

        if !self.versions[position].is_delete_marker() {
            return Err(ArchiveError::VersionNotRemovable {
                key: self.key.clone(),
                version_id: version_id.to_string(),
            });
        }

        let mut removed = self.versions.remove(position);
        removed.set_latest(false);
        if let Some(newest) = self.versions.first_mut() {
            newest.set_latest(true);
        }
        Ok(removed)
    }

    /// Finds an object version produced by the same source mutation.
    ///
    /// Matches on (stable source version id, etag), or on (etag, mtime)
    /// when the source reported no stable version id. Returns `None` when
    /// the identity carries nothing to match on.
    pub fn find_source_duplicate(
        &self,
        source: &SourceIdentity,
        etag: &str,
    ) -> Option<&ObjectVersion> {
        let stable_id = source.stable_version_id();
        if stable_id.is_none() && source.mtime.is_none() {
            return None;
        }

        self.object_versions().find(|existing| {
            if existing.etag() != Some(etag) {
                return false;
            }
            match stable_id {
                Some(id) => existing.source().stable_version_id() == Some(id),
                None => {
                    existing.source().stable_version_id().is_none()
                        && existing.source().mtime == source.mtime
                }
            }
        })
    }
}
