//! ObjectVersion - one retained revision of an archived object
//!
//! - A version is either object metadata or an explicit delete marker
//! - Everything except `is_latest` is immutable once created
//! - `created_at` is the journal sequence number of the committing record

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel used on the wire for versions written while versioning was OFF.
pub const UNVERSIONED: &str = "unversioned";

/// Source version id reported by unversioned source buckets.
pub const SOURCE_NULL_VERSION: &str = "null";

/// Logical timestamp: the sequence number of the journal record that
/// committed the version. Strictly increasing across the archive.
pub type LogicalTimestamp = u64;

/// Archive-side version identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VersionId {
    /// Written before versioning was turned on for the bucket generation.
    Unversioned,
    /// Assigned under LAZY_PENDING/ON.
    Assigned(String),
}

impl VersionId {
    /// Derives the version id for a commit at `sequence`.
    ///
    /// Zero-padded hex so that lexical order equals arrival order.
    pub fn from_sequence(sequence: LogicalTimestamp) -> Self {
        VersionId::Assigned(format!("{:016x}", sequence))
    }

    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            VersionId::Unversioned => UNVERSIONED,
            VersionId::Assigned(id) => id,
        }
    }

    /// Returns true for the unversioned sentinel.
    pub fn is_unversioned(&self) -> bool {
        matches!(self, VersionId::Unversioned)
    }
}

impl From<String> for VersionId {
    fn from(value: String) -> Self {
        if value == UNVERSIONED {
            VersionId::Unversioned
        } else {
            VersionId::Assigned(value)
        }
    }
}

impl From<&str> for VersionId {
    fn from(value: &str) -> Self {
        VersionId::from(value.to_string())
    }
}

impl From<VersionId> for String {
    fn from(value: VersionId) -> Self {
        match value {
            VersionId::Unversioned => UNVERSIONED.to_string(),
            VersionId::Assigned(id) => id,
        }
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a version holds.
///
/// Delete markers are an explicit variant, not an absent etag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VersionKind {
    /// Object metadata mirrored verbatim from the source.
    Object { etag: String, size: u64 },
    /// "Object absent as of this point."
    DeleteMarker,
}

impl VersionKind {
    /// Returns true for delete markers.
    #[inline]
    pub fn is_delete_marker(&self) -> bool {
        matches!(self, VersionKind::DeleteMarker)
    }
}

/// Identity of the source mutation that produced a version.
///
/// Used to recognise redelivered events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceIdentity {
    /// Version id reported by the source, `"null"` for unversioned sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    /// Source modification time, when the feed carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<i64>,
}

impl SourceIdentity {
    /// Identity for an event carrying only a source version id.
    pub fn with_version(version_id: impl Into<String>) -> Self {
        Self {
            version_id: Some(version_id.into()),
            mtime: None,
        }
    }

    /// Returns the source version id if it is a stable, non-null identifier.
    pub fn stable_version_id(&self) -> Option<&str> {
        self.version_id
            .as_deref()
            .filter(|id| !id.is_empty() && *id != SOURCE_NULL_VERSION)
    }
}

/// A single retained object version or delete marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectVersion {
    version_id: VersionId,
    #[serde(flatten)]
    kind: VersionKind,
    is_latest: bool,
    created_at: LogicalTimestamp,
    #[serde(default)]
    source: SourceIdentity,
}

impl ObjectVersion {
    /// Creates a version. New versions start as latest; the ledger demotes
    /// the previous newest entry.
    pub fn new(
        version_id: VersionId,
        kind: VersionKind,
        created_at: LogicalTimestamp,
        source: SourceIdentity,
    ) -> Self {
        Self {
            version_id,
            kind,
            is_latest: true,
            created_at,
            source,
        }
    }

    pub fn version_id(&self) -> &VersionId {
        &self.version_id
    }

    pub fn kind(&self) -> &VersionKind {
        &self.kind
    }

    pub fn is_latest(&self) -> bool {
        self.is_latest
    }

    pub fn is_delete_marker(&self) -> bool {
        self.kind.is_delete_marker()
    }

    pub fn created_at(&self) -> LogicalTimestamp {
        self.created_at
    }

    pub fn source(&self) -> &SourceIdentity {
        &self.source
    }

    /// Etag of an object version; `None` for delete markers.
    pub fn etag(&self) -> Option<&str> {
        match &self.kind {
            VersionKind::Object { etag, .. } => Some(etag),
            VersionKind::DeleteMarker => None,
        }
    }

    /// Size of an object version; `None` for delete markers.
    pub fn size(&self) -> Option<u64> {
        match &self.kind {
            VersionKind::Object { size, .. } => Some(*size),
            VersionKind::DeleteMarker => None,
        }
    }

    pub(crate) fn set_latest(&mut self, is_latest: bool) {
        self.is_latest = is_latest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_id_wire_form() {
        assert_eq!(VersionId::Unversioned.as_str(), "unversioned");
        assert_eq!(VersionId::from("unversioned"), VersionId::Unversioned);
        assert_eq!(
            VersionId::from_sequence(26).as_str(),
            "000000000000001a"
        );
    }

    #[test]
    fn test_sequence_ids_sort_in_arrival_order() {
        let a = VersionId::from_sequence(9);
        let b = VersionId::from_sequence(10);
        assert!(a.as_str() < b.as_str());
    }

    #[test]
    fn test_delete_marker_has_no_metadata() {
        let marker = ObjectVersion::new(
            VersionId::from_sequence(3),
            VersionKind::DeleteMarker,
            3,
            SourceIdentity::default(),
        );
        assert!(marker.is_delete_marker());
        assert_eq!(marker.etag(), None);
        assert_eq!(marker.size(), None);
    }

    #[test]
    fn test_null_source_version_is_not_stable() {
        assert_eq!(SourceIdentity::with_version("null").stable_version_id(), None);
        assert_eq!(
            SourceIdentity::with_version("abc").stable_version_id(),
            Some("abc")
        );
    }

    #[test]
    fn test_serde_shape() {
        let version = ObjectVersion::new(
            VersionId::from_sequence(1),
            VersionKind::Object {
                etag: "37b51d194a7513e45b56f6524f2d51f2".to_string(),
                size: 3,
            },
            1,
            SourceIdentity::with_version("null"),
        );
        let json = serde_json::to_value(&version).unwrap();
        assert_eq!(json["version_id"], "0000000000000001");
        assert_eq!(json["kind"], "object");
        assert_eq!(json["size"], 3);
        assert_eq!(json["is_latest"], true);

        let back: ObjectVersion = serde_json::from_value(json).unwrap();
        assert_eq!(back, version);
    }
}
