//! Mutation feed events and their outcomes
//!
//! One JSON object per event, tagged by `event_kind`:
//!
//! ```json
//! {"event_kind": "CREATE", "logical_bucket": "b", "key": "foo",
//!  "size": 3, "etag": "37b51d194a7513e45b56f6524f2d51f2",
//!  "source_version_id": "null"}
//! ```

use serde::{Deserialize, Serialize};

use crate::ledger::{SourceIdentity, VersionId};
use crate::versioning::{SourceVersioning, VersioningState};

/// A create or overwrite observed on the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectWrite {
    pub logical_bucket: String,
    pub key: String,
    pub size: u64,
    pub etag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_mtime: Option<i64>,
}

impl ObjectWrite {
    pub fn new(
        logical_bucket: impl Into<String>,
        key: impl Into<String>,
        size: u64,
        etag: impl Into<String>,
    ) -> Self {
        Self {
            logical_bucket: logical_bucket.into(),
            key: key.into(),
            size,
            etag: etag.into(),
            source_version_id: None,
            source_mtime: None,
        }
    }

    pub fn with_source_version(mut self, version_id: impl Into<String>) -> Self {
        self.source_version_id = Some(version_id.into());
        self
    }

    pub fn with_source_mtime(mut self, mtime: i64) -> Self {
        self.source_mtime = Some(mtime);
        self
    }

    pub fn source_identity(&self) -> SourceIdentity {
        SourceIdentity {
            version_id: self.source_version_id.clone(),
            mtime: self.source_mtime,
        }
    }
}

/// One event from the replication feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationEvent {
    BucketCreate {
        logical_bucket: String,
    },
    BucketDelete {
        logical_bucket: String,
    },
    Create(ObjectWrite),
    Overwrite(ObjectWrite),
    Delete {
        logical_bucket: String,
        key: String,
    },
    /// The source removed one specific version, possibly its own marker.
    VersionDelete {
        logical_bucket: String,
        key: String,
        source_version_id: String,
    },
    /// The source changed its versioning configuration.
    Versioning {
        logical_bucket: String,
        status: SourceVersioning,
    },
}

impl MutationEvent {
    pub fn logical_bucket(&self) -> &str {
        match self {
            MutationEvent::BucketCreate { logical_bucket }
            | MutationEvent::BucketDelete { logical_bucket }
            | MutationEvent::Delete { logical_bucket, .. }
            | MutationEvent::VersionDelete { logical_bucket, .. }
            | MutationEvent::Versioning { logical_bucket, .. } => logical_bucket,
            MutationEvent::Create(write) | MutationEvent::Overwrite(write) => {
                &write.logical_bucket
            }
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            MutationEvent::BucketCreate { .. } => "BUCKET_CREATE",
            MutationEvent::BucketDelete { .. } => "BUCKET_DELETE",
            MutationEvent::Create(_) => "CREATE",
            MutationEvent::Overwrite(_) => "OVERWRITE",
            MutationEvent::Delete { .. } => "DELETE",
            MutationEvent::VersionDelete { .. } => "VERSION_DELETE",
            MutationEvent::Versioning { .. } => "VERSIONING",
        }
    }
}

/// Result of an object write or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReceipt {
    pub archive_bucket_id: String,
    pub key: String,
    pub version_id: VersionId,
    /// The event was a redelivery; `version_id` names the existing entry.
    pub deduplicated: bool,
    /// This write turned versioning on for the bucket generation.
    pub activated_versioning: bool,
}

/// What applying one feed event did to the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApplyOutcome {
    BucketCreated {
        archive_bucket_id: String,
    },
    BucketRetired {
        renamed_id: String,
    },
    VersionAppended {
        archive_bucket_id: String,
        version_id: VersionId,
        activated_versioning: bool,
    },
    DeleteMarker {
        archive_bucket_id: String,
        version_id: VersionId,
    },
    Deduplicated {
        archive_bucket_id: String,
        version_id: VersionId,
    },
    Ignored {
        reason: String,
    },
    VersioningObserved {
        archive_versioning: VersioningState,
    },
}

impl ApplyOutcome {
    pub(crate) fn from_write(receipt: WriteReceipt, is_delete: bool) -> Self {
        let WriteReceipt {
            archive_bucket_id,
            version_id,
            deduplicated,
            activated_versioning,
            ..
        } = receipt;

        if deduplicated {
            ApplyOutcome::Deduplicated {
                archive_bucket_id,
                version_id,
            }
        } else if is_delete {
            ApplyOutcome::DeleteMarker {
                archive_bucket_id,
                version_id,
            }
        } else {
            ApplyOutcome::VersionAppended {
                archive_bucket_id,
                version_id,
                activated_versioning,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_event() {
        let json = r#"{"event_kind":"CREATE","logical_bucket":"b","key":"foo",
            "size":3,"etag":"37b51d194a7513e45b56f6524f2d51f2","source_version_id":"null"}"#;
        let event: MutationEvent = serde_json::from_str(json).unwrap();

        match &event {
            MutationEvent::Create(write) => {
                assert_eq!(write.key, "foo");
                assert_eq!(write.size, 3);
                assert_eq!(write.source_version_id.as_deref(), Some("null"));
                assert_eq!(write.source_mtime, None);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(event.logical_bucket(), "b");
        assert_eq!(event.kind_str(), "CREATE");
    }

    #[test]
    fn test_parse_bucket_and_versioning_events() {
        let event: MutationEvent =
            serde_json::from_str(r#"{"event_kind":"BUCKET_DELETE","logical_bucket":"b"}"#).unwrap();
        assert_eq!(
            event,
            MutationEvent::BucketDelete {
                logical_bucket: "b".into()
            }
        );

        let event: MutationEvent = serde_json::from_str(
            r#"{"event_kind":"VERSIONING","logical_bucket":"b","status":"Suspended"}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            MutationEvent::Versioning {
                status: SourceVersioning::Suspended,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: Result<MutationEvent, _> =
            serde_json::from_str(r#"{"event_kind":"RESTORE","logical_bucket":"b"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_outcome_shape() {
        let outcome = ApplyOutcome::VersionAppended {
            archive_bucket_id: "b.1".into(),
            version_id: VersionId::from_sequence(2),
            activated_versioning: true,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "version_appended");
        assert_eq!(json["version_id"], "0000000000000002");
    }
}
