//! # Mutation Applier
//!
//! Turns replication feed events into archive mutations:
//!
//! - bucket create / delete -> namespace create / retire-and-rename
//! - object create / overwrite -> versioning coercion + version append
//! - object delete -> delete marker append
//! - source version deletes and versioning changes -> observed, no change
//!
//! Redelivered events are recognised by source identity and acknowledged
//! without creating a second entry.

mod event;

pub use event::{ApplyOutcome, MutationEvent, ObjectWrite, WriteReceipt};

use crate::engine::{lock_entry, ArchiveEngine, LedgerKey};
use crate::errors::{ArchiveError, ArchiveResult};
use crate::ledger::{ObjectVersion, SourceIdentity, VersionKind};
use crate::namespace::{BucketHandle, CreatePlan};
use crate::observability::{log_event_with_fields, trace_event, Event};
use crate::versioning::{SourceVersioning, VersioningState};
use crate::wal::JournalPayload;

/// A resolved ACTIVE bucket, copied out of the namespace table.
struct Target {
    handle: BucketHandle,
    archive_bucket_id: String,
    versioning: VersioningState,
}

impl ArchiveEngine {
    /// Dispatches one feed event.
    pub fn apply(&self, event: &MutationEvent) -> ArchiveResult<ApplyOutcome> {
        let result = match event {
            MutationEvent::BucketCreate { logical_bucket } => self
                .on_bucket_create(logical_bucket)
                .map(|archive_bucket_id| ApplyOutcome::BucketCreated { archive_bucket_id }),
            MutationEvent::BucketDelete { logical_bucket } => self
                .on_bucket_delete(logical_bucket)
                .map(|renamed_id| ApplyOutcome::BucketRetired { renamed_id }),
            MutationEvent::Create(write) | MutationEvent::Overwrite(write) => self
                .on_object_write(write)
                .map(|receipt| ApplyOutcome::from_write(receipt, false)),
            MutationEvent::Delete {
                logical_bucket,
                key,
            } => self
                .on_object_delete(logical_bucket, key)
                .map(|receipt| ApplyOutcome::from_write(receipt, true)),
            MutationEvent::VersionDelete {
                logical_bucket,
                key,
                source_version_id,
            } => self
                .on_object_version_delete(logical_bucket, key, source_version_id)
                .map(|()| ApplyOutcome::Ignored {
                    reason: "archive retains every version".to_string(),
                }),
            MutationEvent::Versioning {
                logical_bucket,
                status,
            } => self
                .on_source_versioning(logical_bucket, *status)
                .map(|archive_versioning| ApplyOutcome::VersioningObserved { archive_versioning }),
        };

        if let Err(e) = &result {
            self.metrics.increment_events_rejected();
            log_event_with_fields(
                Event::EventRejected,
                &[
                    ("event_kind", event.kind_str()),
                    ("logical_bucket", event.logical_bucket()),
                    ("code", e.code()),
                    ("error", &e.to_string()),
                ],
            );
        }
        result
    }

    /// Creates the next generation of `logical_name`, or returns the
    /// ACTIVE one unchanged.
    pub fn on_bucket_create(&self, logical_name: &str) -> ArchiveResult<String> {
        let mut namespace = self.state.write_namespace()?;

        let (archive_bucket_id, generation) = match namespace.plan_create(logical_name) {
            CreatePlan::Existing(id) => {
                log_event_with_fields(
                    Event::BucketCreateNoop,
                    &[("logical_name", logical_name), ("archive_bucket_id", &id)],
                );
                return Ok(id);
            }
            CreatePlan::Mint {
                archive_bucket_id,
                generation,
            } => (archive_bucket_id, generation),
        };

        let created_at = chrono::Utc::now();
        {
            let mut journal = self.lock_journal()?;
            self.commit(
                &mut journal,
                JournalPayload::BucketCreated {
                    logical_name: logical_name.to_string(),
                    archive_bucket_id: archive_bucket_id.clone(),
                    generation,
                    created_at,
                },
            )?;
        }
        namespace.commit_create(logical_name, &archive_bucket_id, generation, created_at)?;

        self.metrics.increment_buckets_created();
        log_event_with_fields(
            Event::BucketCreated,
            &[
                ("logical_name", logical_name),
                ("archive_bucket_id", &archive_bucket_id),
                ("generation", &generation.to_string()),
            ],
        );
        Ok(archive_bucket_id)
    }

    /// Retires the ACTIVE generation of `logical_name` under a fresh
    /// `<name>-deleted-<n>` id. Its ledgers stay readable under that id.
    pub fn on_bucket_delete(&self, logical_name: &str) -> ArchiveResult<String> {
        let mut namespace = self.state.write_namespace()?;

        let plan = match namespace.plan_retire(logical_name, self.config().max_rename_probes) {
            Ok(plan) => plan,
            Err(e @ ArchiveError::NamespaceExhausted { .. }) => {
                log_event_with_fields(
                    Event::NamespaceExhausted,
                    &[("logical_name", logical_name), ("error", &e.to_string())],
                );
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let retired_at = chrono::Utc::now();
        {
            let mut journal = self.lock_journal()?;
            self.commit(
                &mut journal,
                JournalPayload::BucketRetired {
                    logical_name: logical_name.to_string(),
                    generation: plan.generation,
                    renamed_id: plan.target.archive_bucket_id.clone(),
                    disambiguator: plan.target.disambiguator,
                    retired_at,
                },
            )?;
        }
        namespace.commit_retire(logical_name, plan.generation, &plan.target, retired_at)?;

        self.metrics.increment_buckets_retired();
        log_event_with_fields(
            Event::BucketRetired,
            &[
                ("logical_name", logical_name),
                ("renamed_id", &plan.target.archive_bucket_id),
                ("generation", &plan.generation.to_string()),
            ],
        );
        Ok(plan.target.archive_bucket_id)
    }

    /// Records a create or overwrite as a new version.
    ///
    /// The first write of a generation turns versioning on; that write and
    /// the activation commit as one journal record.
    pub fn on_object_write(&self, write: &ObjectWrite) -> ArchiveResult<WriteReceipt> {
        {
            let namespace = self.state.read_namespace()?;
            let record = namespace.resolve_active(&write.logical_bucket)?;
            if record.versioning().is_on() {
                let target = Target {
                    handle: record.handle(),
                    archive_bucket_id: record.archive_bucket_id().to_string(),
                    versioning: record.versioning(),
                };
                return self.append_object(&target, write, false);
            }
        }

        // Not yet ON: re-check under the write side so exactly one write
        // performs the activation.
        let mut namespace = self.state.write_namespace()?;
        let record = namespace.resolve_active(&write.logical_bucket)?;
        let handle = record.handle();
        let archive_bucket_id = record.archive_bucket_id().to_string();

        let versioning = namespace.versioning_mut(handle)?;
        let coercion = versioning.coerce_for_write()?;
        let target = Target {
            handle,
            archive_bucket_id,
            versioning: *versioning,
        };

        let result = self.append_object(&target, write, coercion.activates());

        let versioning = namespace.versioning_mut(handle)?;
        match &result {
            Ok(receipt) if receipt.activated_versioning => {
                versioning.complete_activation();
                self.metrics.increment_versioning_activations();
                log_event_with_fields(
                    Event::VersioningActivated,
                    &[
                        ("logical_name", &write.logical_bucket),
                        ("archive_bucket_id", &target.archive_bucket_id),
                        ("version_id", receipt.version_id.as_str()),
                    ],
                );
            }
            _ => versioning.abort_activation(),
        }
        result
    }

    fn append_object(
        &self,
        target: &Target,
        write: &ObjectWrite,
        activates: bool,
    ) -> ArchiveResult<WriteReceipt> {
        let shared = self
            .state
            .ledgers
            .get_or_create(&LedgerKey::new(target.handle, write.key.as_str()))?;
        let mut entry = lock_entry(&shared)?;

        let source = write.source_identity();
        if let Some(existing) = entry.find_source_duplicate(&source, &write.etag) {
            let version_id = existing.version_id().clone();
            self.metrics.increment_events_deduplicated();
            trace_event(
                Event::EventDeduplicated,
                &[
                    ("archive_bucket_id", &target.archive_bucket_id),
                    ("key", &write.key),
                    ("version_id", version_id.as_str()),
                ],
            );
            return Ok(WriteReceipt {
                archive_bucket_id: target.archive_bucket_id.clone(),
                key: write.key.clone(),
                version_id,
                deduplicated: true,
                activated_versioning: false,
            });
        }

        let kind = VersionKind::Object {
            etag: write.etag.clone(),
            size: write.size,
        };
        let mut journal = self.lock_journal()?;
        let version_id = target
            .versioning
            .assign_version_id(journal.next_sequence_number());
        if entry.version(&version_id).is_ok() {
            return Err(ArchiveError::invariant(format!(
                "version id {} already present for {}",
                version_id, write.key
            )));
        }

        let appended = self.commit(
            &mut journal,
            JournalPayload::VersionAppended {
                archive_bucket_id: target.archive_bucket_id.clone(),
                key: write.key.clone(),
                version_id: version_id.clone(),
                kind: kind.clone(),
                source: source.clone(),
                activated_versioning: activates,
            },
        )?;
        drop(journal);

        entry.append(ObjectVersion::new(
            version_id.clone(),
            kind,
            appended.sequence_number,
            source,
        ))?;

        self.metrics.increment_versions_appended();
        trace_event(
            Event::VersionAppended,
            &[
                ("archive_bucket_id", &target.archive_bucket_id),
                ("key", &write.key),
                ("version_id", version_id.as_str()),
                ("etag", &write.etag),
                ("size", &write.size.to_string()),
            ],
        );

        Ok(WriteReceipt {
            archive_bucket_id: target.archive_bucket_id.clone(),
            key: write.key.clone(),
            version_id,
            deduplicated: false,
            activated_versioning: activates,
        })
    }

    /// Records a source delete as a delete marker.
    ///
    /// Every delete appends its own marker; delete events carry no source
    /// identity to deduplicate on. Deletes never activate versioning, so a
    /// bucket still OFF has no keys and answers `NoSuchKey`. Under ON a
    /// never-written key gets a marker as its first entry.
    pub fn on_object_delete(&self, logical_name: &str, key: &str) -> ArchiveResult<WriteReceipt> {
        let namespace = self.state.read_namespace()?;
        let record = namespace.resolve_active(logical_name)?;
        let archive_bucket_id = record.archive_bucket_id().to_string();
        let versioning = record.versioning();
        let ledger_key = LedgerKey::new(record.handle(), key);

        let shared = if versioning == VersioningState::Off {
            self.state
                .ledgers
                .get(&ledger_key)?
                .ok_or_else(|| ArchiveError::no_such_key(key))?
        } else {
            self.state.ledgers.get_or_create(&ledger_key)?
        };
        let mut entry = lock_entry(&shared)?;
        if versioning == VersioningState::Off && entry.is_empty() {
            return Err(ArchiveError::no_such_key(key));
        }

        let mut journal = self.lock_journal()?;
        let version_id = versioning.assign_version_id(journal.next_sequence_number());
        if entry.version(&version_id).is_ok() {
            return Err(ArchiveError::invariant(format!(
                "version id {} already present for {}",
                version_id, key
            )));
        }

        let appended = self.commit(
            &mut journal,
            JournalPayload::VersionAppended {
                archive_bucket_id: archive_bucket_id.clone(),
                key: key.to_string(),
                version_id: version_id.clone(),
                kind: VersionKind::DeleteMarker,
                source: SourceIdentity::default(),
                activated_versioning: false,
            },
        )?;
        drop(journal);

        entry.append(ObjectVersion::new(
            version_id.clone(),
            VersionKind::DeleteMarker,
            appended.sequence_number,
            SourceIdentity::default(),
        ))?;

        self.metrics.increment_delete_markers_appended();
        trace_event(
            Event::DeleteMarkerAppended,
            &[
                ("archive_bucket_id", &archive_bucket_id),
                ("key", key),
                ("version_id", version_id.as_str()),
            ],
        );

        Ok(WriteReceipt {
            archive_bucket_id,
            key: key.to_string(),
            version_id,
            deduplicated: false,
            activated_versioning: false,
        })
    }

    /// The source removed one specific version. The archive keeps it.
    pub fn on_object_version_delete(
        &self,
        logical_name: &str,
        key: &str,
        source_version_id: &str,
    ) -> ArchiveResult<()> {
        let namespace = self.state.read_namespace()?;
        let archive_bucket_id = namespace.resolve_active(logical_name)?.archive_bucket_id();

        self.metrics.increment_events_ignored();
        log_event_with_fields(
            Event::EventIgnored,
            &[
                ("event_kind", "VERSION_DELETE"),
                ("archive_bucket_id", archive_bucket_id),
                ("key", key),
                ("source_version_id", source_version_id),
            ],
        );
        Ok(())
    }

    /// Observes a source versioning change. Archive versioning is
    /// independent of the source and is returned unchanged.
    pub fn on_source_versioning(
        &self,
        logical_name: &str,
        status: SourceVersioning,
    ) -> ArchiveResult<VersioningState> {
        let namespace = self.state.read_namespace()?;
        let record = namespace.resolve_active(logical_name)?;

        self.metrics.increment_events_ignored();
        log_event_with_fields(
            Event::SourceVersioningObserved,
            &[
                ("logical_name", logical_name),
                ("source_status", &status.to_string()),
                ("archive_versioning", &record.versioning().to_string()),
            ],
        );
        Ok(record.versioning())
    }
}
