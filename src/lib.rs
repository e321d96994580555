//! arczone - archive zone replication policy engine
//!
//! Consumes a source zone's mutation feed and keeps every version of every
//! object, under every incarnation of every bucket, for as long as the
//! archive exists.
//!
//! - Versioning is forced on at the first object write of a bucket generation
//! - Overwrites and deletes append; nothing is erased
//! - Deleted buckets are retired and renamed, never removed
//! - Every committed event is journaled and fsync'd before it is visible

pub mod applier;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod namespace;
pub mod observability;
pub mod versioning;
pub mod wal;

pub use applier::{ApplyOutcome, MutationEvent, ObjectWrite, WriteReceipt};
pub use config::ArchiveConfig;
pub use engine::ArchiveEngine;
pub use errors::{ArchiveError, ArchiveResult};
