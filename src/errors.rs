//! # Archive Errors
//!
//! Every failure the engine can surface, with a stable code and severity.
//! FATAL errors mean the archive can no longer guarantee history
//! preservation and must stop accepting events.

use std::fmt;

use thiserror::Error;

use crate::wal::JournalError;

/// Severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, engine continues
    Error,
    /// Engine must stop serving
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Archive engine errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// No ACTIVE record for a logical name, or no record for an archive id.
    #[error("No such bucket: {0}")]
    NoSuchBucket(String),

    #[error("No such key: {key}")]
    NoSuchKey { key: String },

    #[error("No such version: {key}@{version_id}")]
    NoSuchVersion { key: String, version_id: String },

    /// Only delete markers can be removed from a ledger.
    #[error("Version {version_id} of {key} holds object data and cannot be removed")]
    VersionNotRemovable { key: String, version_id: String },

    #[error("No free rename target for {logical_name} after {probes} probes")]
    NamespaceExhausted { logical_name: String, probes: u64 },

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),

    /// A previous FATAL journal error stopped the engine.
    #[error("Engine halted after a fatal journal error")]
    Halted,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ArchiveError {
    pub fn no_such_key(key: impl Into<String>) -> Self {
        ArchiveError::NoSuchKey { key: key.into() }
    }

    pub fn no_such_version(key: impl Into<String>, version_id: impl fmt::Display) -> Self {
        ArchiveError::NoSuchVersion {
            key: key.into(),
            version_id: version_id.to_string(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        ArchiveError::Invariant(message.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ArchiveError::NoSuchBucket(_) => "ARC_NO_SUCH_BUCKET",
            ArchiveError::NoSuchKey { .. } => "ARC_NO_SUCH_KEY",
            ArchiveError::NoSuchVersion { .. } => "ARC_NO_SUCH_VERSION",
            ArchiveError::VersionNotRemovable { .. } => "ARC_VERSION_NOT_REMOVABLE",
            ArchiveError::NamespaceExhausted { .. } => "ARC_NAMESPACE_EXHAUSTED",
            ArchiveError::Invariant(_) => "ARC_INVARIANT_VIOLATION",
            ArchiveError::Journal(e) => e.code(),
            ArchiveError::LockPoisoned(_) => "ARC_LOCK_POISONED",
            ArchiveError::Halted => "ARC_ENGINE_HALTED",
            ArchiveError::Config(_) => "ARC_CONFIG_ERROR",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ArchiveError::NoSuchBucket(_)
            | ArchiveError::NoSuchKey { .. }
            | ArchiveError::NoSuchVersion { .. }
            | ArchiveError::VersionNotRemovable { .. } => Severity::Error,
            ArchiveError::Journal(e) => e.severity(),
            ArchiveError::NamespaceExhausted { .. }
            | ArchiveError::Invariant(_)
            | ArchiveError::LockPoisoned(_)
            | ArchiveError::Halted
            | ArchiveError::Config(_) => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// S3-style status code for whatever serves archive reads
    pub fn status_code(&self) -> u16 {
        match self {
            ArchiveError::NoSuchBucket(_)
            | ArchiveError::NoSuchKey { .. }
            | ArchiveError::NoSuchVersion { .. } => 404,
            ArchiveError::VersionNotRemovable { .. } => 409,
            _ => 500,
        }
    }
}
