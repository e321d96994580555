//! Journal errors
//!
//! A failed write whose bytes were truncated away leaves the journal on a
//! record boundary and is an ERROR. Anything that leaves the file in an
//! unknown state (fsync, rollback, corruption) is FATAL.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::errors::Severity;

/// Where a corruption was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionSite {
    Offset(u64),
    Sequence(u64),
}

impl fmt::Display for CorruptionSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorruptionSite::Offset(offset) => write!(f, "byte {}", offset),
            CorruptionSite::Sequence(seq) => write!(f, "sequence {}", seq),
        }
    }
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("cannot open journal {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("record {sequence} could not be encoded: {reason}")]
    Encode { sequence: u64, reason: String },

    /// The write failed and the partial record was truncated away.
    #[error("write of record {sequence} failed")]
    Write {
        sequence: u64,
        #[source]
        source: io::Error,
    },

    #[error("fsync of record {sequence} failed")]
    Sync {
        sequence: u64,
        #[source]
        source: io::Error,
    },

    /// Partial bytes of `sequence` may remain past `durable_len`.
    #[error("rollback of record {sequence} to byte {durable_len} failed")]
    Rollback {
        sequence: u64,
        durable_len: u64,
        #[source]
        source: io::Error,
    },

    #[error("corrupt journal at {site}: {reason}")]
    Corrupt { site: CorruptionSite, reason: String },
}

impl JournalError {
    pub fn corrupt_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        JournalError::Corrupt {
            site: CorruptionSite::Offset(offset),
            reason: reason.into(),
        }
    }

    pub fn corrupt_at_sequence(sequence: u64, reason: impl Into<String>) -> Self {
        JournalError::Corrupt {
            site: CorruptionSite::Sequence(sequence),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            JournalError::Open { .. } => "ARC_JOURNAL_OPEN_FAILED",
            JournalError::Encode { .. } | JournalError::Write { .. } => "ARC_JOURNAL_APPEND_FAILED",
            JournalError::Sync { .. } => "ARC_JOURNAL_FSYNC_FAILED",
            JournalError::Rollback { .. } => "ARC_JOURNAL_ROLLBACK_FAILED",
            JournalError::Corrupt { .. } => "ARC_JOURNAL_CORRUPTION",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            JournalError::Encode { .. } | JournalError::Write { .. } => Severity::Error,
            JournalError::Open { .. }
            | JournalError::Sync { .. }
            | JournalError::Rollback { .. }
            | JournalError::Corrupt { .. } => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

pub type JournalResult<T> = Result<T, JournalError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_error() -> io::Error {
        io::Error::new(io::ErrorKind::Other, "disk error")
    }

    #[test]
    fn test_rolled_back_write_is_not_fatal() {
        let err = JournalError::Write {
            sequence: 3,
            source: disk_error(),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.code(), "ARC_JOURNAL_APPEND_FAILED");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_failed_rollback_is_fatal() {
        let err = JournalError::Rollback {
            sequence: 3,
            durable_len: 120,
            source: disk_error(),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("byte 120"));
    }

    #[test]
    fn test_corruption_names_its_site() {
        let err = JournalError::corrupt_at_sequence(42, "checksum mismatch");
        assert_eq!(err.code(), "ARC_JOURNAL_CORRUPTION");
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "corrupt journal at sequence 42: checksum mismatch"
        );
    }
}
