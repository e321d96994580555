//! Versioning State Coercion
//!
//! The archive keeps its own versioning state per bucket generation,
//! independent of whatever the source bucket is configured with:
//!
//! ```text
//! OFF --first object write--> LAZY_PENDING --write commits--> ON
//!  ^                               |
//!  +-------write fails to commit---+
//! ```
//!
//! ON is terminal. Deletes never leave OFF. Source versioning
//! configuration events are observed but never change the state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ArchiveError, ArchiveResult};
use crate::ledger::{LogicalTimestamp, VersionId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersioningState {
    /// No object written at this generation yet.
    #[default]
    Off,
    /// The first write is being committed.
    LazyPending,
    /// Every write is retained as its own version. Never reverts.
    On,
}

/// What the coercion step decided for an incoming object write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// The write activates versioning; it must commit the activation with it.
    Activate,
    /// Versioning already ON.
    AlreadyOn,
}

impl Coercion {
    pub fn activates(self) -> bool {
        matches!(self, Coercion::Activate)
    }
}

impl VersioningState {
    #[inline]
    pub fn is_on(self) -> bool {
        matches!(self, VersioningState::On)
    }

    /// The status an S3 `GetBucketVersioning` on the archive would report.
    pub fn status_label(self) -> Option<&'static str> {
        match self {
            VersioningState::Off => None,
            VersioningState::LazyPending | VersioningState::On => Some("Enabled"),
        }
    }

    /// Decides whether an object write must turn versioning on, moving
    /// OFF to LAZY_PENDING. Two writes may not activate concurrently.
    pub fn coerce_for_write(&mut self) -> ArchiveResult<Coercion> {
        match *self {
            VersioningState::Off => {
                *self = VersioningState::LazyPending;
                Ok(Coercion::Activate)
            }
            VersioningState::On => Ok(Coercion::AlreadyOn),
            VersioningState::LazyPending => Err(ArchiveError::invariant(
                "versioning activation already in flight",
            )),
        }
    }

    /// The activating write committed.
    pub fn complete_activation(&mut self) {
        if *self == VersioningState::LazyPending {
            *self = VersioningState::On;
        }
    }

    /// The activating write did not commit; nothing was written.
    pub fn abort_activation(&mut self) {
        if *self == VersioningState::LazyPending {
            *self = VersioningState::Off;
        }
    }

    /// Version id for a version committed at `sequence` under this state.
    pub fn assign_version_id(self, sequence: LogicalTimestamp) -> VersionId {
        match self {
            VersioningState::Off => VersionId::Unversioned,
            VersioningState::LazyPending | VersioningState::On => {
                VersionId::from_sequence(sequence)
            }
        }
    }
}

impl fmt::Display for VersioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersioningState::Off => write!(f, "OFF"),
            VersioningState::LazyPending => write!(f, "LAZY_PENDING"),
            VersioningState::On => write!(f, "ON"),
        }
    }
}

/// Versioning configuration reported by the source zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SourceVersioning {
    Enabled,
    Suspended,
}

impl fmt::Display for SourceVersioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceVersioning::Enabled => write!(f, "Enabled"),
            SourceVersioning::Suspended => write!(f, "Suspended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_write_activates() {
        let mut state = VersioningState::default();
        assert_eq!(state, VersioningState::Off);
        assert_eq!(state.status_label(), None);

        assert_eq!(state.coerce_for_write().unwrap(), Coercion::Activate);
        assert_eq!(state, VersioningState::LazyPending);
        // Ids are assigned as if ON while the activating write commits
        assert!(!state.assign_version_id(1).is_unversioned());

        state.complete_activation();
        assert_eq!(state, VersioningState::On);
        assert_eq!(state.status_label(), Some("Enabled"));
    }

    #[test]
    fn test_on_is_terminal() {
        let mut state = VersioningState::On;
        assert_eq!(state.coerce_for_write().unwrap(), Coercion::AlreadyOn);
        state.abort_activation();
        assert_eq!(state, VersioningState::On);
    }

    #[test]
    fn test_failed_activation_returns_to_off() {
        let mut state = VersioningState::Off;
        state.coerce_for_write().unwrap();
        state.abort_activation();
        assert_eq!(state, VersioningState::Off);
    }

    #[test]
    fn test_concurrent_activation_is_refused() {
        let mut state = VersioningState::LazyPending;
        assert!(state.coerce_for_write().is_err());
    }

    #[test]
    fn test_off_assigns_sentinel() {
        assert!(VersioningState::Off.assign_version_id(4).is_unversioned());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&VersioningState::LazyPending).unwrap(),
            "\"LAZY_PENDING\""
        );
        let status: SourceVersioning = serde_json::from_str("\"Suspended\"").unwrap();
        assert_eq!(status, SourceVersioning::Suspended);
    }
}
