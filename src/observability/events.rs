//! Observable archive events
//!
//! Events are explicit and typed; the string form is what lands in the
//! `event` field of a log line.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    EngineOpenStart,
    EngineOpenComplete,
    ConfigLoaded,

    // Journal
    JournalReplayBegin,
    JournalReplayComplete,
    /// FATAL
    JournalCorruption,
    JournalAppendFailed,

    // Namespace
    BucketCreated,
    BucketCreateNoop,
    BucketRetired,
    /// FATAL
    NamespaceExhausted,

    // Versioning
    VersioningActivated,
    SourceVersioningObserved,

    // Ledger
    VersionAppended,
    DeleteMarkerAppended,
    DeleteMarkerRemoved,

    // Applier
    EventDeduplicated,
    EventIgnored,
    EventRejected,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::EngineOpenStart => "ENGINE_OPEN_START",
            Event::EngineOpenComplete => "ENGINE_OPEN_COMPLETE",
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::JournalReplayBegin => "JOURNAL_REPLAY_BEGIN",
            Event::JournalReplayComplete => "JOURNAL_REPLAY_COMPLETE",
            Event::JournalCorruption => "JOURNAL_CORRUPTION",
            Event::JournalAppendFailed => "JOURNAL_APPEND_FAILED",

            Event::BucketCreated => "BUCKET_CREATED",
            Event::BucketCreateNoop => "BUCKET_CREATE_NOOP",
            Event::BucketRetired => "BUCKET_RETIRED",
            Event::NamespaceExhausted => "NAMESPACE_EXHAUSTED",

            Event::VersioningActivated => "VERSIONING_ACTIVATED",
            Event::SourceVersioningObserved => "SOURCE_VERSIONING_OBSERVED",

            Event::VersionAppended => "VERSION_APPENDED",
            Event::DeleteMarkerAppended => "DELETE_MARKER_APPENDED",
            Event::DeleteMarkerRemoved => "DELETE_MARKER_REMOVED",

            Event::EventDeduplicated => "EVENT_DEDUPLICATED",
            Event::EventIgnored => "EVENT_IGNORED",
            Event::EventRejected => "EVENT_REJECTED",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::JournalCorruption | Event::NamespaceExhausted)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
