//! Archive journal
//!
//! The journal is the archive's system of record. Every committed event
//! (bucket create, bucket retire, version append, delete-marker removal)
//! is one checksummed, fsync'd record; in-memory state is only ever a
//! replay of it.
//!
//! # Invariants
//!
//! - fsync before an event is acknowledged
//! - Sequence numbers start at 1 and are consecutive
//! - Checksum on every record
//! - Any corruption halts replay

mod checksum;
mod errors;
mod reader;
mod record;
mod writer;

pub use checksum::{compute_checksum, verify_checksum};
pub use errors::{CorruptionSite, JournalError, JournalResult};
pub use reader::JournalReader;
pub use record::{JournalPayload, JournalRecord, RecordType, MIN_RECORD_SIZE, RECORD_OVERHEAD};
pub use writer::{journal_path, Appended, JournalWriter, JOURNAL_DIR, JOURNAL_FILE};
