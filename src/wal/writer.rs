//! Journal writer with fsync enforcement
//!
//! - Every append is followed by fsync
//! - An event is committed only once its record is durable
//! - A failed write is rolled back to the previous record boundary

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::errors::{JournalError, JournalResult};
use super::reader::JournalReader;
use super::record::{JournalPayload, JournalRecord};

/// Directory under the data dir holding the journal.
pub const JOURNAL_DIR: &str = "journal";

/// Journal file name.
pub const JOURNAL_FILE: &str = "archive.log";

/// Returns `<data_dir>/journal/archive.log`.
pub fn journal_path(data_dir: &Path) -> PathBuf {
    data_dir.join(JOURNAL_DIR).join(JOURNAL_FILE)
}

/// Receipt for a durable append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    pub sequence_number: u64,
    pub bytes_written: u64,
}

/// Append-only journal writer.
pub struct JournalWriter {
    path: PathBuf,
    file: File,
    /// Next sequence number to assign (starts at 1, never reused)
    next_sequence: u64,
    /// Length of the file up to the last durable record
    durable_len: u64,
}

impl JournalWriter {
    /// Opens or creates the journal under `data_dir`.
    ///
    /// The existing journal is scanned to continue sequence numbering;
    /// any corruption aborts the open.
    pub fn open(data_dir: &Path) -> JournalResult<Self> {
        let dir = data_dir.join(JOURNAL_DIR);
        let path = journal_path(data_dir);

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|source| JournalError::Open {
                path: dir.clone(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| JournalError::Open {
                path: path.clone(),
                source,
            })?;

        let (next_sequence, durable_len) = Self::scan_existing(&path)?;

        Ok(Self {
            path,
            file,
            next_sequence,
            durable_len,
        })
    }

    fn scan_existing(path: &Path) -> JournalResult<(u64, u64)> {
        let len = match fs::metadata(path) {
            Ok(m) => m.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((1, 0)),
            Err(source) => {
                return Err(JournalError::Open {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if len == 0 {
            return Ok((1, 0));
        }

        let mut reader = JournalReader::open(path)?;
        while reader.read_next()?.is_some() {}
        Ok((reader.last_sequence_number() + 1, len))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The sequence number the next append will receive.
    pub fn next_sequence_number(&self) -> u64 {
        self.next_sequence
    }

    /// Last assigned sequence number, or 0 if nothing was written.
    pub fn last_sequence_number(&self) -> u64 {
        self.next_sequence - 1
    }

    /// Appends `payload` under the next sequence number and fsyncs.
    ///
    /// # Errors
    ///
    /// - `Encode` or `Write` (ERROR): nothing of the record remains
    /// - `Sync` (FATAL): the record was truncated away but the device
    ///   reported a flush failure
    /// - `Rollback` (FATAL): partial bytes may remain past the last record
    pub fn append(&mut self, payload: JournalPayload) -> JournalResult<Appended> {
        let sequence = self.next_sequence;
        let record = JournalRecord::new(sequence, payload);
        let serialized = record.serialize().map_err(|e| JournalError::Encode {
            sequence,
            reason: e.to_string(),
        })?;

        if let Err(source) = self.file.write_all(&serialized) {
            self.rollback(sequence)?;
            return Err(JournalError::Write { sequence, source });
        }

        if let Err(source) = self.file.sync_all() {
            self.rollback(sequence)?;
            return Err(JournalError::Sync { sequence, source });
        }

        // Only advance after the record is durable
        self.next_sequence += 1;
        self.durable_len += serialized.len() as u64;

        Ok(Appended {
            sequence_number: sequence,
            bytes_written: serialized.len() as u64,
        })
    }

    /// Truncates a failed append back to the last record boundary.
    fn rollback(&mut self, sequence: u64) -> JournalResult<()> {
        self.file
            .set_len(self.durable_len)
            .and_then(|()| self.file.sync_all())
            .map_err(|source| JournalError::Rollback {
                sequence,
                durable_len: self.durable_len,
                source,
            })
    }
}

#[cfg(test)]
impl JournalWriter {
    /// Swaps the handle for a read-only one, so the next append and its
    /// rollback both fail.
    pub(crate) fn make_read_only(&mut self) {
        self.file = File::open(&self.path).unwrap();
    }
}
