//! Journal reader with strict corruption detection
//!
//! Zero tolerance:
//! - Any checksum, framing or sequence violation halts the read
//! - No partial replay, no skipping, no repair
//!
//! Records are read strictly in order from byte 0, single-threaded.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::errors::{JournalError, JournalResult};
use super::record::{JournalRecord, MIN_RECORD_SIZE};
use super::writer::journal_path;

pub struct JournalReader {
    path: PathBuf,
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
    last_sequence: u64,
}

impl JournalReader {
    /// Opens a journal file for reading.
    pub fn open(path: &Path) -> JournalResult<Self> {
        let open_failed = |source| JournalError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(open_failed)?;
        let file_size = file.metadata().map_err(open_failed)?.len();

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
            last_sequence: 0,
        })
    }

    /// Opens `<data_dir>/journal/archive.log`.
    pub fn open_from_data_dir(data_dir: &Path) -> JournalResult<Self> {
        Self::open(&journal_path(data_dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Last successfully read sequence number, 0 before the first record.
    pub fn last_sequence_number(&self) -> u64 {
        self.last_sequence
    }

    /// Reads the next record.
    ///
    /// - `Ok(Some(record))` for a valid record
    /// - `Ok(None)` at a clean end of file
    /// - `Err` (ARC_JOURNAL_CORRUPTION) on truncation, checksum failure,
    ///   undecodable payload or non-consecutive sequence numbers
    pub fn read_next(&mut self) -> JournalResult<Option<JournalRecord>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < MIN_RECORD_SIZE as u64 {
            return Err(JournalError::corrupt_at_offset(
                self.current_offset,
                format!(
                    "Truncated journal: {} bytes remaining, minimum record size is {}",
                    remaining, MIN_RECORD_SIZE
                ),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            JournalError::corrupt_at_offset(
                self.current_offset,
                format!("Failed to read record length: {}", e),
            )
        })?;
        let record_length = u32::from_le_bytes(len_buf) as u64;

        if record_length < MIN_RECORD_SIZE as u64 {
            return Err(JournalError::corrupt_at_offset(
                self.current_offset,
                format!("Invalid record length: {}", record_length),
            ));
        }
        if record_length > remaining {
            return Err(JournalError::corrupt_at_offset(
                self.current_offset,
                format!(
                    "Record length {} exceeds remaining file size {}",
                    record_length, remaining
                ),
            ));
        }

        let mut record_buf = vec![0u8; record_length as usize];
        record_buf[0..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut record_buf[4..]).map_err(|e| {
            JournalError::corrupt_at_offset(
                self.current_offset,
                format!("Failed to read record body: {}", e),
            )
        })?;

        let (record, bytes_consumed) = JournalRecord::deserialize(&record_buf)
            .map_err(|e| JournalError::corrupt_at_offset(self.current_offset, e.to_string()))?;

        let expected = self.last_sequence + 1;
        if record.sequence_number != expected {
            return Err(JournalError::corrupt_at_sequence(
                record.sequence_number,
                format!(
                    "Non-sequential sequence number: expected {}, got {}",
                    expected, record.sequence_number
                ),
            ));
        }

        self.current_offset += bytes_consumed as u64;
        self.last_sequence = record.sequence_number;

        Ok(Some(record))
    }

    /// Reads every remaining record.
    pub fn read_all(&mut self) -> JournalResult<Vec<JournalRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_next()? {
            records.push(record);
        }
        Ok(records)
    }
}

impl Iterator for JournalReader {
    type Item = JournalResult<JournalRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{JournalPayload, JournalWriter};
    use chrono::Utc;
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_buckets(data_dir: &Path, names: &[&str]) {
        let mut writer = JournalWriter::open(data_dir).unwrap();
        for name in names {
            writer
                .append(JournalPayload::BucketCreated {
                    logical_name: name.to_string(),
                    archive_bucket_id: format!("{}.01", name),
                    generation: 0,
                    created_at: Utc::now(),
                })
                .unwrap();
        }
    }

    #[test]
    fn test_reads_records_in_order() {
        let temp = TempDir::new().unwrap();
        write_buckets(temp.path(), &["a", "b", "c"]);

        let mut reader = JournalReader::open_from_data_dir(temp.path()).unwrap();
        let records = reader.read_all().unwrap();
        let sequences: Vec<u64> = records.iter().map(|r| r.sequence_number).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert_eq!(reader.last_sequence_number(), 3);
    }

    #[test]
    fn test_flipped_byte_halts_read() {
        let temp = TempDir::new().unwrap();
        write_buckets(temp.path(), &["a", "b"]);

        let path = journal_path(temp.path());
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 6;
        bytes[last] ^= 0x20;
        fs::write(&path, bytes).unwrap();

        let mut reader = JournalReader::open(&path).unwrap();
        assert!(reader.read_next().unwrap().is_some());
        let err = reader.read_next().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_trailing_garbage_is_corruption() {
        let temp = TempDir::new().unwrap();
        write_buckets(temp.path(), &["a"]);

        let path = journal_path(temp.path());
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0u8; 7]).unwrap();

        let mut reader = JournalReader::open(&path).unwrap();
        assert!(reader.read_next().unwrap().is_some());
        assert!(reader.read_next().is_err());
    }

    #[test]
    fn test_iterator_yields_every_record() {
        let temp = TempDir::new().unwrap();
        write_buckets(temp.path(), &["a", "b"]);

        let reader = JournalReader::open_from_data_dir(temp.path()).unwrap();
        let records: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
    }
}
