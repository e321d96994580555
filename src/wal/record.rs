//! Journal record types and framing
//!
//! Each record on disk:
//! - Record Length (u32 LE), including this field and the checksum
//! - Record Type (u8)
//! - Sequence Number (u64 LE)
//! - Payload (JSON, variable)
//! - Checksum (u32 LE) over everything before it
//!
//! One record is one committed archive event. Records always carry the
//! full post-decision state (allocated ids, assigned version ids), so
//! replay never re-decides anything.

use std::io;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::checksum::compute_checksum;
use crate::ledger::{SourceIdentity, VersionId, VersionKind};

/// Fixed framing overhead: length + type + sequence + checksum.
pub const RECORD_OVERHEAD: usize = 4 + 1 + 8 + 4;

/// Smallest legal record: framing around a `{}` payload.
pub const MIN_RECORD_SIZE: usize = RECORD_OVERHEAD + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// A new ACTIVE bucket generation was minted
    BucketCreated = 0,
    /// An ACTIVE generation was retired and renamed
    BucketRetired = 1,
    /// An object version or delete marker was appended to a ledger
    VersionAppended = 2,
    /// A delete marker was removed from a ledger
    DeleteMarkerRemoved = 3,
}

impl RecordType {
    /// Convert from u8, returns None for invalid values
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(RecordType::BucketCreated),
            1 => Some(RecordType::BucketRetired),
            2 => Some(RecordType::VersionAppended),
            3 => Some(RecordType::DeleteMarkerRemoved),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Payload of a journal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalPayload {
    BucketCreated {
        logical_name: String,
        archive_bucket_id: String,
        generation: u64,
        created_at: DateTime<Utc>,
    },
    BucketRetired {
        logical_name: String,
        generation: u64,
        renamed_id: String,
        disambiguator: u64,
        retired_at: DateTime<Utc>,
    },
    VersionAppended {
        archive_bucket_id: String,
        key: String,
        version_id: VersionId,
        #[serde(flatten)]
        kind: VersionKind,
        #[serde(default)]
        source: SourceIdentity,
        /// This write moved the bucket's versioning from OFF to ON.
        #[serde(default)]
        activated_versioning: bool,
    },
    DeleteMarkerRemoved {
        archive_bucket_id: String,
        key: String,
        version_id: VersionId,
    },
}

impl JournalPayload {
    pub fn record_type(&self) -> RecordType {
        match self {
            JournalPayload::BucketCreated { .. } => RecordType::BucketCreated,
            JournalPayload::BucketRetired { .. } => RecordType::BucketRetired,
            JournalPayload::VersionAppended { .. } => RecordType::VersionAppended,
            JournalPayload::DeleteMarkerRemoved { .. } => RecordType::DeleteMarkerRemoved,
        }
    }
}

/// Complete journal record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalRecord {
    /// Global monotonic sequence number (starts at 1, never repeats)
    pub sequence_number: u64,
    pub payload: JournalPayload,
}

impl JournalRecord {
    pub fn new(sequence_number: u64, payload: JournalPayload) -> Self {
        Self {
            sequence_number,
            payload,
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.payload.record_type()
    }

    /// Serialize the complete record to bytes
    pub fn serialize(&self) -> io::Result<Vec<u8>> {
        let payload_bytes = serde_json::to_vec(&self.payload)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let record_length = RECORD_OVERHEAD + payload_bytes.len();
        let length_field = u32::try_from(record_length).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("record of {} bytes exceeds u32 framing", record_length),
            )
        })?;

        let mut record = Vec::with_capacity(record_length);
        record.extend_from_slice(&length_field.to_le_bytes());
        record.push(self.record_type().as_u8());
        record.extend_from_slice(&self.sequence_number.to_le_bytes());
        record.extend_from_slice(&payload_bytes);

        // Checksum covers length field + body
        let checksum = compute_checksum(&record);
        record.extend_from_slice(&checksum.to_le_bytes());

        Ok(record)
    }

    /// Deserialize a record from bytes, verifying checksum
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Record too short",
            ));
        }

        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if record_length < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid record length: {}", record_length),
            ));
        }

        if data.len() < record_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Record truncated: expected {} bytes, got {}",
                    record_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = record_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed_checksum = compute_checksum(&data[0..checksum_offset]);

        if computed_checksum != stored_checksum {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: computed {:08x}, stored {:08x}",
                    computed_checksum, stored_checksum
                ),
            ));
        }

        let record_type = RecordType::from_u8(data[4]).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid record type: {}", data[4]),
            )
        })?;

        let mut seq_buf = [0u8; 8];
        seq_buf.copy_from_slice(&data[5..13]);
        let sequence_number = u64::from_le_bytes(seq_buf);

        let payload: JournalPayload = serde_json::from_slice(&data[13..checksum_offset])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if payload.record_type() != record_type {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Record type {:?} does not match payload {:?}",
                    record_type,
                    payload.record_type()
                ),
            ));
        }

        Ok((
            JournalRecord {
                sequence_number,
                payload,
            },
            record_length,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appended() -> JournalPayload {
        JournalPayload::VersionAppended {
            archive_bucket_id: "photos.0a1b".into(),
            key: "foo".into(),
            version_id: VersionId::from_sequence(2),
            kind: VersionKind::Object {
                etag: "37b51d194a7513e45b56f6524f2d51f2".into(),
                size: 3,
            },
            source: SourceIdentity::with_version("null"),
            activated_versioning: true,
        }
    }

    #[test]
    fn test_record_type_from_u8() {
        assert_eq!(RecordType::from_u8(2), Some(RecordType::VersionAppended));
        assert_eq!(RecordType::from_u8(9), None);
    }

    #[test]
    fn test_record_survives_framing() {
        let record = JournalRecord::new(2, appended());
        let bytes = record.serialize().unwrap();
        let (decoded, consumed) = JournalRecord::deserialize(&bytes).unwrap();

        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_delete_marker_payload_shape() {
        let payload = JournalPayload::VersionAppended {
            archive_bucket_id: "b.1".into(),
            key: "k".into(),
            version_id: VersionId::from_sequence(5),
            kind: VersionKind::DeleteMarker,
            source: SourceIdentity::default(),
            activated_versioning: false,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["op"], "version_appended");
        assert_eq!(json["kind"], "delete_marker");
        assert!(json.get("etag").is_none());
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut bytes = JournalRecord::new(1, appended()).serialize().unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xFF;

        let err = JournalRecord::deserialize(&bytes).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_record_detected() {
        let bytes = JournalRecord::new(1, appended()).serialize().unwrap();
        let err = JournalRecord::deserialize(&bytes[..bytes.len() - 3]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_type_byte_must_match_payload() {
        let mut bytes = JournalRecord::new(1, appended()).serialize().unwrap();
        bytes[4] = RecordType::BucketCreated.as_u8();
        // Recompute checksum so only the type mismatch remains
        let offset = bytes.len() - 4;
        let checksum = compute_checksum(&bytes[..offset]);
        bytes[offset..].copy_from_slice(&checksum.to_le_bytes());

        let err = JournalRecord::deserialize(&bytes).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }
}
