//! Segment record format
//!
//! Every key-value mutation is appended to a segment as one record:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE, whole record)
//! +------------------+
//! | Key              | (length-prefixed bytes)
//! +------------------+
//! | Tombstone Flag   | (u8: 0 = put, 1 = delete)
//! +------------------+
//! | Value            | (length-prefixed bytes, empty for tombstones)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```

use std::io;

use super::checksum::{record_checksum, verify_record};

/// Smallest possible record: length + empty key + flag + empty value + checksum
pub const MIN_RECORD_SIZE: usize = 4 + 4 + 1 + 4 + 4;

/// A single key-value mutation as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvRecord {
    /// Raw key bytes
    pub key: Vec<u8>,
    /// Raw value bytes (empty for tombstones)
    pub value: Vec<u8>,
    /// Whether this record deletes the key
    pub is_tombstone: bool,
}

impl KvRecord {
    /// Create a put record
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            is_tombstone: false,
        }
    }

    /// Create a delete record
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
            is_tombstone: true,
        }
    }

    /// Size of the serialized record in bytes.
    pub fn encoded_len(&self) -> usize {
        MIN_RECORD_SIZE + self.key.len() + self.value.len()
    }

    /// Serialize the complete record, checksum included.
    pub fn serialize(&self) -> Vec<u8> {
        let record_length = self.encoded_len() as u32;
        let prefix = record_length.to_le_bytes();

        let mut body = Vec::with_capacity(self.encoded_len() - 8);
        body.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        body.extend_from_slice(&self.key);
        body.push(if self.is_tombstone { 1 } else { 0 });
        body.extend_from_slice(&(self.value.len() as u32).to_le_bytes());
        body.extend_from_slice(&self.value);

        let checksum = record_checksum(prefix, &body);

        let mut record = Vec::with_capacity(record_length as usize);
        record.extend_from_slice(&prefix);
        record.extend_from_slice(&body);
        record.extend_from_slice(&checksum.to_le_bytes());
        record
    }

    /// Deserialize one record from the front of `data`, verifying its checksum.
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
        let stored = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        if !verify_record(&data[..checksum_offset], stored) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Checksum mismatch: stored {:08x}", stored),
            ));
        }

        let body = &data[4..checksum_offset];
        let mut pos = 0usize;

        let key = take_prefixed(body, &mut pos)?;
        let flag = *body.get(pos).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "Missing tombstone flag")
        })?;
        pos += 1;
        let value = take_prefixed(body, &mut pos)?;

        if pos != body.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} trailing bytes in record body", body.len() - pos),
            ));
        }

        Ok((
            Self {
                key,
                value,
                is_tombstone: flag != 0,
            },
            record_length,
        ))
    }
}

fn take_prefixed(body: &[u8], pos: &mut usize) -> io::Result<Vec<u8>> {
    let end = *pos + 4;
    if end > body.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Length prefix past end of record",
        ));
    }
    let len = u32::from_le_bytes([body[*pos], body[*pos + 1], body[*pos + 2], body[*pos + 3]])
        as usize;
    let start = end;
    let stop = start + len;
    if stop > body.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Field of {} bytes past end of record", len),
        ));
    }
    *pos = stop;
    Ok(body[start..stop].to_vec())
}
