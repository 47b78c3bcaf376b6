//! Append-only segment writer with fsync enforcement
//!
//! A batch of records is appended with a single `write_all` and made durable
//! with a single fsync. Records are never rewritten in place.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::errors::{StorageError, StorageResult};
use super::reader::segment_file_name;
use super::record::KvRecord;

/// Where a record lives on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLocation {
    /// Segment id
    pub segment: u32,
    /// Byte offset of the record within the segment
    pub offset: u64,
    /// Full encoded record length
    pub length: u32,
}

/// Writer for the active (highest numbered) segment of a store.
pub struct SegmentWriter {
    segment_id: u32,
    path: PathBuf,
    file: File,
    current_offset: u64,
}

impl SegmentWriter {
    /// Creates (or reopens for append) segment `segment_id` in `dir`.
    pub fn create(dir: &Path, segment_id: u32) -> StorageResult<Self> {
        let path = dir.join(segment_file_name(segment_id));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                StorageError::write_failed(
                    format!("Failed to open segment: {}", path.display()),
                    e,
                )
            })?;

        let current_offset = file
            .metadata()
            .map_err(|e| StorageError::write_failed("Failed to read segment metadata", e))?
            .len();

        Ok(Self {
            segment_id,
            path,
            file,
            current_offset,
        })
    }

    /// Returns the segment id being appended to.
    pub fn segment_id(&self) -> u32 {
        self.segment_id
    }

    /// Returns the segment file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current segment size in bytes.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Appends `records` in order and fsyncs once.
    ///
    /// Returns the location of every record, in input order. On error
    /// nothing is acknowledged; a partially written tail is detected as
    /// corruption on the next open.
    pub fn append(&mut self, records: &[KvRecord]) -> StorageResult<Vec<RecordLocation>> {
        let mut buf = Vec::new();
        let mut locations = Vec::with_capacity(records.len());
        let mut offset = self.current_offset;

        for record in records {
            let bytes = record.serialize();
            locations.push(RecordLocation {
                segment: self.segment_id,
                offset,
                length: bytes.len() as u32,
            });
            offset += bytes.len() as u64;
            buf.extend_from_slice(&bytes);
        }

        self.file.write_all(&buf).map_err(|e| {
            StorageError::write_failed(
                format!("Failed to append {} records to segment {}", records.len(), self.segment_id),
                e,
            )
        })?;

        // fsync - one per batch
        self.file.sync_all().map_err(|e| {
            StorageError::write_failed(
                format!("fsync failed on segment {}", self.segment_id),
                e,
            )
        })?;

        self.current_offset = offset;
        Ok(locations)
    }
}
