//! Segment reader with strict corruption detection
//!
//! Sequential scans rebuild the key index when a store is opened; random
//! reads fetch a single record through a pooled file handle.

use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::errors::{StorageError, StorageResult};
use super::record::{KvRecord, MIN_RECORD_SIZE};

/// File extension of segment files
pub const SEGMENT_EXTENSION: &str = "seg";

/// Returns the file name of a segment.
pub fn segment_file_name(segment_id: u32) -> String {
    format!("{:06}.{}", segment_id, SEGMENT_EXTENSION)
}

/// Parses a segment id out of a file name, ignoring anything else.
pub fn parse_segment_id(file_name: &str) -> Option<u32> {
    let stem = file_name.strip_suffix(SEGMENT_EXTENSION)?.strip_suffix('.')?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Lists segment ids in a store directory, ascending.
pub fn list_segments(dir: &Path) -> StorageResult<Vec<u32>> {
    let entries = fs::read_dir(dir).map_err(|e| StorageError::io_error_at_path(dir, e))?;

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io_error_at_path(dir, e))?;
        if let Some(id) = entry.file_name().to_str().and_then(parse_segment_id) {
            ids.push(id);
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

/// Sequential reader over one segment file.
pub struct SegmentReader {
    segment_id: u32,
    path: PathBuf,
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
}

impl SegmentReader {
    /// Opens a segment for a sequential scan.
    pub fn open(dir: &Path, segment_id: u32) -> StorageResult<Self> {
        let path = dir.join(segment_file_name(segment_id));
        let file = File::open(&path).map_err(|e| {
            StorageError::read_failed(format!("Failed to open segment: {}", path.display()), e)
        })?;
        let file_size = file
            .metadata()
            .map_err(|e| StorageError::read_failed("Failed to read segment metadata", e))?
            .len();

        Ok(Self {
            segment_id,
            path,
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
        })
    }

    /// Returns the segment file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current read offset.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Reads the next record and the offset it started at.
    ///
    /// Returns `Ok(None)` at end of segment. Any framing or checksum
    /// failure is a corruption error.
    pub fn read_next(&mut self) -> StorageResult<Option<(u64, KvRecord)>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let offset = self.current_offset;
        let remaining = self.file_size - offset;
        if remaining < MIN_RECORD_SIZE as u64 {
            return Err(StorageError::corruption_at(
                self.segment_id,
                offset,
                format!("Truncated segment: {} bytes remaining", remaining),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            StorageError::corruption_at(
                self.segment_id,
                offset,
                format!("Failed to read record length: {}", e),
            )
        })?;
        let record_length = u32::from_le_bytes(len_buf) as u64;

        if record_length < MIN_RECORD_SIZE as u64 || record_length > remaining {
            return Err(StorageError::corruption_at(
                self.segment_id,
                offset,
                format!(
                    "Invalid record length {} with {} bytes remaining",
                    record_length, remaining
                ),
            ));
        }

        let mut buf = vec![0u8; record_length as usize];
        buf[0..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut buf[4..]).map_err(|e| {
            StorageError::corruption_at(
                self.segment_id,
                offset,
                format!("Failed to read record body: {}", e),
            )
        })?;

        let (record, consumed) = KvRecord::deserialize(&buf)
            .map_err(|e| StorageError::corruption_at(self.segment_id, offset, e.to_string()))?;
        self.current_offset += consumed as u64;

        Ok(Some((offset, record)))
    }
}

/// Reads the record of known length at `offset` through an already open handle.
pub fn read_record_at(
    file: &mut File,
    segment_id: u32,
    offset: u64,
    length: u32,
) -> StorageResult<KvRecord> {
    file.seek(SeekFrom::Start(offset)).map_err(|e| {
        StorageError::read_failed(format!("Failed to seek segment {} to {}", segment_id, offset), e)
    })?;

    let mut buf = vec![0u8; length as usize];
    file.read_exact(&mut buf).map_err(|e| {
        StorageError::read_failed(format!("Failed to read segment {} at {}", segment_id, offset), e)
    })?;

    let (record, _) = KvRecord::deserialize(&buf)
        .map_err(|e| StorageError::corruption_at(segment_id, offset, e.to_string()))?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::super::writer::SegmentWriter;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_segment_names() {
        assert_eq!(segment_file_name(7), "000007.seg");
        assert_eq!(parse_segment_id("000007.seg"), Some(7));
        assert_eq!(parse_segment_id("LOCK"), None);
        assert_eq!(parse_segment_id(".seg"), None);
        assert_eq!(parse_segment_id("12a.seg"), None);
    }

    #[test]
    fn test_read_empty_segment() {
        let temp_dir = TempDir::new().unwrap();
        SegmentWriter::create(temp_dir.path(), 1).unwrap();

        let mut reader = SegmentReader::open(temp_dir.path(), 1).unwrap();
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn test_sequential_scan_reports_offsets() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = SegmentWriter::create(temp_dir.path(), 1).unwrap();
        let first = writer.append(&[KvRecord::put(b"a".to_vec(), b"1".to_vec())]).unwrap();
        let second = writer.append(&[KvRecord::put(b"b".to_vec(), b"2".to_vec())]).unwrap();

        let mut reader = SegmentReader::open(temp_dir.path(), 1).unwrap();
        let (off_a, rec_a) = reader.read_next().unwrap().unwrap();
        let (off_b, rec_b) = reader.read_next().unwrap().unwrap();
        assert!(reader.read_next().unwrap().is_none());

        assert_eq!(off_a, first[0].offset);
        assert_eq!(off_b, second[0].offset);
        assert_eq!(rec_a.key, b"a");
        assert_eq!(rec_b.value, b"2");
    }

    #[test]
    fn test_corruption_detected_on_scan() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = SegmentWriter::create(temp_dir.path(), 1).unwrap();
        writer.append(&[KvRecord::put(b"key".to_vec(), b"value".to_vec())]).unwrap();

        let path = temp_dir.path().join(segment_file_name(1));
        let mut bytes = fs::read(&path).unwrap();
        bytes[9] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let mut reader = SegmentReader::open(temp_dir.path(), 1).unwrap();
        let err = reader.read_next().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.code().code(), "AERO_STORE_CORRUPTION");
    }

    #[test]
    fn test_read_record_at() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = SegmentWriter::create(temp_dir.path(), 2).unwrap();
        let locations = writer
            .append(&[
                KvRecord::put(b"a".to_vec(), b"1".to_vec()),
                KvRecord::put(b"b".to_vec(), b"22".to_vec()),
            ])
            .unwrap();

        let mut file = File::open(temp_dir.path().join(segment_file_name(2))).unwrap();
        let loc = &locations[1];
        let record = read_record_at(&mut file, 2, loc.offset, loc.length).unwrap();
        assert_eq!(record.value, b"22");
    }

    #[test]
    fn test_list_segments_sorted() {
        let temp_dir = TempDir::new().unwrap();
        SegmentWriter::create(temp_dir.path(), 3).unwrap();
        SegmentWriter::create(temp_dir.path(), 1).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), b"ignored").unwrap();

        assert_eq!(list_segments(temp_dir.path()).unwrap(), vec![1, 3]);
    }
}
