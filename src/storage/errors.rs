//! Legacy store error types
//!
//! Error codes:
//! - AERO_STORE_IO_ERROR (ERROR severity)
//! - AERO_STORE_WRITE_FAILED (ERROR severity)
//! - AERO_STORE_READ_FAILED (ERROR severity)
//! - AERO_STORE_NOT_FOUND (ERROR severity)
//! - AERO_STORE_CORRUPTION (FATAL severity for the store, never for the run)

use std::fmt;
use std::io;
use std::path::Path;

/// Severity levels for store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, the store stays usable
    Error,
    /// The store must not be used any further
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Store-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Disk I/O failure (directory listing, handle open)
    AeroStoreIoError,
    /// Segment append or fsync failed
    AeroStoreWriteFailed,
    /// Segment read failed
    AeroStoreReadFailed,
    /// Store directory missing and creation was not requested
    AeroStoreNotFound,
    /// Record checksum or framing failure
    AeroStoreCorruption,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::AeroStoreIoError => "AERO_STORE_IO_ERROR",
            StorageErrorCode::AeroStoreWriteFailed => "AERO_STORE_WRITE_FAILED",
            StorageErrorCode::AeroStoreReadFailed => "AERO_STORE_READ_FAILED",
            StorageErrorCode::AeroStoreNotFound => "AERO_STORE_NOT_FOUND",
            StorageErrorCode::AeroStoreCorruption => "AERO_STORE_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::AeroStoreCorruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Store error with code, message and optional context
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl StorageError {
    fn new(code: StorageErrorCode, message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source,
        }
    }

    /// Create a new store I/O error
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(StorageErrorCode::AeroStoreIoError, message, Some(source))
    }

    /// Create an I/O error naming the path it happened at
    pub fn io_error_at_path(path: &Path, source: io::Error) -> Self {
        Self::new(
            StorageErrorCode::AeroStoreIoError,
            format!("I/O failure at {}", path.display()),
            Some(source),
        )
    }

    /// Create a new write failed error
    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(StorageErrorCode::AeroStoreWriteFailed, message, Some(source))
    }

    /// Create a new read failed error
    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(StorageErrorCode::AeroStoreReadFailed, message, Some(source))
    }

    /// Store directory does not exist
    pub fn not_found(path: &Path) -> Self {
        Self::new(
            StorageErrorCode::AeroStoreNotFound,
            format!("Store directory not found: {}", path.display()),
            None,
        )
    }

    /// Create a corruption error
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::AeroStoreCorruption, message, None)
    }

    /// Create a corruption error with segment and byte offset context
    pub fn corruption_at(segment: u32, offset: u64, reason: impl Into<String>) -> Self {
        let mut err = Self::corruption(reason);
        err.details = Some(format!("segment: {}, byte_offset: {}", segment, offset));
        err
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether this error poisons the store
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for store operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(StorageErrorCode::AeroStoreIoError.code(), "AERO_STORE_IO_ERROR");
        assert_eq!(StorageErrorCode::AeroStoreWriteFailed.code(), "AERO_STORE_WRITE_FAILED");
        assert_eq!(StorageErrorCode::AeroStoreReadFailed.code(), "AERO_STORE_READ_FAILED");
        assert_eq!(StorageErrorCode::AeroStoreNotFound.code(), "AERO_STORE_NOT_FOUND");
        assert_eq!(StorageErrorCode::AeroStoreCorruption.code(), "AERO_STORE_CORRUPTION");
    }

    #[test]
    fn test_only_corruption_is_fatal() {
        assert!(StorageError::corruption("bad crc").is_fatal());
        assert!(!StorageError::not_found(Path::new("/missing")).is_fatal());
        assert!(!StorageError::write_failed(
            "disk full",
            io::Error::new(io::ErrorKind::Other, "disk full"),
        )
        .is_fatal());
    }

    #[test]
    fn test_display_contains_context() {
        let err = StorageError::corruption_at(3, 1024, "checksum mismatch");
        let display = err.to_string();
        assert!(display.contains("AERO_STORE_CORRUPTION"));
        assert!(display.contains("FATAL"));
        assert!(display.contains("segment: 3"));
        assert!(display.contains("byte_offset: 1024"));
    }
}
