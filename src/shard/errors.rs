//! Shard error types
//!
//! Error codes:
//! - AERO_SHARD_ENUMERATION_FAILED (FATAL severity: aborts the run)
//! - AERO_SHARD_OPEN_FAILED (ERROR severity: the shard is skipped)
//! - AERO_SHARD_CLOSED (ERROR severity)
//! - AERO_SHARD_STORE_ERROR (ERROR severity)
//! - AERO_SHARD_ENCODING (ERROR severity)
//! - AERO_SHARD_UNKNOWN_COLUMN (ERROR severity)

use std::fmt;
use std::io;
use std::path::Path;

use crate::storage::StorageError;

pub use crate::storage::Severity;

/// Shard-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardErrorCode {
    /// The shard root directory could not be listed
    AeroShardEnumerationFailed,
    /// The shard's store could not be opened
    AeroShardOpenFailed,
    /// Operation on a shard that was already closed
    AeroShardClosed,
    /// The underlying store failed mid-operation
    AeroShardStoreError,
    /// A stored key or value could not be decoded
    AeroShardEncoding,
    /// A query selected a column the series does not have
    AeroShardUnknownColumn,
}

impl ShardErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ShardErrorCode::AeroShardEnumerationFailed => "AERO_SHARD_ENUMERATION_FAILED",
            ShardErrorCode::AeroShardOpenFailed => "AERO_SHARD_OPEN_FAILED",
            ShardErrorCode::AeroShardClosed => "AERO_SHARD_CLOSED",
            ShardErrorCode::AeroShardStoreError => "AERO_SHARD_STORE_ERROR",
            ShardErrorCode::AeroShardEncoding => "AERO_SHARD_ENCODING",
            ShardErrorCode::AeroShardUnknownColumn => "AERO_SHARD_UNKNOWN_COLUMN",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ShardErrorCode::AeroShardEnumerationFailed => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ShardErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug)]
enum Cause {
    Io(io::Error),
    Store(StorageError),
}

/// Shard error with code, message and optional cause
#[derive(Debug)]
pub struct ShardError {
    code: ShardErrorCode,
    message: String,
    shard: Option<String>,
    cause: Option<Cause>,
}

impl ShardError {
    fn new(code: ShardErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            shard: None,
            cause: None,
        }
    }

    /// The shard root could not be listed
    pub fn enumeration_failed(path: &Path, source: io::Error) -> Self {
        let mut err = Self::new(
            ShardErrorCode::AeroShardEnumerationFailed,
            format!("Cannot read shard directory {}", path.display()),
        );
        err.cause = Some(Cause::Io(source));
        err
    }

    /// The store backing `shard` failed to open
    pub fn open_failed(shard: &str, source: StorageError) -> Self {
        let mut err = Self::new(
            ShardErrorCode::AeroShardOpenFailed,
            format!("Cannot open shard {}", shard),
        )
        .for_shard(shard);
        err.cause = Some(Cause::Store(source));
        err
    }

    /// Operation attempted after close
    pub fn closed(shard: &str) -> Self {
        Self::new(
            ShardErrorCode::AeroShardClosed,
            format!("Shard {} is closed", shard),
        )
        .for_shard(shard)
    }

    /// Wrap a store failure
    pub fn store(shard: &str, source: StorageError) -> Self {
        let mut err = Self::new(ShardErrorCode::AeroShardStoreError, "Store operation failed")
            .for_shard(shard);
        err.cause = Some(Cause::Store(source));
        err
    }

    /// A stored key or value is malformed
    pub fn encoding(shard: &str, message: impl Into<String>) -> Self {
        Self::new(ShardErrorCode::AeroShardEncoding, message).for_shard(shard)
    }

    /// The query named a column the series does not have
    pub fn unknown_column(shard: &str, series: &str, column: &str) -> Self {
        Self::new(
            ShardErrorCode::AeroShardUnknownColumn,
            format!("Series {} has no column {}", series, column),
        )
        .for_shard(shard)
    }

    fn for_shard(mut self, shard: &str) -> Self {
        self.shard = Some(shard.to_string());
        self
    }

    /// Returns the error code
    pub fn code(&self) -> ShardErrorCode {
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

    /// Returns the shard the error happened in, if known
    pub fn shard(&self) -> Option<&str> {
        self.shard.as_deref()
    }
}

impl fmt::Display for ShardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        match &self.cause {
            Some(Cause::Io(e)) => write!(f, " (caused by: {})", e)?,
            Some(Cause::Store(e)) => write!(f, " (caused by: {})", e)?,
            None => {}
        }
        Ok(())
    }
}

impl std::error::Error for ShardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Some(Cause::Io(e)) => Some(e),
            Some(Cause::Store(e)) => Some(e),
            None => None,
        }
    }
}

/// Result type for shard operations
pub type ShardResult<T> = Result<T, ShardError>;
