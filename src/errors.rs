//! Typed error definitions for forensic_transfer.
//! Provides the well-known failure modes of a transfer run for logs, results and tests.

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Closed classification of transfer failures.
///
/// `TransferOutcome::error` and the manifest carry this instead of the full
/// error so they stay `Clone` and serializable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    DiskFull,
    PathTooLong,
    DeviceMismatch,
    NativeMoveFailed,
    HashMismatch,
    Cancelled,
    SourceNotFound,
    DestinationExists,
    InvalidItem,
    MoveInvariantViolated,
    DuplicateDestination,
    FileCountMismatch,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::DiskFull => "disk_full",
            ErrorKind::PathTooLong => "path_too_long",
            ErrorKind::DeviceMismatch => "device_mismatch",
            ErrorKind::NativeMoveFailed => "native_move_failed",
            ErrorKind::HashMismatch => "hash_mismatch",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::SourceNotFound => "source_not_found",
            ErrorKind::DestinationExists => "destination_exists",
            ErrorKind::InvalidItem => "invalid_item",
            ErrorKind::MoveInvariantViolated => "move_invariant_violated",
            ErrorKind::DuplicateDestination => "duplicate_destination",
            ErrorKind::FileCountMismatch => "file_count_mismatch",
            ErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Permission denied on {path}: {context}")]
    PermissionDenied {
        path: PathBuf,
        context: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "Destination out of space while writing {path}: {context}; \
         free space on the destination and retry"
    )]
    DiskFull { path: PathBuf, context: String },

    #[error("Path too long ({len} chars): {path}; shorten the destination root or folder names")]
    PathTooLong { path: PathBuf, len: usize },

    #[error(
        "Device mismatch moving {src} -> {dest}: the OS reported a cross-device move \
         for an item planned as same-device"
    )]
    DeviceMismatch { src: PathBuf, dest: PathBuf },

    #[error(
        "Native move {src} -> {dest} failed: strict attempt: {strict}; \
         permissive attempt: {permissive}"
    )]
    NativeMoveFailed {
        src: PathBuf,
        dest: PathBuf,
        strict: String,
        permissive: String,
        strict_code: Option<i32>,
        permissive_code: Option<i32>,
    },

    #[error("Hash mismatch for {path}: source {expected}, destination {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Operation cancelled by caller")]
    Cancelled,

    #[error("Source path not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("Invalid transfer item {path}: {reason}")]
    InvalidItem { path: PathBuf, reason: String },

    #[error("Source still present after a reported move: {0}")]
    MoveInvariantViolated(PathBuf),

    #[error("Two items resolve to the same destination: {0}")]
    DuplicateDestination(PathBuf),

    #[error("File count mismatch after transfer: expected {expected}, recorded {actual}")]
    FileCountMismatch { expected: usize, actual: usize },

    #[error("{context}")]
    Io {
        path: PathBuf,
        context: String,
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            TransferError::DiskFull { .. } => ErrorKind::DiskFull,
            TransferError::PathTooLong { .. } => ErrorKind::PathTooLong,
            TransferError::DeviceMismatch { .. } => ErrorKind::DeviceMismatch,
            TransferError::NativeMoveFailed { .. } => ErrorKind::NativeMoveFailed,
            TransferError::HashMismatch { .. } => ErrorKind::HashMismatch,
            TransferError::Cancelled => ErrorKind::Cancelled,
            TransferError::SourceNotFound(_) => ErrorKind::SourceNotFound,
            TransferError::DestinationExists(_) => ErrorKind::DestinationExists,
            TransferError::InvalidItem { .. } => ErrorKind::InvalidItem,
            TransferError::MoveInvariantViolated(_) => ErrorKind::MoveInvariantViolated,
            TransferError::DuplicateDestination(_) => ErrorKind::DuplicateDestination,
            TransferError::FileCountMismatch { .. } => ErrorKind::FileCountMismatch,
            TransferError::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled)
    }
}
