//! Error types and classification for logbrowse.
//!
//! This crate provides:
//! - [`LbError`] - Top-level error enum returned by discovery entry points
//! - [`StorageError`] - Errors raised by storage adapters (local disk, S3, in-memory)
//! - [`ErrorCategory`] for retry decisions in the object-store adapter

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Top-level error type for logbrowse.
#[derive(Error, Debug)]
pub enum LbError {
    /// The query window is empty or inverted (stop <= start)
    #[error("Invalid window: stop {stop} is not after start {start}")]
    InvalidWindow {
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    },

    /// A storage call failed while traversing a device root
    #[error("Backend unavailable for device root '{root}': {source}")]
    BackendUnavailable {
        root: String,
        #[source]
        source: StorageError,
    },

    /// Storage errors outside the context of a device root
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Writing results failed
    #[error("Output error: {0}")]
    Output(String),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LbError {
    /// Attach a device root to a storage error.
    pub fn backend(root: impl Into<String>, source: StorageError) -> Self {
        Self::BackendUnavailable {
            root: root.into(),
            source,
        }
    }

    /// The device root this error is attributed to, if any.
    pub fn root(&self) -> Option<&str> {
        match self {
            Self::BackendUnavailable { root, .. } => Some(root),
            _ => None,
        }
    }
}

/// Storage adapter errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Path or object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Access denied
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Backend unreachable, throttling, or a server-side failure
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// I/O error during a list or stat call
    #[error("I/O error: {0}")]
    Io(String),

    /// Path cannot be mapped onto the backend
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl StorageError {
    /// Check whether this is a missing path/object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check whether the error is worth retrying.
    pub fn is_transient(&self) -> bool {
        classify_storage_error(self) == ErrorCategory::Transient
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(err.to_string()),
            ErrorKind::PermissionDenied => Self::AccessDenied(err.to_string()),
            ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock => {
                Self::Unavailable(err.to_string())
            }
            _ => Self::Io(err.to_string()),
        }
    }
}

/// Error classification for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transient error - retry with exponential backoff
    ///
    /// Examples: network timeout, S3 503, S3 throttling
    Transient,

    /// Permanent error - never retry
    ///
    /// Examples: missing prefix, access denied, malformed path
    Permanent,
}

/// Classifies a storage error to determine retry behavior.
pub fn classify_storage_error(error: &StorageError) -> ErrorCategory {
    match error {
        StorageError::NotFound(_) => ErrorCategory::Permanent,
        StorageError::AccessDenied(_) => ErrorCategory::Permanent,
        StorageError::InvalidPath(_) => ErrorCategory::Permanent,
        StorageError::Unavailable(_) => ErrorCategory::Transient,
        StorageError::Io(msg) => classify_message(msg),
    }
}

/// Classifies a raw backend error message by the error codes it names.
///
/// Used for errors that only surface as display strings. Status digits are
/// not matched since keys such as `00000404.MF4` contain them.
pub fn classify_message(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();

    if lower.contains("nosuchbucket")
        || lower.contains("nosuchkey")
        || lower.contains("accessdenied")
        || lower.contains("invalidrequest")
        || lower.contains("invalidargument")
    {
        return ErrorCategory::Permanent;
    }

    ErrorCategory::Transient
}

/// Result type alias using LbError.
pub type Result<T> = std::result::Result<T, LbError>;
