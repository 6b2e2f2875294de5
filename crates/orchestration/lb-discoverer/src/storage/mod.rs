//! Storage adapters for discovery.
//!
//! Discovery only needs three capabilities from a backend: listing child
//! directories, listing the files of a directory with their cheap metadata,
//! and stat-ing a single object. This module provides:
//! - [`StorageAdapter`] - the capability trait injected into the discoverer
//! - [`LocalStorage`] - a local directory exposed under rooted paths
//! - [`S3Storage`] - an S3-compatible bucket (AWS, MinIO, LocalStack)
//! - [`MemoryStorage`] - a synthetic backend with call counters for tests

mod local;
mod memory;
pub mod s3;

pub use local::LocalStorage;
pub use memory::{CallCounts, MemoryStorage};
pub use s3::S3Storage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lb_error::StorageError;
use serde::{Deserialize, Serialize};

use crate::span::TimeSpan;

/// Result type for storage calls.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A file returned by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name within its directory
    pub name: String,

    /// Rooted path of the file (e.g. "/EEEE0001/00000001/00000001.MF4")
    pub path: String,

    /// Size of the file in bytes
    pub size: u64,

    /// Backend timestamp for the object, if available
    pub modified: Option<DateTime<Utc>>,
}

/// What a backend timestamp says about a file's recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampKind {
    /// Written when the recording started.
    Start,

    /// Written when the file was closed or uploaded, at or after its last
    /// record. Modification times and S3 `LastModified` behave this way.
    #[default]
    End,
}

impl TimestampKind {
    /// The span known for a file from its own timestamp alone.
    pub fn span_of(self, timestamp: Option<DateTime<Utc>>) -> TimeSpan {
        match self {
            Self::Start => TimeSpan::from_start(timestamp),
            Self::End => TimeSpan::from_end(timestamp),
        }
    }
}

/// Name filter handed to [`StorageAdapter::first_file`].
pub type NameFilter<'a> = &'a (dyn Fn(&str) -> bool + Send + Sync);

/// Per-object metadata from a stat call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Listing and metadata capabilities consumed by discovery.
///
/// Paths are always rooted at `/` and use `/` as separator. Mapping them onto
/// a backend (base directories, bucket prefixes, drive letters) is the
/// adapter's responsibility.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// List the names of the directories directly below `path`.
    ///
    /// Returns [`StorageError::NotFound`] when `path` does not exist on
    /// backends that have real directories.
    async fn list_directories(&self, path: &str) -> StorageResult<Vec<String>>;

    /// List the files directly below `path` together with their metadata.
    async fn list_files(&self, path: &str) -> StorageResult<Vec<FileEntry>>;

    /// Stat a single object.
    async fn metadata(&self, path: &str) -> StorageResult<ObjectMeta>;

    /// Return the first file (by name) below `path` whose name passes
    /// `accept`, without listing the rest.
    ///
    /// Used to bound when a session was recorded. The default implementation
    /// falls back to a full listing; backends with ordered, paginated
    /// listings should override it.
    async fn first_file(
        &self,
        path: &str,
        accept: NameFilter<'_>,
    ) -> StorageResult<Option<FileEntry>> {
        let files = self.list_files(path).await?;
        Ok(files
            .into_iter()
            .filter(|file| accept(&file.name))
            .min_by(|a, b| a.name.cmp(&b.name)))
    }

    /// What [`FileEntry::modified`] marks on this backend.
    fn timestamp_kind(&self) -> TimestampKind {
        TimestampKind::End
    }

    /// Derive a file's recording span from its listing metadata.
    ///
    /// Only one side of the span is known from a single entry; the other is
    /// filled in from the neighbouring files of the same session.
    fn file_time_range(&self, entry: &FileEntry) -> TimeSpan {
        self.timestamp_kind().span_of(entry.modified)
    }

    /// Human-readable description used in logs.
    fn description(&self) -> String;
}

/// Join a rooted directory path and a child name.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Normalize a path to the rooted form used by adapters.
///
/// Leading/trailing whitespace and trailing separators are removed and a
/// leading `/` is added when missing. Repeated separators collapse.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .trim()
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();

    format!("/{}", segments.join("/"))
}

/// Split a rooted path into its segments, rejecting parent references.
pub(crate) fn path_segments(path: &str) -> StorageResult<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(StorageError::InvalidPath(format!(
                    "parent references are not allowed: {path}"
                )));
            }
            other => segments.push(other),
        }
    }
    Ok(segments)
}

/// Final segment of a rooted path.
pub(crate) fn file_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}
