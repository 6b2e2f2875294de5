//! In-memory storage backend.
//!
//! Files carry explicit spans, and every call is counted, which makes the
//! backend suitable for asserting how many listings a discovery issued.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lb_error::StorageError;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    FileEntry, NameFilter, ObjectMeta, StorageAdapter, StorageResult, TimestampKind, file_name,
    normalize_path,
};
use crate::span::TimeSpan;

#[derive(Debug, Clone)]
struct MemoryFile {
    size: u64,
    span: TimeSpan,
}

/// Snapshot of the calls made against a [`MemoryStorage`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_directories: usize,
    pub list_files: usize,
    pub first_file_lookups: usize,
    pub metadata: usize,
}

#[derive(Debug, Default)]
struct Counters {
    list_directories: AtomicUsize,
    list_files: AtomicUsize,
    first_file_lookups: AtomicUsize,
    metadata: AtomicUsize,
}

/// A synthetic backend holding a directory tree in memory.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use lb_discoverer::TimeSpan;
/// use lb_discoverer::storage::MemoryStorage;
///
/// let day = |d| Utc.with_ymd_and_hms(2020, 8, d, 0, 0, 0).unwrap();
/// let storage = MemoryStorage::new()
///     .with_file("/EEEE0001/00000001/00000001.MF4", TimeSpan::bounded(day(1), day(2)))
///     .with_dir("/EEEE0001/00000002");
///
/// assert_eq!(storage.calls().list_files, 0);
/// ```
///
/// Listings report each file's span start as its timestamp. Use
/// [`MemoryStorage::with_timestamps`] to report span ends instead, the way
/// disks and object stores do.
#[derive(Debug)]
pub struct MemoryStorage {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, MemoryFile>,
    failing: HashSet<String>,
    timestamps: TimestampKind,
    counters: Counters,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            dirs: BTreeSet::from(["/".to_string()]),
            files: BTreeMap::new(),
            failing: HashSet::new(),
            timestamps: TimestampKind::Start,
            counters: Counters::default(),
        }
    }

    /// Choose which side of each span listings report as the timestamp.
    pub fn with_timestamps(mut self, kind: TimestampKind) -> Self {
        self.timestamps = kind;
        self
    }

    /// Add a file with the given span; parent directories are created.
    pub fn with_file(mut self, path: &str, span: TimeSpan) -> Self {
        self.add_file(path, 0, span);
        self
    }

    /// Add a file spanning `[start, end)`.
    pub fn with_bounded_file(self, path: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.with_file(path, TimeSpan::bounded(start, end))
    }

    /// Add an empty directory; parent directories are created.
    pub fn with_dir(mut self, path: &str) -> Self {
        self.add_dir(&normalize_path(path));
        self
    }

    /// Make every call on `path` fail with [`StorageError::Unavailable`].
    pub fn failing_on(mut self, path: &str) -> Self {
        self.failing.insert(normalize_path(path));
        self
    }

    pub fn add_file(&mut self, path: &str, size: u64, span: TimeSpan) {
        let path = normalize_path(path);
        if let Some(parent) = parent_of(&path) {
            self.add_dir(&parent);
        }
        self.files.insert(path, MemoryFile { size, span });
    }

    fn add_dir(&mut self, path: &str) {
        let mut current = path.to_string();
        loop {
            self.dirs.insert(current.clone());
            match parent_of(&current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }

    /// Counts of calls issued so far.
    pub fn calls(&self) -> CallCounts {
        CallCounts {
            list_directories: self.counters.list_directories.load(Ordering::SeqCst),
            list_files: self.counters.list_files.load(Ordering::SeqCst),
            first_file_lookups: self.counters.first_file_lookups.load(Ordering::SeqCst),
            metadata: self.counters.metadata.load(Ordering::SeqCst),
        }
    }

    pub fn reset_calls(&self) {
        self.counters.list_directories.store(0, Ordering::SeqCst);
        self.counters.list_files.store(0, Ordering::SeqCst);
        self.counters.first_file_lookups.store(0, Ordering::SeqCst);
        self.counters.metadata.store(0, Ordering::SeqCst);
    }

    fn check(&self, path: &str) -> StorageResult<String> {
        let path = normalize_path(path);
        if self.failing.contains(&path) {
            return Err(StorageError::Unavailable(format!("injected failure on {path}")));
        }
        Ok(path)
    }

    fn timestamp_of(&self, file: &MemoryFile) -> Option<DateTime<Utc>> {
        match self.timestamps {
            TimestampKind::Start => file.span.start(),
            TimestampKind::End => file.span.end(),
        }
    }

    fn entries_below(&self, dir: &str) -> impl Iterator<Item = FileEntry> + '_ {
        let dir = dir.to_string();
        self.files
            .iter()
            .filter(move |(path, _)| parent_of(path).as_deref() == Some(dir.as_str()))
            .map(|(path, file)| FileEntry {
                name: file_name(path).to_string(),
                path: path.clone(),
                size: file.size,
                modified: self.timestamp_of(file),
            })
    }
}

fn parent_of(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn list_directories(&self, path: &str) -> StorageResult<Vec<String>> {
        self.counters.list_directories.fetch_add(1, Ordering::SeqCst);
        let path = self.check(path)?;

        if !self.dirs.contains(&path) {
            return Err(StorageError::NotFound(path));
        }

        Ok(self
            .dirs
            .iter()
            .filter(|dir| parent_of(dir).as_deref() == Some(path.as_str()))
            .map(|dir| file_name(dir).to_string())
            .collect())
    }

    async fn list_files(&self, path: &str) -> StorageResult<Vec<FileEntry>> {
        self.counters.list_files.fetch_add(1, Ordering::SeqCst);
        let path = self.check(path)?;

        if !self.dirs.contains(&path) {
            return Err(StorageError::NotFound(path));
        }

        Ok(self.entries_below(&path).collect())
    }

    async fn metadata(&self, path: &str) -> StorageResult<ObjectMeta> {
        self.counters.metadata.fetch_add(1, Ordering::SeqCst);
        let path = self.check(path)?;

        self.files
            .get(&path)
            .map(|file| ObjectMeta {
                size: file.size,
                modified: self.timestamp_of(file),
            })
            .ok_or(StorageError::NotFound(path))
    }

    async fn first_file(
        &self,
        path: &str,
        accept: NameFilter<'_>,
    ) -> StorageResult<Option<FileEntry>> {
        self.counters.first_file_lookups.fetch_add(1, Ordering::SeqCst);
        let path = self.check(path)?;

        Ok(self.entries_below(&path).find(|entry| accept(&entry.name)))
    }

    fn timestamp_kind(&self) -> TimestampKind {
        self.timestamps
    }

    fn file_time_range(&self, entry: &FileEntry) -> TimeSpan {
        self.files
            .get(&entry.path)
            .map(|file| file.span)
            .unwrap_or_else(|| self.timestamps.span_of(entry.modified))
    }

    fn description(&self) -> String {
        format!("memory({} files)", self.files.len())
    }
}
