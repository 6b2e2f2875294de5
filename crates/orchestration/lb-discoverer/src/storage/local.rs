//! Local filesystem adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lb_error::StorageError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

use super::{FileEntry, ObjectMeta, StorageAdapter, StorageResult, join_path, path_segments};

/// A local directory exposed through rooted paths.
///
/// `/EEEE0001/00000001` resolves to `<base_path>/EEEE0001/00000001`.
/// Paths that try to escape the base directory are rejected.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        let mut resolved = self.base_path.clone();
        for segment in path_segments(path)? {
            resolved.push(segment);
        }
        Ok(resolved)
    }

    /// Read a directory, returning (name, metadata) pairs for UTF-8 names.
    async fn read_entries(&self, path: &str) -> StorageResult<Vec<(String, std::fs::Metadata)>> {
        let dir = self.resolve(path)?;
        let mut reader = fs::read_dir(&dir).await?;
        let mut entries = Vec::new();

        while let Some(entry) = reader.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(dir = %dir.display(), name = ?raw, "Skipping non UTF-8 entry");
                    continue;
                }
            };
            // Follows symlinks, so linked sessions are listed like real ones
            let meta = match fs::metadata(entry.path()).await {
                Ok(meta) => meta,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            entries.push((name, meta));
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

fn modified_time(meta: &std::fs::Metadata) -> Option<DateTime<Utc>> {
    meta.modified().ok().map(DateTime::<Utc>::from)
}

#[async_trait]
impl StorageAdapter for LocalStorage {
    async fn list_directories(&self, path: &str) -> StorageResult<Vec<String>> {
        let entries = self.read_entries(path).await?;
        Ok(entries
            .into_iter()
            .filter(|(_, meta)| meta.is_dir())
            .map(|(name, _)| name)
            .collect())
    }

    async fn list_files(&self, path: &str) -> StorageResult<Vec<FileEntry>> {
        let entries = self.read_entries(path).await?;
        Ok(entries
            .into_iter()
            .filter(|(_, meta)| meta.is_file())
            .map(|(name, meta)| FileEntry {
                path: join_path(path, &name),
                name,
                size: meta.len(),
                modified: modified_time(&meta),
            })
            .collect())
    }

    async fn metadata(&self, path: &str) -> StorageResult<ObjectMeta> {
        let meta = fs::metadata(self.resolve(path)?).await?;
        if meta.is_dir() {
            return Err(StorageError::InvalidPath(format!("{path} is a directory")));
        }
        Ok(ObjectMeta {
            size: meta.len(),
            modified: modified_time(&meta),
        })
    }

    fn description(&self) -> String {
        format!("local({})", self.base_path.display())
    }
}
