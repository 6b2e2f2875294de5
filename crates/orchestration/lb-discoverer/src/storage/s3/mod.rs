//! S3-compatible object store adapter.
//!
//! This module provides:
//! - Client configuration with custom endpoint support
//! - Delimited, paginated listing that maps key prefixes onto directories
//! - Retry logic with exponential backoff

mod client;
mod list;
mod retry;

pub use client::{S3Config, S3Credentials};
pub use list::{DelimitedListing, ListGoal, S3Object, list_level};
pub use retry::{RetryConfig, with_retry};

use async_trait::async_trait;
use aws_sdk_s3::Client;
use chrono::DateTime;

use super::{
    FileEntry, NameFilter, ObjectMeta, StorageAdapter, StorageResult, join_path, path_segments,
};
use list::map_sdk_error;

/// Keys requested per page when looking for the first file of a session.
const FIRST_FILE_PAGE_SIZE: i32 = 32;

/// A bucket (optionally below a key prefix) exposed through rooted paths.
///
/// `/EEEE0001/00000001` maps to the key prefix `<prefix>EEEE0001/00000001/`.
/// Object stores have no real directories, so a missing device root simply
/// lists as empty.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
    retry: RetryConfig,
}

impl S3Storage {
    pub fn new(client: Client, bucket: impl Into<String>, prefix: Option<&str>) -> Self {
        let prefix = match prefix.map(|p| p.trim_matches('/')) {
            Some(p) if !p.is_empty() => format!("{p}/"),
            _ => String::new(),
        };

        Self {
            client,
            bucket: bucket.into(),
            prefix,
            retry: RetryConfig::default(),
        }
    }

    /// Build an adapter and its client from configuration.
    pub async fn from_config(config: &S3Config) -> Self {
        let client = config.connect().await;
        Self::new(client, &config.bucket, config.prefix.as_deref()).with_retry(config.retry.clone())
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key prefix for listing the children of a rooted directory path.
    fn dir_prefix(&self, path: &str) -> StorageResult<String> {
        let segments = path_segments(path)?;
        let mut prefix = self.prefix.clone();
        for segment in segments {
            prefix.push_str(segment);
            prefix.push('/');
        }
        Ok(prefix)
    }

    /// Object key for a rooted file path.
    fn object_key(&self, path: &str) -> StorageResult<String> {
        let segments = path_segments(path)?;
        Ok(format!("{}{}", self.prefix, segments.join("/")))
    }

    fn to_entry(&self, dir: &str, dir_prefix: &str, obj: S3Object) -> FileEntry {
        let name = obj.key[dir_prefix.len()..].to_string();
        FileEntry {
            path: join_path(dir, &name),
            name,
            size: obj.size,
            modified: obj.last_modified,
        }
    }
}

#[async_trait]
impl StorageAdapter for S3Storage {
    async fn list_directories(&self, path: &str) -> StorageResult<Vec<String>> {
        let prefix = self.dir_prefix(path)?;
        let listing = list_level(
            &self.client,
            &self.bucket,
            &prefix,
            ListGoal::Everything,
            None,
            &self.retry,
        )
        .await?;

        let mut names: Vec<String> = listing
            .prefixes
            .iter()
            .filter_map(|p| p.strip_prefix(prefix.as_str()))
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn list_files(&self, path: &str) -> StorageResult<Vec<FileEntry>> {
        let prefix = self.dir_prefix(path)?;
        let listing = list_level(
            &self.client,
            &self.bucket,
            &prefix,
            ListGoal::Everything,
            None,
            &self.retry,
        )
        .await?;

        let mut entries: Vec<FileEntry> = listing
            .objects
            .into_iter()
            .map(|obj| self.to_entry(path, &prefix, obj))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn metadata(&self, path: &str) -> StorageResult<ObjectMeta> {
        let key = self.object_key(path)?;

        let resp = with_retry(&self.retry, "head_object", || {
            let req = self.client.head_object().bucket(&self.bucket).key(&key);
            let key = key.as_str();
            async move { req.send().await.map_err(|e| map_sdk_error("head", key, e)) }
        })
        .await?;

        Ok(ObjectMeta {
            size: resp.content_length().unwrap_or(0).max(0) as u64,
            modified: resp
                .last_modified()
                .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
        })
    }

    async fn first_file(
        &self,
        path: &str,
        accept: NameFilter<'_>,
    ) -> StorageResult<Option<FileEntry>> {
        let prefix = self.dir_prefix(path)?;
        let listing = list_level(
            &self.client,
            &self.bucket,
            &prefix,
            ListGoal::FirstObject(accept),
            Some(FIRST_FILE_PAGE_SIZE),
            &self.retry,
        )
        .await?;

        Ok(listing
            .objects
            .into_iter()
            .next()
            .map(|obj| self.to_entry(path, &prefix, obj)))
    }

    fn description(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.prefix)
    }
}
