//! Device/session/file naming convention.
//!
//! A device root holds session folders named by a fixed-width counter, and
//! each session folder holds log files named the same way. Name order is
//! chronological order; names that do not follow the convention are still
//! traversed but cannot take part in pruning.

use chrono::{DateTime, Utc};
use lb_error::{LbError, Result};
use regex::Regex;
use serde::Serialize;

use crate::config::DiscoveryConfig;
use crate::span::TimeSpan;
use crate::storage::{StorageAdapter, StorageResult, join_path};

/// A child folder of a device root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionFolder {
    pub name: String,
    pub path: String,
    /// Whether the name matches the session pattern
    pub conforming: bool,
}

/// A log file inside a session folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFile {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub span: TimeSpan,
    /// Whether the stem matches the file pattern
    pub conforming: bool,
}

/// Compiled naming rules.
#[derive(Debug, Clone)]
pub struct NamingConvention {
    session: Regex,
    file: Regex,
    extensions: Vec<String>,
}

impl NamingConvention {
    /// Compile the naming rules. Extensions are matched case-insensitively;
    /// an empty list accepts every file.
    pub fn new<S: AsRef<str>>(
        session_pattern: &str,
        file_pattern: &str,
        extensions: &[S],
    ) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| LbError::Config(format!("Invalid name pattern '{pattern}': {e}")))
        };

        Ok(Self {
            session: compile(session_pattern)?,
            file: compile(file_pattern)?,
            extensions: extensions
                .iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_uppercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        })
    }

    pub fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        Self::new(
            &config.session_pattern,
            &config.file_pattern,
            config.file_extensions.as_slice(),
        )
    }

    pub fn is_session_name(&self, name: &str) -> bool {
        self.session.is_match(name)
    }

    /// Whether a file name's stem follows the convention.
    pub fn is_log_file_name(&self, name: &str) -> bool {
        self.file.is_match(split_extension(name).0)
    }

    pub fn accepts_extension(&self, name: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let ext = split_extension(name).1.to_uppercase();
        self.extensions.iter().any(|accepted| *accepted == ext)
    }

    /// List the session folders of a device root in name order.
    ///
    /// A missing root yields an empty list.
    pub async fn session_folders_of(
        &self,
        adapter: &dyn StorageAdapter,
        root: &str,
    ) -> StorageResult<Vec<SessionFolder>> {
        let mut names = match adapter.list_directories(root).await {
            Ok(names) => names,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| SessionFolder {
                path: join_path(root, &name),
                conforming: self.is_session_name(&name),
                name,
            })
            .collect())
    }

    /// List the accepted log files of a session folder in name order.
    ///
    /// Each file's span is completed from its neighbours: a missing start is
    /// the previous file's end (or `lower` for the first file), and a
    /// missing end is the next file's start (or `upper` for the last file).
    pub async fn log_files_of(
        &self,
        adapter: &dyn StorageAdapter,
        folder: &str,
        lower: Option<DateTime<Utc>>,
        upper: Option<DateTime<Utc>>,
    ) -> StorageResult<Vec<LogFile>> {
        let mut entries = adapter.list_files(folder).await?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut files: Vec<LogFile> = entries
            .into_iter()
            .filter(|entry| self.accepts_extension(&entry.name))
            .map(|entry| LogFile {
                span: adapter.file_time_range(&entry),
                conforming: self.is_log_file_name(&entry.name),
                name: entry.name,
                path: entry.path,
                size: entry.size,
            })
            .collect();

        let mut preceding = lower;
        for file in files.iter_mut() {
            if let Some(start) = preceding {
                file.span = file.span.open_at(start);
            }
            if let Some(end) = file.span.end() {
                preceding = Some(end);
            }
        }

        let mut following = upper;
        for file in files.iter_mut().rev() {
            if let Some(end) = following {
                file.span = file.span.close_at(end);
            }
            if let Some(start) = file.span.start() {
                following = Some(start);
            }
        }

        Ok(files)
    }
}

/// Split `name` into stem and extension at the last dot.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext),
        _ => (name, ""),
    }
}
