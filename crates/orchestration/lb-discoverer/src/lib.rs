//! lb-discoverer - time-windowed discovery of session log files.
//!
//! Log files are stored per device as `<device>/<session>/<file>`, with
//! session and file names being fixed-width counters in chronological
//! order. This crate finds the files whose recording interval overlaps a
//! `[start, stop)` window while listing as few folders as possible. It
//! supports:
//!
//! - Local directories and S3-compatible buckets behind one [`StorageAdapter`]
//! - Folder pruning from cheap first-file lookups and binary search
//! - Early termination once sessions start after the window
//! - Anomaly reporting for unrecognized names and counter resets
//! - Concurrent traversal of multiple device roots
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lb_discoverer::{Discoverer, DiscoveryConfig, QueryWindow, parse_date};
//! use lb_discoverer::storage::LocalStorage;
//!
//! let storage = Arc::new(LocalStorage::new("/mnt/sdcard"));
//! let discoverer = Discoverer::new(storage, DiscoveryConfig::new())?;
//!
//! let window = QueryWindow::new(parse_date("2020-08-02")?, parse_date("2020-08-04")?)?;
//! let discovery = discoverer.discover(&["/EEEE0001"], &window).await?;
//! eprintln!("Discovered {} files", discovery.stats.files_matched);
//! ```

use serde::Serialize;

pub mod anomaly;
pub mod config;
pub mod discoverer;
pub mod filter;
pub mod naming;
pub mod output;
pub mod span;
pub mod stats;
pub mod storage;
pub mod window;

pub use anomaly::{Anomaly, AnomalyKind};
pub use config::DiscoveryConfig;
pub use discoverer::{Discoverer, Discovery, RootDiscovery, discover};
pub use filter::{Classification, RangeFilter, SkipReason};
pub use naming::{LogFile, NamingConvention, SessionFolder};
pub use output::{OutputFormat, write_files};
pub use span::TimeSpan;
pub use stats::DiscoveryStats;
pub use storage::{
    FileEntry, LocalStorage, MemoryStorage, ObjectMeta, S3Storage, StorageAdapter, TimestampKind,
};
pub use window::{QueryWindow, parse_date};

/// A log file that overlaps the query window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredFile {
    /// The device root the file was found under
    pub root: String,

    /// Rooted path of the file
    pub path: String,

    /// Size of the file in bytes
    pub size_bytes: u64,

    /// Recording interval as estimated during discovery
    pub span: TimeSpan,

    /// `include` when the span lies inside the window, `inspect` otherwise
    pub classification: Classification,
}
