//! Statistics for discovery runs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Statistics collected during a discovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryStats {
    /// When discovery started
    pub started_at: Option<DateTime<Utc>>,

    /// When discovery completed
    pub completed_at: Option<DateTime<Utc>>,

    /// Device roots traversed successfully
    pub roots_processed: usize,

    /// Device roots that were missing or had no folders
    pub empty_roots: usize,

    /// Folders found below device roots
    pub folders_seen: usize,

    /// Folders whose files were listed
    pub folders_listed: usize,

    /// Folders pruned without listing
    pub folders_pruned: usize,

    /// First-file lookups issued
    pub first_file_lookups: usize,

    /// Files returned by listings (after the extension filter)
    pub files_listed: usize,

    /// Files whose span overlaps the window
    pub files_matched: usize,

    /// Listed files outside the window
    pub files_skipped: usize,

    /// Total bytes of matched files
    pub bytes_matched: u64,

    /// Anomalies recorded
    pub anomalies: usize,
}

impl DiscoveryStats {
    /// Create a new stats tracker with the current time as start time.
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Mark discovery as complete with the current time.
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn record_match(&mut self, size_bytes: u64) {
        self.files_listed += 1;
        self.files_matched += 1;
        self.bytes_matched += size_bytes;
    }

    pub fn record_skip(&mut self) {
        self.files_listed += 1;
        self.files_skipped += 1;
    }

    /// Fold the counters of another run (typically one device root) in.
    pub fn merge(&mut self, other: &DiscoveryStats) {
        self.started_at = match (self.started_at, other.started_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.completed_at = match (self.completed_at, other.completed_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.roots_processed += other.roots_processed;
        self.empty_roots += other.empty_roots;
        self.folders_seen += other.folders_seen;
        self.folders_listed += other.folders_listed;
        self.folders_pruned += other.folders_pruned;
        self.first_file_lookups += other.first_file_lookups;
        self.files_listed += other.files_listed;
        self.files_matched += other.files_matched;
        self.files_skipped += other.files_skipped;
        self.bytes_matched += other.bytes_matched;
        self.anomalies += other.anomalies;
    }

    /// Get the duration of the discovery run.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Share of folders pruned without a listing call.
    pub fn prune_ratio(&self) -> f64 {
        if self.folders_seen == 0 {
            0.0
        } else {
            self.folders_pruned as f64 / self.folders_seen as f64
        }
    }
}
