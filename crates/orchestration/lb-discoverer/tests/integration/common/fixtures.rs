//! Device trees on local disk with controlled modification times.

use chrono::{DateTime, Duration, TimeZone, Utc};
use filetime::FileTime;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// `hour` hours into day `day` of August 2020 (day 1 = 2020-08-01).
pub fn at(day: i64, hour: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 8, 1, 0, 0, 0).unwrap() + Duration::days(day - 1) + Duration::hours(hour)
}

/// A temporary directory holding device roots.
pub struct LocalFleet {
    dir: TempDir,
}

impl LocalFleet {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn base(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file below the base directory and set its modification time.
    pub fn file(&self, rooted: &str, modified: DateTime<Utc>) -> PathBuf {
        let path = self.base().join(rooted.trim_start_matches('/'));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"MDF     4.11").unwrap();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(modified.timestamp(), 0)).unwrap();
        path
    }

    /// Daily sessions with three eight-hour files each. A file is written
    /// when it is closed, so the files are stamped 08:00, 16:00 and 24:00.
    pub fn daily_sessions(&self, root: &str, sessions: i64) {
        for s in 1..=sessions {
            for f in 1..=3 {
                self.file(&format!("{root}/{s:08}/{f:08}.MF4"), at(s, 8 * f));
            }
        }
    }
}
