//! Non-fatal traversal observations.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// What was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyKind {
    /// A folder below a device root whose name is not a session counter.
    /// It is listed in full instead of being pruned.
    UnrecognizedFolder,

    /// A log file whose stem is not a file counter.
    UnrecognizedFile,

    /// A session that started before the session preceding it by name,
    /// typically after a counter reset. Early termination is disabled for
    /// the rest of the root.
    OutOfOrderSession {
        previous_start: DateTime<Utc>,
        start: DateTime<Utc>,
    },
}

/// An anomaly attributed to a device root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub root: String,
    pub path: String,
    #[serde(flatten)]
    pub kind: AnomalyKind,
}

impl Anomaly {
    pub fn new(root: impl Into<String>, path: impl Into<String>, kind: AnomalyKind) -> Self {
        Self {
            root: root.into(),
            path: path.into(),
            kind,
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AnomalyKind::UnrecognizedFolder => {
                write!(f, "unrecognized folder {}", self.path)
            }
            AnomalyKind::UnrecognizedFile => write!(f, "unrecognized file {}", self.path),
            AnomalyKind::OutOfOrderSession {
                previous_start,
                start,
            } => write!(
                f,
                "session {} starts at {} before its predecessor ({})",
                self.path,
                start.to_rfc3339(),
                previous_start.to_rfc3339()
            ),
        }
    }
}
