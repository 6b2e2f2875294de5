//! Time spans for session folders and log files.
//!
//! Spans are derived from cheap backend metadata, never from file contents,
//! so they are frequently partial. Partial states are explicit rather than
//! encoded with sentinel instants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The recording interval of a folder or file.
///
/// `end` is exclusive. A degenerate span (`end <= start`) is treated as the
/// single instant `start` by the range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeSpan {
    /// Known start and known end.
    Bounded {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Known start, end not yet determined (e.g. the newest file of a device).
    Open { start: DateTime<Utc> },

    /// Known end, start not yet determined (e.g. the first file of a device
    /// on a backend that stamps files when they are closed).
    Ending { end: DateTime<Utc> },

    /// Nothing is known; never pruned.
    Unknown,
}

impl TimeSpan {
    pub fn bounded(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::Bounded { start, end }
    }

    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self::Open { start }
    }

    pub fn ending_at(end: DateTime<Utc>) -> Self {
        Self::Ending { end }
    }

    /// Build a span from an optional start timestamp.
    pub fn from_start(start: Option<DateTime<Utc>>) -> Self {
        match start {
            Some(start) => Self::Open { start },
            None => Self::Unknown,
        }
    }

    /// Build a span from an optional end timestamp.
    pub fn from_end(end: Option<DateTime<Utc>>) -> Self {
        match end {
            Some(end) => Self::Ending { end },
            None => Self::Unknown,
        }
    }

    /// The lower bound of the span, if known.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Bounded { start, .. } | Self::Open { start } => Some(*start),
            Self::Ending { .. } | Self::Unknown => None,
        }
    }

    /// The exclusive upper bound of the span, if known.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Bounded { end, .. } | Self::Ending { end } => Some(*end),
            Self::Open { .. } | Self::Unknown => None,
        }
    }

    /// Close an open span at `end`.
    ///
    /// Only an `Open` span is affected, and only when `end` lies strictly
    /// after its start. Anything else is returned unchanged, which keeps the
    /// span at least as wide as before.
    pub fn close_at(self, end: DateTime<Utc>) -> Self {
        match self {
            Self::Open { start } if end > start => Self::Bounded { start, end },
            other => other,
        }
    }

    /// Give an ending span its start.
    ///
    /// The mirror of [`TimeSpan::close_at`]: only an `Ending` span whose end
    /// lies strictly after `start` is affected.
    pub fn open_at(self, start: DateTime<Utc>) -> Self {
        match self {
            Self::Ending { end } if start < end => Self::Bounded { start, end },
            other => other,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}
