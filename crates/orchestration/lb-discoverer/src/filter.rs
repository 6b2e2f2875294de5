//! Range classification of spans against a query window.
//!
//! The discoverer consults the [`RangeFilter`] twice: once per session folder
//! to decide whether the folder needs to be listed at all, and once per log
//! file to decide whether it belongs in the result.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::span::TimeSpan;
use crate::window::QueryWindow;

/// Which side of the window a skipped span lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    /// The span ends at or before the window start.
    Before,
    /// The span starts at or after the window stop.
    After,
}

/// Outcome of classifying a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Empty intersection with the window.
    Skip(SkipReason),
    /// Entirely inside the window.
    Include,
    /// Unknown, open-ended, or straddling a window boundary.
    Inspect,
}

impl Classification {
    /// Whether the span may overlap the window.
    pub fn may_overlap(&self) -> bool {
        !matches!(self, Self::Skip(_))
    }
}

/// Three-way classifier for spans.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use lb_discoverer::{Classification, QueryWindow, RangeFilter, SkipReason, TimeSpan};
///
/// let day = |d| Utc.with_ymd_and_hms(2020, 8, d, 0, 0, 0).unwrap();
/// let filter = RangeFilter::new(QueryWindow::new(day(2), day(4)).unwrap());
///
/// assert_eq!(filter.classify(&TimeSpan::bounded(day(2), day(3))), Classification::Include);
/// assert_eq!(filter.classify(&TimeSpan::bounded(day(1), day(3))), Classification::Inspect);
/// assert_eq!(filter.classify(&TimeSpan::starting_at(day(4))), Classification::Skip(SkipReason::After));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RangeFilter {
    window: QueryWindow,
}

impl RangeFilter {
    pub fn new(window: QueryWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &QueryWindow {
        &self.window
    }

    /// Classify a span against the window.
    pub fn classify(&self, span: &TimeSpan) -> Classification {
        let (start, end) = match *span {
            TimeSpan::Unknown => return Classification::Inspect,
            TimeSpan::Ending { end } => return self.classify_ending(end),
            TimeSpan::Open { start } => (start, None),
            TimeSpan::Bounded { start, end } => (start, Some(end)),
        };

        if self.window.stop().is_some_and(|stop| start >= stop) {
            return Classification::Skip(SkipReason::After);
        }

        // A degenerate span is the instant `start`, which is already known to
        // lie before the stop.
        if let (Some(end), Some(window_start)) = (end, self.window.start()) {
            if end > start && end <= window_start {
                return Classification::Skip(SkipReason::Before);
            }
            if end <= start && start < window_start {
                return Classification::Skip(SkipReason::Before);
            }
        }

        let starts_inside = self.window.start().is_none_or(|window_start| start >= window_start);
        let ends_inside = match (end, self.window.stop()) {
            (_, None) => true,
            (Some(end), Some(stop)) => end <= stop,
            (None, Some(_)) => false,
        };

        if starts_inside && ends_inside {
            Classification::Include
        } else {
            Classification::Inspect
        }
    }

    /// A span with an unknown start can only be ruled out on the left.
    fn classify_ending(&self, end: DateTime<Utc>) -> Classification {
        match (self.window.start(), self.window.stop()) {
            (Some(window_start), _) if end <= window_start => {
                Classification::Skip(SkipReason::Before)
            }
            (None, stop) if stop.is_none_or(|stop| end <= stop) => Classification::Include,
            _ => Classification::Inspect,
        }
    }

    /// Whether the span overlaps the window (unknown spans always do).
    pub fn overlaps(&self, span: &TimeSpan) -> bool {
        self.classify(span).may_overlap()
    }

    /// Human-readable description used in logs.
    pub fn description(&self) -> String {
        format!("range{}", self.window.description())
    }
}
