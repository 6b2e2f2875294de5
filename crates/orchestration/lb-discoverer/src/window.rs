//! Query windows and date parsing.

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use lb_error::{LbError, Result};
use serde::{Deserialize, Serialize};

/// A half-open `[start, stop)` interval on the UTC timeline.
///
/// Both bounds are optional: a missing bound leaves that side of the window
/// unconstrained, so [`QueryWindow::unbounded`] matches every file.
///
/// # Example
///
/// ```
/// use chrono::{FixedOffset, TimeZone, Utc};
/// use lb_discoverer::QueryWindow;
///
/// let cet = FixedOffset::east_opt(3600).unwrap();
/// let window = QueryWindow::new(
///     cet.with_ymd_and_hms(2020, 8, 2, 1, 0, 0).unwrap(),
///     cet.with_ymd_and_hms(2020, 8, 4, 1, 0, 0).unwrap(),
/// ).unwrap();
///
/// assert_eq!(window.start(), Some(Utc.with_ymd_and_hms(2020, 8, 2, 0, 0, 0).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    /// Inclusive lower bound
    start: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    stop: Option<DateTime<Utc>>,
}

impl QueryWindow {
    /// Create a window from two timezone-aware instants.
    ///
    /// Returns [`LbError::InvalidWindow`] unless `start < stop`.
    pub fn new<A: TimeZone, B: TimeZone>(start: DateTime<A>, stop: DateTime<B>) -> Result<Self> {
        Self::from_bounds(Some(start.with_timezone(&Utc)), Some(stop.with_timezone(&Utc)))
    }

    /// Create a window from optional UTC bounds.
    pub fn from_bounds(start: Option<DateTime<Utc>>, stop: Option<DateTime<Utc>>) -> Result<Self> {
        if let (Some(start), Some(stop)) = (start, stop) {
            if stop <= start {
                return Err(LbError::InvalidWindow { start, stop });
            }
        }
        Ok(Self { start, stop })
    }

    /// Everything at or after `start`.
    pub fn since<Tz: TimeZone>(start: DateTime<Tz>) -> Self {
        Self {
            start: Some(start.with_timezone(&Utc)),
            stop: None,
        }
    }

    /// Everything strictly before `stop`.
    pub fn until<Tz: TimeZone>(stop: DateTime<Tz>) -> Self {
        Self {
            start: None,
            stop: Some(stop.with_timezone(&Utc)),
        }
    }

    /// A window without bounds.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn stop(&self) -> Option<DateTime<Utc>> {
        self.stop
    }

    /// Check whether an instant falls inside the window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| instant >= start) && self.stop.is_none_or(|stop| instant < stop)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.stop.is_none()
    }

    /// Human-readable description used in logs.
    pub fn description(&self) -> String {
        let fmt = |t: Option<DateTime<Utc>>| {
            t.map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                .unwrap_or_else(|| "*".to_string())
        };
        format!("[{}, {})", fmt(self.start), fmt(self.stop))
    }
}

/// Parse a date string in various formats.
///
/// Supported formats:
/// - RFC 3339 with an explicit offset: `2020-08-02T10:30:00Z`, `2020-08-02T12:30:00+02:00`
/// - Date only: `2020-08-02` (assumes 00:00:00 UTC)
/// - Relative: `-24h`, `-7d`, `-2w` (hours/days/weeks ago from now)
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if input.starts_with('-') {
        return parse_relative_date(input);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let datetime = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| LbError::Config(format!("Invalid date: {input}")))?;
        return Ok(DateTime::from_naive_utc_and_offset(datetime, Utc));
    }

    Err(LbError::Config(format!(
        "Invalid date format: {input}. Expected RFC 3339 with offset (2020-08-02T10:30:00Z), \
         date only (2020-08-02), or relative (-24h, -7d)"
    )))
}

/// Parse a relative date string like "-24h" or "-7d".
fn parse_relative_date(input: &str) -> Result<DateTime<Utc>> {
    let invalid = |reason: String| LbError::Config(reason);
    let input = input.trim_start_matches('-');

    let Some(unit) = input.chars().last() else {
        return Err(invalid("Empty relative date".to_string()));
    };
    let num_str = &input[..input.len() - unit.len_utf8()];

    let num: i64 = num_str
        .parse()
        .map_err(|_| invalid(format!("Invalid number in relative date: {num_str}")))?;

    let duration = match unit.to_ascii_lowercase() {
        'h' => TimeDelta::try_hours(num),
        'd' => TimeDelta::try_days(num),
        'w' => TimeDelta::try_weeks(num),
        _ => {
            return Err(invalid(format!(
                "Invalid relative date unit: {input}. Use 'h' (hours), 'd' (days), or 'w' (weeks)"
            )));
        }
    };

    duration
        .and_then(|duration| Utc::now().checked_sub_signed(duration))
        .ok_or_else(|| invalid(format!("Relative date out of range: -{input}")))
}
