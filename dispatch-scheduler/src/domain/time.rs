//! Clock values and time ranges used by timetable inputs.
//!
//! Route inputs express times as `H:MM` or `H:MM:SS` strings. Travel-time
//! tables use them as offsets from a pattern's first station; schedules use
//! them as times since the start of the service day. Hours are not capped at
//! 23 because service days routinely run past midnight.

use std::fmt;

use chrono::Duration;

/// Whole seconds. All scheduling arithmetic is carried out in this unit.
pub type Seconds = i64;

/// Error returned when parsing an invalid clock string or time range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    pub(crate) fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Parse an `H:MM` or `H:MM:SS` clock string into a duration.
///
/// # Examples
///
/// ```
/// use dispatch_scheduler::domain::parse_clock;
/// use chrono::Duration;
///
/// assert_eq!(parse_clock("0:03").unwrap(), Duration::minutes(3));
/// assert_eq!(parse_clock("1:02:05").unwrap(), Duration::seconds(3725));
/// assert_eq!(parse_clock("25:00").unwrap(), Duration::hours(25));
///
/// assert!(parse_clock("3").is_err());
/// assert!(parse_clock("0:75").is_err());
/// ```
pub fn parse_clock(s: &str) -> Result<Duration, TimeError> {
    let mut fields = s.trim().split(':');

    let hours = parse_field(fields.next(), "missing hours")?;
    let minutes = parse_field(fields.next(), "expected H:MM or H:MM:SS")?;
    let seconds = match fields.next() {
        Some(field) => parse_field(Some(field), "missing seconds")?,
        None => 0,
    };

    if fields.next().is_some() {
        return Err(TimeError::new("too many fields"));
    }
    if minutes > 59 {
        return Err(TimeError::new("minute must be 0-59"));
    }
    if seconds > 59 {
        return Err(TimeError::new("second must be 0-59"));
    }

    Ok(Duration::seconds(hours * 3600 + minutes * 60 + seconds))
}

fn parse_field(field: Option<&str>, missing: &'static str) -> Result<i64, TimeError> {
    let field = field.ok_or_else(|| TimeError::new(missing))?;
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeError::new("fields must be ASCII digits"));
    }
    field
        .parse::<i64>()
        .map_err(|_| TimeError::new("field out of range"))
}

/// Format a duration as `H:MM:SS`, the inverse of [`parse_clock`] for
/// non-negative durations.
pub fn format_clock(d: Duration) -> String {
    let total = d.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// A half-open range of the service day, `[start, end)`.
///
/// # Examples
///
/// ```
/// use dispatch_scheduler::domain::TimeRange;
/// use chrono::Duration;
///
/// let range = TimeRange::parse("7:00-9:30").unwrap();
/// assert_eq!(range.start(), Duration::hours(7));
/// assert!(range.contains(Duration::hours(9)));
/// assert!(!range.contains(Duration::minutes(570)));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeRange {
    start: Duration,
    end: Duration,
}

impl TimeRange {
    /// Create a range, rejecting empty or inverted bounds.
    pub fn new(start: Duration, end: Duration) -> Result<Self, TimeError> {
        if end <= start {
            return Err(TimeError::new("range end must be after its start"));
        }
        Ok(Self { start, end })
    }

    /// Parse an `H:MM-H:MM` range string.
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| TimeError::new("expected START-END"))?;
        Self::new(parse_clock(start)?, parse_clock(end)?)
    }

    pub fn start(&self) -> Duration {
        self.start
    }

    pub fn end(&self) -> Duration {
        self.end
    }

    /// Returns true if `t` lies within `[start, end)`.
    pub fn contains(&self, t: Duration) -> bool {
        self.start <= t && t < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Debug for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeRange({})", self)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_clock(self.start), format_clock(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hours_and_minutes() {
        assert_eq!(parse_clock("0:00").unwrap(), Duration::zero());
        assert_eq!(parse_clock("0:12").unwrap(), Duration::minutes(12));
        assert_eq!(parse_clock("6:30").unwrap(), Duration::minutes(390));
    }

    #[test]
    fn parse_with_seconds() {
        assert_eq!(parse_clock("0:01:30").unwrap(), Duration::seconds(90));
    }

    #[test]
    fn parse_past_midnight() {
        assert_eq!(parse_clock("24:30").unwrap(), Duration::minutes(1470));
    }

    #[test]
    fn parse_tolerates_whitespace() {
        assert_eq!(parse_clock(" 7:05 ").unwrap(), Duration::minutes(425));
    }

    #[test]
    fn reject_malformed() {
        assert!(parse_clock("").is_err());
        assert!(parse_clock("12").is_err());
        assert!(parse_clock("1:2:3:4").is_err());
        assert!(parse_clock("a:00").is_err());
        assert!(parse_clock("1:-5").is_err());
        assert!(parse_clock("1:60").is_err());
        assert!(parse_clock("1:00:60").is_err());
    }

    #[test]
    fn error_display() {
        let err = parse_clock("1:60").unwrap_err();
        assert_eq!(err.to_string(), "invalid time: minute must be 0-59");
    }

    #[test]
    fn format_clock_output() {
        assert_eq!(format_clock(Duration::seconds(3725)), "1:02:05");
        assert_eq!(format_clock(Duration::zero()), "0:00:00");
        assert_eq!(format_clock(Duration::seconds(-90)), "-0:01:30");
    }

    #[test]
    fn range_parse_and_display() {
        let range = TimeRange::parse("6:00-9:00").unwrap();
        assert_eq!(range.start(), Duration::hours(6));
        assert_eq!(range.end(), Duration::hours(9));
        assert_eq!(range.duration(), Duration::hours(3));
        assert_eq!(range.to_string(), "6:00:00-9:00:00");
    }

    #[test]
    fn range_rejects_inverted() {
        assert!(TimeRange::parse("9:00-6:00").is_err());
        assert!(TimeRange::parse("9:00-9:00").is_err());
        assert!(TimeRange::parse("9:00").is_err());
    }

    #[test]
    fn range_is_half_open() {
        let range = TimeRange::parse("6:00-7:00").unwrap();
        assert!(range.contains(Duration::hours(6)));
        assert!(range.contains(Duration::minutes(419)));
        assert!(!range.contains(Duration::hours(7)));
    }
}
