//! Service frequencies by calendar and time of day.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::time::{TimeError, TimeRange};

/// A calendar service such as "weekday" or "sunday".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarService(String);

impl CalendarService {
    pub fn new(s: impl Into<String>) -> Self {
        CalendarService(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CalendarService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Headways in minutes over disjoint time ranges of the service day.
///
/// Serialized as a map of `"H:MM-H:MM"` range to headway minutes. Ranges are
/// expected not to overlap; where they do, the earliest-starting range wins.
///
/// # Examples
///
/// ```
/// use dispatch_scheduler::domain::Frequencies;
/// use chrono::Duration;
///
/// let json = r#"{"6:00-9:00": 10, "9:00-18:00": 20}"#;
/// let freqs: Frequencies = serde_json::from_str(json).unwrap();
///
/// assert_eq!(freqs.headway_at(Duration::hours(7)), Some(10));
/// assert_eq!(freqs.trips_per_hour_at(Duration::hours(12)), Some(3));
/// assert_eq!(freqs.headway_at(Duration::hours(20)), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, u32>")]
pub struct Frequencies(Vec<(TimeRange, u32)>);

impl Frequencies {
    /// Build frequencies from `(range, headway_mins)` pairs.
    ///
    /// Headways must be positive.
    pub fn new(entries: impl IntoIterator<Item = (TimeRange, u32)>) -> Result<Self, TimeError> {
        let mut entries: Vec<_> = entries.into_iter().collect();
        if entries.iter().any(|(_, headway)| *headway == 0) {
            return Err(TimeError::new("headway must be positive"));
        }
        entries.sort();
        Ok(Frequencies(entries))
    }

    /// Headway in minutes of the range containing `t`, if any.
    pub fn headway_at(&self, t: Duration) -> Option<u32> {
        self.0
            .iter()
            .find(|(range, _)| range.contains(t))
            .map(|(_, headway)| *headway)
    }

    /// Trips per hour at `t`, rounded to the nearest whole trip.
    pub fn trips_per_hour_at(&self, t: Duration) -> Option<u32> {
        self.headway_at(t).map(trips_per_hour)
    }

    /// The ranges with service, in start order.
    pub fn ranges(&self) -> impl Iterator<Item = TimeRange> + '_ {
        self.0.iter().map(|(range, _)| *range)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Trips per hour for a headway in minutes: `round(60 / headway)`.
pub fn trips_per_hour(headway_mins: u32) -> u32 {
    (60.0 / headway_mins as f64).round() as u32
}

impl TryFrom<BTreeMap<String, u32>> for Frequencies {
    type Error = TimeError;

    fn try_from(raw: BTreeMap<String, u32>) -> Result<Self, Self::Error> {
        let entries = raw
            .into_iter()
            .map(|(range, headway)| Ok((TimeRange::parse(&range)?, headway)))
            .collect::<Result<Vec<_>, TimeError>>()?;
        Frequencies::new(entries)
    }
}

impl Serialize for Frequencies {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(range, headway)| (range.to_string(), headway)))
    }
}

/// Frequencies for each calendar service a pattern runs on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule(BTreeMap<CalendarService, Frequencies>);

impl Schedule {
    pub fn new(entries: impl IntoIterator<Item = (CalendarService, Frequencies)>) -> Self {
        Schedule(entries.into_iter().collect())
    }

    pub fn frequencies(&self, calendar: &CalendarService) -> Option<&Frequencies> {
        self.0.get(calendar)
    }

    pub fn calendars(&self) -> impl Iterator<Item = &CalendarService> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
