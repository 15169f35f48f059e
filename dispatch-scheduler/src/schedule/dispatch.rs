//! Dispatch timestamps and departures.

use std::fmt;

use chrono::Duration;
use serde::Serialize;

use crate::domain::{PatternId, Seconds, TimeRange};

/// Direction of travel over a subgraph.
///
/// Outbound uses the patterns as given; inbound uses the reversed graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Outbound, Direction::Inbound];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => f.pad("outbound"),
            Direction::Inbound => f.pad("inbound"),
        }
    }
}

/// One train leaving its dispatch location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub pattern: PatternId,
    pub direction: Direction,
    /// Time since the start of the service day.
    pub time: Duration,
}

/// Dispatch times of one pattern within a range: `start + offset`, then
/// every headway, stopping before the end of the range.
///
/// # Examples
///
/// ```
/// use dispatch_scheduler::domain::TimeRange;
/// use dispatch_scheduler::schedule::DispatchTimes;
///
/// let range = TimeRange::parse("0:00-1:00").unwrap();
/// let times: Vec<_> = DispatchTimes::new(range, 300, 1200)
///     .map(|t| t.num_seconds())
///     .collect();
/// assert_eq!(times, vec![300, 1500, 2700]);
/// ```
#[derive(Debug, Clone)]
pub struct DispatchTimes {
    next: Duration,
    end: Duration,
    headway: Duration,
}

impl DispatchTimes {
    pub fn new(range: TimeRange, offset: Seconds, headway: Seconds) -> Self {
        let next = range.start() + Duration::seconds(offset);
        // A non-positive headway would never advance.
        let end = if headway > 0 { range.end() } else { next };
        Self {
            next,
            end,
            headway: Duration::seconds(headway),
        }
    }

    /// Dispatch times for `trips` per `period` seconds.
    pub fn for_trips(range: TimeRange, offset: Seconds, trips: u32, period: Seconds) -> Self {
        let headway = if trips == 0 { 0 } else { period / trips as Seconds };
        Self::new(range, offset, headway)
    }
}

impl Iterator for DispatchTimes {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.next >= self.end {
            return None;
        }
        let current = self.next;
        self.next += self.headway;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(times: DispatchTimes) -> Vec<i64> {
        times.map(|t| t.num_seconds()).collect()
    }

    #[test]
    fn three_trips_an_hour() {
        let range = TimeRange::parse("0:00-1:00").unwrap();
        assert_eq!(secs(DispatchTimes::for_trips(range, 300, 3, 3600)), vec![300, 1500, 2700]);
    }

    #[test]
    fn offset_from_range_start() {
        let range = TimeRange::parse("6:00-7:00").unwrap();
        let times = secs(DispatchTimes::for_trips(range, 0, 2, 3600));
        assert_eq!(times, vec![6 * 3600, 6 * 3600 + 1800]);
    }

    #[test]
    fn end_is_exclusive() {
        let range = TimeRange::parse("0:00-0:30").unwrap();
        assert_eq!(secs(DispatchTimes::new(range, 600, 1200)), vec![600]);
        assert_eq!(secs(DispatchTimes::new(range, 1800, 1200)), Vec::<i64>::new());
    }

    #[test]
    fn zero_trips_dispatch_nothing() {
        let range = TimeRange::parse("0:00-1:00").unwrap();
        assert_eq!(DispatchTimes::for_trips(range, 0, 0, 3600).count(), 0);
        assert_eq!(DispatchTimes::new(range, 0, 0).count(), 0);
    }

    #[test]
    fn direction_display() {
        assert_eq!(Direction::Outbound.to_string(), "outbound");
        assert_eq!(serde_json::to_string(&Direction::Inbound).unwrap(), "\"inbound\"");
    }
}
