//! Constant-frequency windows.
//!
//! Patterns change frequency at different times of day. Splitting the union
//! of their ranges at every boundary gives windows in which every pattern's
//! frequency is constant, so each window is one scheduling problem.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{CalendarService, PatternId, RoutePattern, TimeRange};

/// A time range over which every pattern runs at a fixed rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyWindow {
    pub range: TimeRange,
    /// Trips per hour of each pattern with service in the range.
    pub trips: BTreeMap<PatternId, u32>,
}

/// Split the service day of `calendar` into constant-frequency windows.
///
/// Windows are disjoint, in start order, and cover the span from the first
/// range start to the last range end. A pattern appears in a window if one
/// of its ranges contains the window's start. Windows no pattern serves keep
/// an empty trips map.
pub fn constant_frequency_windows(patterns: &[RoutePattern], calendar: &CalendarService) -> Vec<FrequencyWindow> {
    let frequencies: Vec<_> = patterns
        .iter()
        .filter_map(|p| p.schedule.frequencies(calendar).map(|f| (&p.id, f)))
        .collect();

    let boundaries: BTreeSet<_> = frequencies
        .iter()
        .flat_map(|(_, f)| f.ranges())
        .flat_map(|range| [range.start(), range.end()])
        .collect();
    let boundaries: Vec<_> = boundaries.into_iter().collect();

    boundaries
        .windows(2)
        .filter_map(|pair| {
            let range = TimeRange::new(pair[0], pair[1]).ok()?;
            let trips = frequencies
                .iter()
                .filter_map(|(id, f)| f.trips_per_hour_at(range.start()).map(|tph| ((*id).clone(), tph)))
                .collect();
            Some(FrequencyWindow { range, trips })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Frequencies, Schedule};
    use crate::fixtures::{pattern, tph};

    fn scheduled(id: &str, ranges: &[(&str, u32)]) -> RoutePattern {
        let frequencies = Frequencies::new(
            ranges
                .iter()
                .map(|(range, headway)| (TimeRange::parse(range).unwrap(), *headway)),
        )
        .unwrap();
        pattern(id, &[("s", "0:00"), ("t", "0:10")])
            .with_schedule(Schedule::new([(CalendarService::new("weekday"), frequencies)]))
    }

    fn range(s: &str) -> TimeRange {
        TimeRange::parse(s).unwrap()
    }

    #[test]
    fn splits_at_every_boundary() {
        let patterns = vec![
            scheduled("a", &[("6:00-9:00", 10), ("9:00-20:00", 20)]),
            scheduled("b", &[("7:00-19:00", 30)]),
        ];
        let windows = constant_frequency_windows(&patterns, &CalendarService::new("weekday"));

        let expected = vec![
            (range("6:00-7:00"), tph(&[("a", 6)])),
            (range("7:00-9:00"), tph(&[("a", 6), ("b", 2)])),
            (range("9:00-19:00"), tph(&[("a", 3), ("b", 2)])),
            (range("19:00-20:00"), tph(&[("a", 3)])),
        ];
        let actual: Vec<_> = windows.into_iter().map(|w| (w.range, w.trips)).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn gaps_have_no_service() {
        let patterns = vec![scheduled("a", &[("6:00-7:00", 15), ("8:00-9:00", 15)])];
        let windows = constant_frequency_windows(&patterns, &CalendarService::new("weekday"));

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[1].range, range("7:00-8:00"));
        assert!(windows[1].trips.is_empty());
        assert_eq!(windows[2].trips, tph(&[("a", 4)]));
    }

    #[test]
    fn rounds_trips_per_hour() {
        let patterns = vec![scheduled("a", &[("6:00-7:00", 7)])];
        let windows = constant_frequency_windows(&patterns, &CalendarService::new("weekday"));
        assert_eq!(windows[0].trips, tph(&[("a", 9)]));
    }

    #[test]
    fn other_calendars_are_ignored() {
        let patterns = vec![scheduled("a", &[("6:00-7:00", 15)])];
        assert!(constant_frequency_windows(&patterns, &CalendarService::new("sunday")).is_empty());
    }
}
