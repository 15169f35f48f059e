//! Shared test fixtures.
//!
//! The X/Y/Z network: X runs a-b-c-d-e-f, Y runs c-d-e-f-g-h and Z runs
//! a-d-g-i. Its key locations are a, c, d, f, g, h and i.

use std::collections::BTreeMap;

use crate::domain::{PatternId, RoutePattern, StationName, StationRef, TravelTimes, parse_clock};

pub fn name(s: &str) -> StationName {
    StationName::new(s).unwrap()
}

pub fn pid(s: &str) -> PatternId {
    PatternId::new(s).unwrap()
}

/// A pattern calling at `calls`, each given with its `H:MM` offset.
pub fn pattern(id: &str, calls: &[(&str, &str)]) -> RoutePattern {
    RoutePattern::new(
        pid(id),
        calls
            .iter()
            .map(|(station, _)| StationRef::Named(name(station)))
            .collect(),
        TravelTimes::from_seconds(
            calls
                .iter()
                .map(|(station, clock)| (name(station), parse_clock(clock).unwrap().num_seconds())),
        ),
    )
}

pub fn xyz_patterns() -> Vec<RoutePattern> {
    vec![
        pattern(
            "x",
            &[
                ("a", "0:00"),
                ("b", "0:03"),
                ("c", "0:09"),
                ("d", "0:12"),
                ("e", "0:17"),
                ("f", "0:20"),
            ],
        ),
        pattern(
            "y",
            &[
                ("c", "0:00"),
                ("d", "0:03"),
                ("e", "0:06"),
                ("f", "0:09"),
                ("g", "0:10"),
                ("h", "0:13"),
            ],
        ),
        pattern("z", &[("a", "0:00"), ("d", "0:12"), ("g", "0:19"), ("i", "0:30")]),
    ]
}

/// Two patterns between the same pair of terminals.
pub fn shuttle_patterns() -> Vec<RoutePattern> {
    vec![
        pattern("a", &[("s", "0:00"), ("t", "0:10")]),
        pattern("b", &[("s", "0:00"), ("t", "0:10")]),
    ]
}

/// A trips-per-hour map from `(pattern, tph)` pairs.
pub fn tph(entries: &[(&str, u32)]) -> BTreeMap<PatternId, u32> {
    entries.iter().map(|(id, n)| (pid(id), *n)).collect()
}
