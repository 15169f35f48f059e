//! Domain types for route patterns and their timetables.
//!
//! This module contains the validated input model: station names, pattern
//! identifiers, travel-time tables and service frequencies. All types enforce
//! their invariants at construction (or deserialization) time, so code that
//! receives them can trust their validity.

mod error;
mod pattern;
mod schedule;
mod station;
mod time;

pub use error::DomainError;
pub use pattern::{InvalidPatternId, PatternId, Route, RoutePattern, TravelTimes, TravelTimesError};
pub use schedule::{CalendarService, Frequencies, Schedule, trips_per_hour};
pub use station::{InvalidStationName, StationDefinition, StationName, StationRef};
pub use time::{Seconds, TimeError, TimeRange, format_clock, parse_clock};
