//! Route patterns: the ordered stopping sequences that get scheduled.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::schedule::Schedule;
use super::station::{StationName, StationRef};
use super::time::{Seconds, TimeError, format_clock, parse_clock};
use super::DomainError;

/// Error returned when constructing an invalid pattern identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pattern id: {reason}")]
pub struct InvalidPatternId {
    reason: &'static str,
}

/// Identifier of a route pattern.
///
/// Pattern ids are opaque, non-empty strings. They order lexicographically,
/// which is the order candidates are tried in during ordering search.
///
/// # Examples
///
/// ```
/// use dispatch_scheduler::domain::PatternId;
///
/// let id = PatternId::new("red-northbound").unwrap();
/// assert_eq!(id.as_str(), "red-northbound");
/// assert!(PatternId::new("").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatternId(Arc<str>);

impl PatternId {
    pub fn new(s: impl AsRef<str>) -> Result<Self, InvalidPatternId> {
        let s = s.as_ref();
        if s.is_empty() {
            return Err(InvalidPatternId {
                reason: "pattern id cannot be empty",
            });
        }
        Ok(PatternId(Arc::from(s)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PatternId {
    type Error = InvalidPatternId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        PatternId::new(s)
    }
}

impl From<PatternId> for String {
    fn from(id: PatternId) -> Self {
        id.as_str().to_string()
    }
}

impl std::borrow::Borrow<str> for PatternId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PatternId({})", self.0)
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Travel time from a pattern's first station to each of its stations.
///
/// Serialized as a map of station name to `H:MM[:SS]` clock string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>")]
pub struct TravelTimes(BTreeMap<StationName, Seconds>);

impl TravelTimes {
    /// Build a travel table from offsets already in seconds.
    pub fn from_seconds(entries: impl IntoIterator<Item = (StationName, Seconds)>) -> Self {
        TravelTimes(entries.into_iter().collect())
    }

    /// Offset of `station` from the pattern's first station.
    pub fn offset(&self, station: &str) -> Option<Seconds> {
        self.0.get(station).copied()
    }

    pub fn contains(&self, station: &str) -> bool {
        self.0.contains_key(station)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StationName, Seconds)> {
        self.0.iter().map(|(name, secs)| (name, *secs))
    }
}

impl TryFrom<BTreeMap<String, String>> for TravelTimes {
    type Error = TravelTimesError;

    fn try_from(raw: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        raw.into_iter()
            .map(|(station, clock)| {
                let name = StationName::new(&station)
                    .map_err(|_| TravelTimesError::BlankStation)?;
                let offset = parse_clock(&clock).map_err(|source| TravelTimesError::Clock {
                    station: station.clone(),
                    source,
                })?;
                Ok((name, offset.num_seconds()))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(TravelTimes)
    }
}

impl Serialize for TravelTimes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .iter()
                .map(|(name, secs)| (name.as_str(), format_clock(chrono::Duration::seconds(*secs)))),
        )
    }
}

/// Error returned when a travel-time table cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TravelTimesError {
    #[error("travel time table contains a blank station name")]
    BlankStation,

    #[error("travel time for {station}: {source}")]
    Clock {
        station: String,
        #[source]
        source: TimeError,
    },
}

/// A route pattern: an ordered list of stations with travel times and a
/// schedule of service frequencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePattern {
    pub id: PatternId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Stations in calling order. Each station appears at most once.
    pub stations: Vec<StationRef>,

    pub travel_times: TravelTimes,

    #[serde(default)]
    pub schedule: Schedule,
}

impl RoutePattern {
    /// Create a pattern with an empty schedule.
    pub fn new(id: PatternId, stations: Vec<StationRef>, travel_times: TravelTimes) -> Self {
        Self {
            id,
            name: None,
            stations,
            travel_times,
            schedule: Schedule::default(),
        }
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Resolve the station list to canonical names.
    ///
    /// Fails if the list is empty or names a station twice.
    pub fn station_names(&self) -> Result<Vec<StationName>, DomainError> {
        if self.stations.is_empty() {
            return Err(DomainError::EmptyPattern(self.id.clone()));
        }
        let mut seen = HashSet::with_capacity(self.stations.len());
        self.stations
            .iter()
            .map(|entry| {
                let name = entry.name();
                if !seen.insert(name) {
                    return Err(DomainError::DuplicateStation {
                        pattern: self.id.clone(),
                        station: name.clone(),
                    });
                }
                Ok(name.clone())
            })
            .collect()
    }

    /// Returns true if the pattern calls at `station`.
    pub fn serves(&self, station: &str) -> bool {
        self.stations.iter().any(|s| s.name().as_str() == station)
    }
}

/// A named group of route patterns, typically the directions and branches of
/// one line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub patterns: Vec<RoutePattern>,
}
