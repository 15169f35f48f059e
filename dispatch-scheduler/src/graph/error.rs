//! Scheduling graph errors.

use crate::domain::{DomainError, PatternId, StationName};

/// Errors building or querying a [`SchedulingGraph`](super::SchedulingGraph).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The route pattern itself is malformed
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Two patterns share an identifier
    #[error("pattern id {0} is used more than once")]
    DuplicatePattern(PatternId),

    /// The travel table has no entry for a station the pattern calls at
    #[error("pattern {pattern} has no travel time for {station}")]
    MissingTravelTime {
        pattern: PatternId,
        station: StationName,
    },

    /// None of the pattern's stations survived key-location selection
    #[error("pattern {0} calls at no key locations")]
    NoKeyLocations(PatternId),

    #[error("unknown pattern {0}")]
    UnknownPattern(PatternId),

    #[error("unknown location {0}")]
    UnknownLocation(String),
}
