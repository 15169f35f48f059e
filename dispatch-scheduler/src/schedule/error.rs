//! Scheduling errors.

use std::collections::BTreeMap;

use crate::domain::PatternId;
use crate::graph::GraphError;
use crate::problem::ProblemError;

use super::dispatch::Direction;

/// Errors producing departure offsets or timetables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Problem(#[from] ProblemError),

    /// Every ordering was rejected or failed to optimize
    #[error("no feasible {direction} ordering for {}", describe(.trips))]
    NoFeasibleOrdering {
        direction: Direction,
        trips: BTreeMap<PatternId, u32>,
    },

    /// A blocking scheduling task panicked or was cancelled
    #[error("scheduling task failed: {0}")]
    Task(String),
}

fn describe(trips: &BTreeMap<PatternId, u32>) -> String {
    if trips.is_empty() {
        return "an empty working set".to_string();
    }
    trips
        .iter()
        .map(|(id, tph)| format!("{id}={tph}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::tph;

    #[test]
    fn error_display() {
        let err = ScheduleError::NoFeasibleOrdering {
            direction: Direction::Inbound,
            trips: tph(&[("x", 2), ("y", 3)]),
        };
        assert_eq!(err.to_string(), "no feasible inbound ordering for x=2, y=3");

        let err = ScheduleError::from(ProblemError::InvalidPeriod(0));
        assert_eq!(err.to_string(), "period must be positive, got 0s");

        let err = ScheduleError::Task("cancelled".into());
        assert_eq!(err.to_string(), "scheduling task failed: cancelled");
    }
}
