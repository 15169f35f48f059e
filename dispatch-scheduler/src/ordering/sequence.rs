//! Timing bounds on dispatch sequences.
//!
//! These are lower bounds that hold regardless of where arrivals end up: two
//! consecutive dispatches are at least the dispatch spacing apart, and two
//! dispatches of one service are at least its headway apart.

use std::collections::HashMap;

use crate::domain::Seconds;
use crate::problem::{SchedulingProblem, ServiceIdx};

/// Smallest possible time from the dispatch before `sequence` to its last
/// dispatch.
pub fn minimum_time_spanned(sequence: &[ServiceIdx], problem: &SchedulingProblem<'_>) -> Seconds {
    let spacing = problem.dispatch_spacing();
    let mut now = 0;
    let mut previous: HashMap<ServiceIdx, Seconds> = HashMap::new();

    for &service in sequence {
        let earliest = now + spacing;
        now = match previous.get(&service) {
            Some(&last) => earliest.max(last + problem.headway(service)),
            None => earliest,
        };
        previous.insert(service, now);
    }
    now
}

fn tail_after_last(sequence: &[ServiceIdx], service: ServiceIdx) -> Option<&[ServiceIdx]> {
    sequence
        .iter()
        .rposition(|&s| s == service)
        .map(|last| &sequence[last + 1..])
}

/// True if dispatching `service` after `sequence` would come later than one
/// headway after its previous dispatch.
pub fn dispatch_is_too_late(
    sequence: &[ServiceIdx],
    service: ServiceIdx,
    problem: &SchedulingProblem<'_>,
) -> bool {
    tail_after_last(sequence, service)
        .is_some_and(|tail| minimum_time_spanned(tail, problem) > problem.headway(service))
}

/// True if a complete `sequence` cannot repeat: some service's last dispatch
/// is followed by more than one headway's worth of other dispatches.
pub fn cannot_be_cyclical(sequence: &[ServiceIdx], problem: &SchedulingProblem<'_>) -> bool {
    problem.service_indices().any(|service| match tail_after_last(sequence, service) {
        Some(tail) => minimum_time_spanned(tail, problem) > problem.headway(service),
        None => true,
    })
}
