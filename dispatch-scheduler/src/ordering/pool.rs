//! Immutable search-state values: the remaining-dispatch pool and the
//! ordered arrival lists placed at each location.
//!
//! Both are cheap to clone and hash, so they can be shared between sibling
//! search states and used as memoization keys.

use std::sync::Arc;

use crate::problem::{SchedulingProblem, ServiceIdx};

use super::interval::Interval;

/// How many dispatches each working-set service still needs, indexed by
/// [`ServiceIdx`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchPool(Arc<[u32]>);

impl DispatchPool {
    /// A full pool: every service at its trips per period.
    pub fn for_problem(problem: &SchedulingProblem<'_>) -> Self {
        DispatchPool(problem.services().iter().map(|s| s.trips()).collect())
    }

    pub fn remaining(&self, service: ServiceIdx) -> u32 {
        self.0.get(service.0).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&n| n == 0)
    }

    /// Services with dispatches left, in index order (which is pattern id
    /// order), each paired with the pool after taking one of its dispatches.
    pub fn candidates(&self) -> impl Iterator<Item = (ServiceIdx, DispatchPool)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n > 0)
            .map(|(i, _)| (ServiceIdx(i), self.take(ServiceIdx(i))))
    }

    fn take(&self, service: ServiceIdx) -> DispatchPool {
        DispatchPool(
            self.0
                .iter()
                .enumerate()
                .map(|(i, &n)| if i == service.0 { n.saturating_sub(1) } else { n })
                .collect(),
        )
    }
}

/// A tentative arrival of one service's dispatch at one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arrival {
    pub service: ServiceIdx,
    pub window: Interval,
}

/// The temporally ordered arrivals placed at one location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArrivalList(Arc<[Arrival]>);

impl ArrivalList {
    pub fn empty() -> Self {
        ArrivalList(Arc::from(Vec::new()))
    }

    pub fn as_slice(&self) -> &[Arrival] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A new list with `arrival` inserted before `position`.
    pub fn with_inserted(&self, position: usize, arrival: Arrival) -> ArrivalList {
        let mut arrivals = Vec::with_capacity(self.0.len() + 1);
        arrivals.extend_from_slice(&self.0[..position]);
        arrivals.push(arrival);
        arrivals.extend_from_slice(&self.0[position..]);
        ArrivalList(arrivals.into())
    }

    /// The latest arrival of `service`.
    pub fn latest_for(&self, service: ServiceIdx) -> Option<&Arrival> {
        self.0.iter().rev().find(|a| a.service == service)
    }

    /// The latest arrival of any of `services`.
    pub fn latest_of(&self, services: &[ServiceIdx]) -> Option<&Arrival> {
        self.0.iter().rev().find(|a| services.contains(&a.service))
    }
}

impl Default for ArrivalList {
    fn default() -> Self {
        ArrivalList::empty()
    }
}
