//! Depth-first enumeration of dispatch orderings.
//!
//! A search state holds the dispatch sequence so far, the dispatches left to
//! make, and every alternative placement of the arrivals made so far. Each
//! step appends one dispatch and places its arrival at every location the
//! service calls at, in calling order, keeping only placements where every
//! location still has room for it between its neighbours.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::domain::{PatternId, Seconds};
use crate::graph::LocationId;
use crate::problem::{SchedulingProblem, ServiceIdx};

use super::dominance::DominanceGraph;
use super::interval::Interval;
use super::pool::{Arrival, ArrivalList, DispatchPool};
use super::sequence::{cannot_be_cyclical, dispatch_is_too_late};

/// Ceilings on one ordering search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// States expanded before the search gives up.
    pub max_states: usize,

    /// Orderings collected before the search stops.
    pub max_orderings: usize,

    /// Whether candidates are also checked against the dominance graph.
    pub dominance_pruning: bool,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_states: 2_000_000,
            max_orderings: 100_000,
            dominance_pruning: false,
        }
    }
}

/// One arrival in a finished ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedArrival {
    pub service: ServiceIdx,
    /// Zero-based count of this service's earlier arrivals at the location.
    pub repetition: u32,
    /// Where the search placed the arrival.
    pub window: Interval,
}

/// A complete, repeatable dispatch ordering with the order of arrivals at
/// every location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    sequence: Vec<ServiceIdx>,
    dispatch_order: Vec<ServiceIdx>,
    arrivals: BTreeMap<LocationId, Vec<OrderedArrival>>,
}

impl Ordering {
    fn from_search(sequence: &[ServiceIdx], placed: &ArrivalMap) -> Self {
        let mut dispatch_order = Vec::new();
        for &service in sequence {
            if !dispatch_order.contains(&service) {
                dispatch_order.push(service);
            }
        }

        let arrivals = placed
            .iter()
            .map(|(location, list)| {
                let mut seen: HashMap<ServiceIdx, u32> = HashMap::new();
                let ordered = list
                    .as_slice()
                    .iter()
                    .map(|arrival| {
                        let count = seen.entry(arrival.service).or_insert(0);
                        let repetition = *count;
                        *count += 1;
                        OrderedArrival {
                            service: arrival.service,
                            repetition,
                            window: arrival.window,
                        }
                    })
                    .collect();
                (location.clone(), ordered)
            })
            .collect();

        Self {
            sequence: sequence.to_vec(),
            dispatch_order,
            arrivals,
        }
    }

    /// Every dispatch in the period, in order.
    pub fn sequence(&self) -> &[ServiceIdx] {
        &self.sequence
    }

    /// Services in order of their first dispatch.
    pub fn dispatch_order(&self) -> &[ServiceIdx] {
        &self.dispatch_order
    }

    /// Pattern ids in order of first dispatch.
    pub fn dispatch_order_ids(&self, problem: &SchedulingProblem<'_>) -> Vec<PatternId> {
        self.dispatch_order
            .iter()
            .map(|&s| problem.service(s).id().clone())
            .collect()
    }

    /// Arrivals at each location in temporal order.
    pub fn arrivals(&self) -> &BTreeMap<LocationId, Vec<OrderedArrival>> {
        &self.arrivals
    }
}

/// Everything one search produced.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub orderings: Vec<Ordering>,
    pub states_explored: usize,
    /// True if a ceiling stopped the search early.
    pub truncated: bool,
}

type ArrivalMap = BTreeMap<LocationId, ArrivalList>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InsertionKey {
    service: ServiceIdx,
    location: LocationId,
    placed: ArrivalList,
}

/// One way of inserting an arrival into a location's list.
#[derive(Debug)]
struct Insertion {
    window: Interval,
    arrivals: ArrivalList,
}

struct SearchState {
    sequence: Vec<ServiceIdx>,
    arrival_maps: Vec<ArrivalMap>,
    pool: DispatchPool,
}

/// Enumerates orderings for one scheduling problem.
///
/// Insertion results are memoized for the lifetime of the search; a search
/// is consumed by [`OrderingSearch::run`].
pub struct OrderingSearch<'p, 'g> {
    problem: &'p SchedulingProblem<'g>,
    limits: SearchLimits,
    dominance: Option<DominanceGraph>,
    memo: HashMap<InsertionKey, Rc<[Insertion]>>,
    states_explored: usize,
    truncated: bool,
}

impl<'p, 'g> OrderingSearch<'p, 'g> {
    pub fn new(problem: &'p SchedulingProblem<'g>, limits: SearchLimits) -> Self {
        let dominance = limits
            .dominance_pruning
            .then(|| DominanceGraph::build(problem));
        Self {
            problem,
            limits,
            dominance,
            memo: HashMap::new(),
            states_explored: 0,
            truncated: false,
        }
    }

    pub fn run(mut self) -> SearchOutcome {
        let root = SearchState {
            sequence: Vec::with_capacity(self.problem.total_dispatches()),
            arrival_maps: vec![ArrivalMap::new()],
            pool: DispatchPool::for_problem(self.problem),
        };
        let mut orderings = Vec::new();
        self.explore(root, &mut orderings);

        debug!(
            orderings = orderings.len(),
            states_explored = self.states_explored,
            memoized = self.memo.len(),
            "Ordering search finished"
        );
        if self.truncated {
            warn!(
                orderings = orderings.len(),
                states_explored = self.states_explored,
                max_states = self.limits.max_states,
                max_orderings = self.limits.max_orderings,
                "Ordering search hit a ceiling; results are incomplete"
            );
        }

        SearchOutcome {
            orderings,
            states_explored: self.states_explored,
            truncated: self.truncated,
        }
    }

    fn explore(&mut self, state: SearchState, out: &mut Vec<Ordering>) {
        if self.truncated {
            return;
        }
        self.states_explored += 1;
        if self.states_explored > self.limits.max_states {
            self.truncated = true;
            return;
        }

        let problem = self.problem;
        if state.sequence.len() == problem.total_dispatches() {
            if cannot_be_cyclical(&state.sequence, problem) {
                trace!(sequence = ?state.sequence, "Rejected non-cyclical sequence");
                return;
            }
            for placed in &state.arrival_maps {
                if out.len() >= self.limits.max_orderings {
                    self.truncated = true;
                    return;
                }
                out.push(Ordering::from_search(&state.sequence, placed));
            }
            return;
        }

        for (service, pool) in state.pool.candidates() {
            if self.truncated {
                return;
            }
            let id = problem.service(service).id();
            if dispatch_is_too_late(&state.sequence, service, problem) {
                trace!(service = %id, depth = state.sequence.len(), "Pruned late dispatch");
                continue;
            }
            if !self.dominance_accepts(&state.sequence, service) {
                trace!(service = %id, depth = state.sequence.len(), "Pruned by dominance");
                continue;
            }
            let arrival_maps = self.place_dispatch(&state.arrival_maps, service);
            if arrival_maps.is_empty() {
                trace!(service = %id, depth = state.sequence.len(), "No room for arrivals");
                continue;
            }

            let mut sequence = state.sequence.clone();
            sequence.push(service);
            self.explore(
                SearchState {
                    sequence,
                    arrival_maps,
                    pool,
                },
                out,
            );
        }
    }

    fn dominance_accepts(&self, sequence: &[ServiceIdx], service: ServiceIdx) -> bool {
        let Some(dominance) = &self.dominance else {
            return true;
        };
        let problem = self.problem;
        dominance.accepts(|signature| !signature.rejects(sequence, service, problem))
    }

    /// Every way of placing `service`'s next arrivals into each of `maps`.
    fn place_dispatch(&mut self, maps: &[ArrivalMap], service: ServiceIdx) -> Vec<ArrivalMap> {
        let problem = self.problem;
        let calls = problem.service(service).calls();
        let mut placed = Vec::new();
        let mut chosen = Vec::with_capacity(calls.len());
        for base in maps {
            self.place_calls(service, calls, base, None, &mut chosen, &mut placed);
        }
        placed
    }

    /// Place arrivals at the remaining `calls`, each constrained by the
    /// window chosen at the previous call shifted by the travel time between
    /// them.
    fn place_calls(
        &mut self,
        service: ServiceIdx,
        calls: &[(LocationId, Seconds)],
        base: &ArrivalMap,
        previous: Option<(Seconds, Interval)>,
        chosen: &mut Vec<(LocationId, ArrivalList)>,
        out: &mut Vec<ArrivalMap>,
    ) {
        let Some(((location, travel), rest)) = calls.split_first() else {
            let mut map = base.clone();
            for (location, arrivals) in chosen.iter() {
                map.insert(location.clone(), arrivals.clone());
            }
            out.push(map);
            return;
        };

        let placed = base.get(location).cloned().unwrap_or_default();
        let insertions = self.insertions(service, location, *travel, placed);
        let constraint = previous.map(|(prev_travel, window)| window.offset(travel - prev_travel));

        for insertion in insertions.iter() {
            let window = match constraint {
                Some(c) => match c.intersection(&insertion.window) {
                    Some(window) => window,
                    None => continue,
                },
                None => insertion.window,
            };
            chosen.push((location.clone(), insertion.arrivals.clone()));
            self.place_calls(service, rest, base, Some((*travel, window)), chosen, out);
            chosen.pop();
        }
    }

    fn insertions(
        &mut self,
        service: ServiceIdx,
        location: &LocationId,
        travel: Seconds,
        placed: ArrivalList,
    ) -> Rc<[Insertion]> {
        let key = InsertionKey {
            service,
            location: location.clone(),
            placed,
        };
        if let Some(hit) = self.memo.get(&key) {
            return Rc::clone(hit);
        }
        let computed: Rc<[Insertion]> = self
            .compute_insertions(service, location, travel, &key.placed)
            .into();
        self.memo.insert(key, Rc::clone(&computed));
        computed
    }

    /// Insert `service` at every position in `placed` where it fits.
    fn compute_insertions(
        &self,
        service: ServiceIdx,
        location: &LocationId,
        travel: Seconds,
        placed: &ArrivalList,
    ) -> Vec<Insertion> {
        let Some(feasible) = self.feasible_window(service, location, travel, placed) else {
            return Vec::new();
        };
        let exclusion = self.problem.exclusion_time(location.as_str());
        let arrivals = placed.as_slice();

        (0..=arrivals.len())
            .filter_map(|position| {
                let below = match position {
                    0 => 0,
                    _ => arrivals[position - 1].window.lower() + exclusion,
                };
                let above = arrivals.get(position).map(|a| a.window.lower() - exclusion);
                let window = Interval::new(below, above).intersection(&feasible)?;
                Some(Insertion {
                    window,
                    arrivals: placed.with_inserted(position, Arrival { service, window }),
                })
            })
            .collect()
    }

    /// Where `service`'s next arrival at `location` may fall, before
    /// considering the other arrivals there.
    fn feasible_window(
        &self,
        service: ServiceIdx,
        location: &LocationId,
        travel: Seconds,
        placed: &ArrivalList,
    ) -> Option<Interval> {
        let problem = self.problem;
        let headway = problem.headway(service);
        let own = placed.latest_for(service);

        let window = match own {
            Some(previous) => previous.window.offset(headway),
            None => Interval::bounded(travel, travel + headway),
        };

        if !problem.is_dispatch_location(service, location.as_str()) {
            return Some(window);
        }
        let Some(latest) = placed.latest_of(problem.dispatching_from(location.as_str())) else {
            return Some(window);
        };
        let earliest = latest.window.lower() + problem.dispatch_spacing();
        if own.is_some_and(|previous| earliest - previous.window.lower() > headway) {
            return None;
        }
        window.bounded_below(earliest)
    }
}
