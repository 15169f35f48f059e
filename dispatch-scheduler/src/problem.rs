//! Scheduling problems: one constant-frequency window over a graph.
//!
//! A [`SchedulingProblem`] fixes the working set of services (those with a
//! nonzero trips-per-hour), their headways and the period, and answers the
//! lookups the ordering search and optimizer need. Every service's travel
//! times are resolved up front so the search itself never fails on a lookup.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::domain::{PatternId, Seconds};
use crate::graph::{GraphError, Location, LocationId, SchedulingGraph};

/// Position of a service in a problem's working set.
///
/// Working sets are sorted by pattern id, so comparing indices compares ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceIdx(pub usize);

/// Errors formulating a scheduling problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProblemError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("period must be positive, got {0}s")]
    InvalidPeriod(Seconds),

    /// More trips than whole seconds in the period
    #[error("{tph} trips per period of {period}s leaves pattern {pattern} no headway")]
    NoHeadway {
        pattern: PatternId,
        tph: u32,
        period: Seconds,
    },
}

/// One working-set service with everything resolved.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    id: PatternId,
    trips: u32,
    headway: Seconds,
    /// Key locations in calling order, each with its travel time from the
    /// dispatch location.
    calls: Vec<(LocationId, Seconds)>,
}

impl ServiceSpec {
    pub fn id(&self) -> &PatternId {
        &self.id
    }

    /// Trips per period.
    pub fn trips(&self) -> u32 {
        self.trips
    }

    pub fn headway(&self) -> Seconds {
        self.headway
    }

    pub fn calls(&self) -> &[(LocationId, Seconds)] {
        &self.calls
    }

    pub fn dispatch_location(&self) -> &LocationId {
        &self.calls[0].0
    }

    /// Travel time from the dispatch location to `location`, if called at.
    pub fn travel_time_to(&self, location: &str) -> Option<Seconds> {
        self.calls
            .iter()
            .find(|(id, _)| id.as_str() == location)
            .map(|(_, secs)| *secs)
    }
}

/// A scheduling problem for one combination of trips per period.
pub struct SchedulingProblem<'g> {
    graph: &'g SchedulingGraph,
    services: Vec<ServiceSpec>,
    period: Seconds,
    dispatch_spacing: Seconds,
    dispatching: BTreeMap<LocationId, Vec<ServiceIdx>>,
    passing: BTreeMap<LocationId, Vec<ServiceIdx>>,
}

impl<'g> SchedulingProblem<'g> {
    /// Formulate a problem over `graph`.
    ///
    /// `trips` maps patterns to trips per period. Patterns with zero trips
    /// are excluded; patterns missing from `trips` are not scheduled.
    pub fn new(
        graph: &'g SchedulingGraph,
        trips: &BTreeMap<PatternId, u32>,
        period: Seconds,
        dispatch_spacing: Seconds,
    ) -> Result<Self, ProblemError> {
        if period <= 0 {
            return Err(ProblemError::InvalidPeriod(period));
        }

        let mut services = Vec::with_capacity(trips.len());
        for (id, &tph) in trips {
            let service = graph.service(id)?;
            if tph == 0 {
                continue;
            }
            let headway = period / tph as Seconds;
            if headway == 0 {
                return Err(ProblemError::NoHeadway {
                    pattern: id.clone(),
                    tph,
                    period,
                });
            }
            let calls = service
                .calls()
                .iter()
                .map(|loc| Ok((loc.clone(), service.travel_time_from_dispatch(loc.as_str())?)))
                .collect::<Result<Vec<_>, GraphError>>()?;
            services.push(ServiceSpec {
                id: id.clone(),
                trips: tph,
                headway,
                calls,
            });
        }

        let mut dispatching: BTreeMap<LocationId, Vec<ServiceIdx>> = BTreeMap::new();
        let mut passing: BTreeMap<LocationId, Vec<ServiceIdx>> = BTreeMap::new();
        for (i, service) in services.iter().enumerate() {
            dispatching
                .entry(service.dispatch_location().clone())
                .or_default()
                .push(ServiceIdx(i));
            for (loc, _) in &service.calls {
                passing.entry(loc.clone()).or_default().push(ServiceIdx(i));
            }
        }

        let problem = Self {
            graph,
            services,
            period,
            dispatch_spacing,
            dispatching,
            passing,
        };

        debug!(
            services = problem.services.len(),
            total_dispatches = problem.total_dispatches(),
            reversed = graph.is_reversed(),
            "Formulated scheduling problem"
        );

        Ok(problem)
    }

    pub fn graph(&self) -> &'g SchedulingGraph {
        self.graph
    }

    pub fn period(&self) -> Seconds {
        self.period
    }

    pub fn dispatch_spacing(&self) -> Seconds {
        self.dispatch_spacing
    }

    /// Working-set services in pattern id order.
    pub fn services(&self) -> &[ServiceSpec] {
        &self.services
    }

    pub fn service(&self, idx: ServiceIdx) -> &ServiceSpec {
        &self.services[idx.0]
    }

    pub fn service_indices(&self) -> impl Iterator<Item = ServiceIdx> + '_ {
        (0..self.services.len()).map(ServiceIdx)
    }

    pub fn index_of(&self, id: &PatternId) -> Option<ServiceIdx> {
        self.services
            .binary_search_by(|s| s.id.cmp(id))
            .ok()
            .map(ServiceIdx)
    }

    pub fn headway(&self, idx: ServiceIdx) -> Seconds {
        self.services[idx.0].headway
    }

    /// Total dispatches per period across the working set.
    pub fn total_dispatches(&self) -> usize {
        self.services.iter().map(|s| s.trips as usize).sum()
    }

    /// Travel time from `pattern`'s dispatch location to `location`.
    pub fn travel_time(&self, pattern: &PatternId, location: &str) -> Result<Seconds, GraphError> {
        self.graph.service(pattern)?.travel_time_from_dispatch(location)
    }

    pub fn is_dispatch_location(&self, idx: ServiceIdx, location: &str) -> bool {
        self.service(idx).dispatch_location().as_str() == location
    }

    /// Working-set services dispatched from `location`.
    pub fn dispatching_from(&self, location: &str) -> &[ServiceIdx] {
        self.dispatching
            .get(location)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Working-set services calling at `location`, dispatch point included.
    pub fn passing_through(&self, location: &str) -> &[ServiceIdx] {
        self.passing.get(location).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Locations called at by at least one working-set service.
    pub fn locations(&self) -> impl Iterator<Item = &LocationId> {
        self.passing.keys()
    }

    pub fn location(&self, id: &str) -> Result<&'g Location, GraphError> {
        self.graph.location(id)
    }

    /// Exclusion time at `location`; unknown locations get none.
    pub fn exclusion_time(&self, location: &str) -> Seconds {
        self.graph
            .location(location)
            .map(Location::exclusion_secs)
            .unwrap_or(0)
    }

    /// Trips per period keyed by pattern, for the working set.
    pub fn trips(&self) -> BTreeMap<PatternId, u32> {
        self.services
            .iter()
            .map(|s| (s.id.clone(), s.trips))
            .collect()
    }
}

impl fmt::Debug for SchedulingProblem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulingProblem")
            .field("services", &self.trips())
            .field("period", &self.period)
            .field("dispatch_spacing", &self.dispatch_spacing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::fixtures::{pid, tph, xyz_patterns};

    fn graph() -> SchedulingGraph {
        SchedulingGraph::build(&xyz_patterns(), &SchedulerConfig::default()).unwrap()
    }

    #[test]
    fn headways_and_totals() {
        let graph = graph();
        let problem = SchedulingProblem::new(&graph, &tph(&[("x", 2), ("y", 4), ("z", 7)]), 3600, 60).unwrap();

        assert_eq!(problem.total_dispatches(), 13);
        assert_eq!(problem.headway(ServiceIdx(0)), 1800);
        assert_eq!(problem.headway(ServiceIdx(1)), 900);
        // Integer division truncates.
        assert_eq!(problem.headway(ServiceIdx(2)), 514);
    }

    #[test]
    fn zero_trips_are_excluded() {
        let graph = graph();
        let problem = SchedulingProblem::new(&graph, &tph(&[("x", 2), ("y", 0), ("z", 1)]), 3600, 60).unwrap();

        let ids: Vec<_> = problem.services().iter().map(|s| s.id().as_str()).collect();
        assert_eq!(ids, vec!["x", "z"]);
        assert_eq!(problem.index_of(&pid("z")), Some(ServiceIdx(1)));
        assert_eq!(problem.index_of(&pid("y")), None);
        assert_eq!(problem.total_dispatches(), 3);
        assert!(problem.passing_through("h").is_empty());
    }

    #[test]
    fn unknown_pattern_is_an_error() {
        let graph = graph();
        let err = SchedulingProblem::new(&graph, &tph(&[("w", 2)]), 3600, 60).unwrap_err();
        assert_eq!(err, ProblemError::Graph(GraphError::UnknownPattern(pid("w"))));
    }

    #[test]
    fn too_many_trips() {
        let graph = graph();
        let err = SchedulingProblem::new(&graph, &tph(&[("x", 20)]), 10, 1).unwrap_err();
        assert!(matches!(err, ProblemError::NoHeadway { tph: 20, .. }));
        assert!(SchedulingProblem::new(&graph, &tph(&[("x", 1)]), 0, 1).is_err());
    }

    #[test]
    fn location_lookups() {
        let graph = graph();
        let problem = SchedulingProblem::new(&graph, &tph(&[("x", 2), ("y", 2), ("z", 2)]), 3600, 60).unwrap();
        let (x, y, z) = (ServiceIdx(0), ServiceIdx(1), ServiceIdx(2));

        assert_eq!(problem.dispatching_from("a"), &[x, z]);
        assert_eq!(problem.dispatching_from("c"), &[y]);
        assert!(problem.dispatching_from("d").is_empty());
        assert_eq!(problem.passing_through("d"), &[x, y, z]);
        assert_eq!(problem.passing_through("g"), &[y, z]);

        assert!(problem.is_dispatch_location(y, "c"));
        assert!(!problem.is_dispatch_location(x, "c"));

        assert_eq!(problem.service(z).travel_time_to("g"), Some(1140));
        assert_eq!(problem.service(z).travel_time_to("c"), None);
        assert_eq!(problem.travel_time(&pid("y"), "h").unwrap(), 780);
        assert!(matches!(
            problem.travel_time(&pid("y"), "a"),
            Err(GraphError::MissingTravelTime { .. })
        ));

        let locations: String = problem.locations().map(|l| l.as_str()).collect();
        assert_eq!(locations, "acdfghi");
        assert_eq!(problem.exclusion_time("d"), 60);
    }
}
