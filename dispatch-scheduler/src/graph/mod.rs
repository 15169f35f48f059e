//! The scheduling graph: key locations, the pattern services calling at
//! them, and the track edges joining consecutive key locations.
//!
//! Route patterns are projected onto the key locations chosen by
//! [`keys::key_stations`]. Pass-through stations disappear and their travel
//! times are absorbed into the offsets of the surrounding key locations.
//! Locations and edges are shared between every pattern that uses them.

mod error;
pub mod keys;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::Direction as EdgeDirection;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::domain::{PatternId, RoutePattern, Seconds, StationName};

pub use error::GraphError;

/// Identity of a location in the graph: the station's canonical name.
pub type LocationId = StationName;

/// A shared physical point (terminus or junction) retained in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    id: LocationId,
    exclusion_secs: Seconds,
}

impl Location {
    pub fn new(id: LocationId, exclusion_secs: Seconds) -> Self {
        Self { id, exclusion_secs }
    }

    pub fn id(&self) -> &LocationId {
        &self.id
    }

    /// Smallest allowed gap between any two arrivals here.
    pub fn exclusion_secs(&self) -> Seconds {
        self.exclusion_secs
    }
}

/// The scheduling projection of one route pattern.
///
/// Invariant: `calls` is non-empty and every call has an entry in `offsets`.
/// The first call of the forward projection has offset zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternService {
    id: PatternId,
    calls: Vec<LocationId>,
    offsets: BTreeMap<LocationId, Seconds>,
}

impl PatternService {
    pub fn id(&self) -> &PatternId {
        &self.id
    }

    /// Key locations in calling order.
    pub fn calls(&self) -> &[LocationId] {
        &self.calls
    }

    /// The location this service is dispatched from.
    pub fn dispatch_location(&self) -> &LocationId {
        // `calls` is never empty; see the invariant above.
        &self.calls[0]
    }

    pub fn calls_at(&self, location: &str) -> bool {
        self.offsets.contains_key(location)
    }

    /// Travel time between two locations this service calls at.
    pub fn travel_time(&self, from: &str, to: &str) -> Result<Seconds, GraphError> {
        Ok((self.offset(to)? - self.offset(from)?).abs())
    }

    /// Travel time from the dispatch location to `location`.
    pub fn travel_time_from_dispatch(&self, location: &str) -> Result<Seconds, GraphError> {
        self.travel_time(self.dispatch_location().as_str(), location)
    }

    fn offset(&self, location: &str) -> Result<Seconds, GraphError> {
        self.offsets
            .get(location)
            .copied()
            .ok_or_else(|| match StationName::new(location) {
                Ok(station) => GraphError::MissingTravelTime {
                    pattern: self.id.clone(),
                    station,
                },
                Err(_) => GraphError::UnknownLocation(location.to_string()),
            })
    }

    fn reversed(&self) -> Self {
        Self {
            id: self.id.clone(),
            calls: self.calls.iter().rev().cloned().collect(),
            offsets: self.offsets.clone(),
        }
    }
}

/// Locations, pattern services and the directed edges between consecutive
/// key locations of each pattern.
#[derive(Debug, Clone)]
pub struct SchedulingGraph {
    locations: BTreeMap<LocationId, Location>,
    services: BTreeMap<PatternId, PatternService>,
    topology: DiGraph<LocationId, ()>,
    nodes: HashMap<LocationId, NodeIndex>,
    reversed: bool,
}

impl SchedulingGraph {
    /// Build the graph for a set of route patterns.
    ///
    /// Fails fast on the first malformed pattern: an empty or duplicated
    /// station list, a missing travel time, a repeated pattern id, or a
    /// pattern left with no key locations.
    pub fn build(patterns: &[RoutePattern], config: &SchedulerConfig) -> Result<Self, GraphError> {
        let mut seen = HashSet::with_capacity(patterns.len());
        let mut station_lists = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            if !seen.insert(&pattern.id) {
                return Err(GraphError::DuplicatePattern(pattern.id.clone()));
            }
            let stations = pattern.station_names()?;
            if let Some(missing) = stations
                .iter()
                .find(|s| !pattern.travel_times.contains(s.as_str()))
            {
                return Err(GraphError::MissingTravelTime {
                    pattern: pattern.id.clone(),
                    station: missing.clone(),
                });
            }
            station_lists.push(stations);
        }

        let keys = keys::key_stations(&station_lists);

        let mut graph = SchedulingGraph {
            locations: BTreeMap::new(),
            services: BTreeMap::new(),
            topology: DiGraph::new(),
            nodes: HashMap::new(),
            reversed: false,
        };

        for (pattern, stations) in patterns.iter().zip(&station_lists) {
            let calls: Vec<LocationId> = stations
                .iter()
                .filter(|s| keys.contains(*s))
                .cloned()
                .collect();
            let Some(first) = calls.first() else {
                return Err(GraphError::NoKeyLocations(pattern.id.clone()));
            };

            let base = pattern.travel_times.offset(first.as_str()).unwrap_or(0);
            let offsets = calls
                .iter()
                .map(|call| {
                    let offset = pattern.travel_times.offset(call.as_str()).unwrap_or(base);
                    (call.clone(), offset - base)
                })
                .collect();

            for call in &calls {
                graph.add_location(call, config.exclusion_for(call.as_str()));
            }
            for pair in calls.windows(2) {
                let (from, to) = (graph.nodes[&pair[0]], graph.nodes[&pair[1]]);
                graph.topology.update_edge(from, to, ());
            }

            graph.services.insert(
                pattern.id.clone(),
                PatternService {
                    id: pattern.id.clone(),
                    calls,
                    offsets,
                },
            );
        }

        debug!(
            patterns = patterns.len(),
            locations = graph.locations.len(),
            edges = graph.topology.edge_count(),
            "Built scheduling graph"
        );

        Ok(graph)
    }

    fn add_location(&mut self, id: &LocationId, exclusion_secs: Seconds) {
        if self.locations.contains_key(id) {
            return;
        }
        self.locations
            .insert(id.clone(), Location::new(id.clone(), exclusion_secs));
        let node = self.topology.add_node(id.clone());
        self.nodes.insert(id.clone(), node);
    }

    /// The same graph with every edge flipped and every service's calling
    /// order reversed. Travel tables are unchanged.
    pub fn reversed(&self) -> Self {
        let mut topology = self.topology.clone();
        topology.reverse();
        Self {
            locations: self.locations.clone(),
            services: self
                .services
                .iter()
                .map(|(id, service)| (id.clone(), service.reversed()))
                .collect(),
            topology,
            nodes: self.nodes.clone(),
            reversed: !self.reversed,
        }
    }

    /// Returns true for the view produced by [`SchedulingGraph::reversed`].
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn location(&self, id: &str) -> Result<&Location, GraphError> {
        self.locations
            .get(id)
            .ok_or_else(|| GraphError::UnknownLocation(id.to_string()))
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    pub fn service(&self, id: &PatternId) -> Result<&PatternService, GraphError> {
        self.services
            .get(id)
            .ok_or_else(|| GraphError::UnknownPattern(id.clone()))
    }

    /// Pattern services in id order.
    pub fn services(&self) -> impl Iterator<Item = &PatternService> {
        self.services.values()
    }

    /// Travel time for one service between two of its locations.
    pub fn travel_time(&self, pattern: &PatternId, from: &str, to: &str) -> Result<Seconds, GraphError> {
        self.service(pattern)?.travel_time(from, to)
    }

    /// Locations reachable from `id` along one edge.
    pub fn successors(&self, id: &str) -> Result<BTreeSet<LocationId>, GraphError> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| GraphError::UnknownLocation(id.to_string()))?;
        Ok(self
            .topology
            .neighbors_directed(*node, EdgeDirection::Outgoing)
            .map(|n| self.topology[n].clone())
            .collect())
    }

    /// Every edge as a `(from, to)` pair.
    pub fn edges(&self) -> BTreeSet<(LocationId, LocationId)> {
        self.topology
            .edge_indices()
            .filter_map(|e| self.topology.edge_endpoints(e))
            .map(|(a, b)| (self.topology[a].clone(), self.topology[b].clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{name, pattern, xyz_patterns};
    use proptest::prelude::*;

    fn build(patterns: &[RoutePattern]) -> SchedulingGraph {
        SchedulingGraph::build(patterns, &SchedulerConfig::default()).unwrap()
    }

    fn ids(locations: impl IntoIterator<Item = LocationId>) -> String {
        locations.into_iter().map(|l| l.as_str().to_string()).collect()
    }

    #[test]
    fn key_locations_of_xyz() {
        let graph = build(&xyz_patterns());
        assert_eq!(ids(graph.locations().map(|l| l.id().clone())), "acdfghi");
    }

    #[test]
    fn successors_of_xyz() {
        let graph = build(&xyz_patterns());
        assert_eq!(ids(graph.successors("a").unwrap()), "cd");
        assert_eq!(ids(graph.successors("g").unwrap()), "hi");
        assert!(graph.successors("h").unwrap().is_empty());
        assert!(graph.successors("b").is_err());
    }

    #[test]
    fn services_call_at_key_locations_only() {
        let graph = build(&xyz_patterns());
        let x = graph.service(&PatternId::new("x").unwrap()).unwrap();
        assert_eq!(ids(x.calls().iter().cloned()), "acdf");
        assert_eq!(x.dispatch_location().as_str(), "a");
        assert!(!x.calls_at("b"));
        assert_eq!(x.travel_time_from_dispatch("f").unwrap(), 1200);
        assert_eq!(x.travel_time("d", "c").unwrap(), 180);
    }

    #[test]
    fn travel_time_query() {
        let graph = build(&xyz_patterns());
        let z = PatternId::new("z").unwrap();
        assert_eq!(graph.travel_time(&z, "d", "i").unwrap(), 1080);
        assert!(matches!(
            graph.travel_time(&z, "a", "c"),
            Err(GraphError::MissingTravelTime { .. })
        ));
        assert!(matches!(
            graph.travel_time(&PatternId::new("w").unwrap(), "a", "d"),
            Err(GraphError::UnknownPattern(_))
        ));
    }

    #[test]
    fn offsets_are_relative_to_first_call() {
        // Travel table starting at 0:05 is rebased onto the first station.
        let p = pattern("p", &[("a", "0:05"), ("b", "0:09")]);
        let graph = build(&[p]);
        let service = graph.service(&PatternId::new("p").unwrap()).unwrap();
        assert_eq!(service.travel_time_from_dispatch("a").unwrap(), 0);
        assert_eq!(service.travel_time_from_dispatch("b").unwrap(), 240);
    }

    #[test]
    fn exclusion_from_config() {
        let mut config = SchedulerConfig::default();
        config.exclusion_overrides.insert(name("d"), 120);
        let graph = SchedulingGraph::build(&xyz_patterns(), &config).unwrap();
        assert_eq!(graph.location("d").unwrap().exclusion_secs(), 120);
        assert_eq!(graph.location("a").unwrap().exclusion_secs(), 60);
    }

    #[test]
    fn reversed_view() {
        let graph = build(&xyz_patterns());
        let reversed = graph.reversed();
        assert!(reversed.is_reversed());
        assert_eq!(ids(reversed.successors("d").unwrap()), "ac");
        assert!(reversed.successors("a").unwrap().is_empty());

        let y = reversed.service(&PatternId::new("y").unwrap()).unwrap();
        assert_eq!(ids(y.calls().iter().cloned()), "hgfdc");
        assert_eq!(y.dispatch_location().as_str(), "h");
        assert_eq!(y.travel_time_from_dispatch("c").unwrap(), 780);

        let round_trip = reversed.reversed();
        assert!(!round_trip.is_reversed());
        assert_eq!(round_trip.edges(), graph.edges());
    }

    #[test]
    fn duplicate_pattern_id() {
        let p = pattern("p", &[("a", "0:00"), ("b", "0:05")]);
        let err = SchedulingGraph::build(&[p.clone(), p], &SchedulerConfig::default()).unwrap_err();
        assert!(matches!(err, GraphError::DuplicatePattern(_)));
    }

    #[test]
    fn missing_travel_time() {
        let mut p = pattern("p", &[("a", "0:00"), ("b", "0:05")]);
        p.travel_times = crate::domain::TravelTimes::from_seconds([(name("a"), 0)]);
        let err = SchedulingGraph::build(&[p], &SchedulerConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "pattern p has no travel time for b");
    }

    #[test]
    fn empty_pattern() {
        let p = pattern("p", &[]);
        let err = SchedulingGraph::build(&[p], &SchedulerConfig::default()).unwrap_err();
        assert!(matches!(err, GraphError::Domain(_)));
    }

    #[test]
    fn repeated_station() {
        let p = pattern("p", &[("a", "0:00"), ("b", "0:05"), ("a", "0:10")]);
        let err = SchedulingGraph::build(&[p], &SchedulerConfig::default()).unwrap_err();
        assert!(matches!(err, GraphError::Domain(_)));
    }

    proptest! {
        /// Building from any permutation of the patterns gives the same graph
        #[test]
        fn build_is_order_independent(patterns in Just(xyz_patterns()).prop_shuffle()) {
            let reference = build(&xyz_patterns());
            let shuffled = build(&patterns);

            let locations = |g: &SchedulingGraph| g.locations().cloned().collect::<Vec<_>>();
            prop_assert_eq!(locations(&shuffled), locations(&reference));
            prop_assert_eq!(shuffled.edges(), reference.edges());
            let services = |g: &SchedulingGraph| g.services().cloned().collect::<Vec<_>>();
            prop_assert_eq!(services(&shuffled), services(&reference));
        }
    }
}
