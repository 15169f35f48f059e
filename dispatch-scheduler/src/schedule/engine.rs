//! Scheduling subgraphs of the network.
//!
//! Route patterns that share no stations cannot conflict, so the network is
//! split into independent subgraphs. Each subgraph is scheduled in both
//! directions for every constant-frequency window of a calendar service,
//! and the subgraphs of a network are solved in parallel on the blocking
//! thread pool.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::join_all;
use petgraph::unionfind::UnionFind;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::domain::{CalendarService, PatternId, Route, RoutePattern, Seconds, StationName, TimeRange};
use crate::graph::SchedulingGraph;
use crate::optimize::{AdmmSolver, OffsetOptimizer, OptimizedTimetable};
use crate::ordering::OrderingSearch;
use crate::problem::SchedulingProblem;

use super::cache::DepartureOffsetCache;
use super::dispatch::{Departure, Direction, DispatchTimes};
use super::error::ScheduleError;
use super::frequency::{FrequencyWindow, constant_frequency_windows};

/// Group routes into subgraphs of routes that transitively share a station.
///
/// Subgraphs are returned in order of their first route.
pub fn partition_routes(routes: &[Route]) -> Vec<Vec<Route>> {
    let mut sets = UnionFind::new(routes.len());
    let mut first_route: HashMap<&StationName, usize> = HashMap::new();

    for (i, route) in routes.iter().enumerate() {
        for station in route.patterns.iter().flat_map(|p| p.stations.iter()) {
            let owner = *first_route.entry(station.name()).or_insert(i);
            sets.union(owner, i);
        }
    }

    let mut groups: Vec<Vec<Route>> = Vec::new();
    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    for (i, route) in routes.iter().enumerate() {
        let root = sets.find(i);
        let group = *group_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[group].push(route.clone());
    }
    groups
}

/// Offsets for one window in both directions.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowOffsets {
    pub range: TimeRange,
    pub trips: BTreeMap<PatternId, u32>,
    pub outbound: Arc<OptimizedTimetable>,
    pub inbound: Arc<OptimizedTimetable>,
}

impl WindowOffsets {
    pub fn timetable(&self, direction: Direction) -> &OptimizedTimetable {
        match direction {
            Direction::Outbound => &self.outbound,
            Direction::Inbound => &self.inbound,
        }
    }

    pub fn offsets(&self, direction: Direction) -> &BTreeMap<PatternId, Seconds> {
        &self.timetable(direction).offsets
    }

    /// Every departure in the window: by direction, then pattern, then time.
    pub fn departures(&self, period: Seconds) -> impl Iterator<Item = Departure> + '_ {
        Direction::ALL.into_iter().flat_map(move |direction| {
            self.trips.iter().flat_map(move |(pattern, &trips)| {
                let offset = self.offsets(direction).get(pattern).copied().unwrap_or(0);
                DispatchTimes::for_trips(self.range, offset, trips, period).map(move |time| Departure {
                    pattern: pattern.clone(),
                    direction,
                    time,
                })
            })
        })
    }
}

/// The schedule of one subgraph for one calendar service.
#[derive(Debug, Clone, PartialEq)]
pub struct SubgraphTimetable {
    pub patterns: Vec<PatternId>,
    pub period: Seconds,
    pub windows: Vec<WindowOffsets>,
}

impl SubgraphTimetable {
    pub fn departures(&self) -> impl Iterator<Item = Departure> + '_ {
        self.windows.iter().flat_map(|w| w.departures(self.period))
    }
}

/// Schedules one subgraph, memoizing offsets per direction.
#[derive(Debug)]
pub struct SubgraphScheduler {
    patterns: Vec<RoutePattern>,
    config: SchedulerConfig,
    forward: SchedulingGraph,
    reverse: SchedulingGraph,
    forward_cache: DepartureOffsetCache,
    reverse_cache: DepartureOffsetCache,
    optimizer: OffsetOptimizer<AdmmSolver>,
}

impl SubgraphScheduler {
    pub fn new(patterns: Vec<RoutePattern>, config: SchedulerConfig) -> Result<Self, ScheduleError> {
        let forward = SchedulingGraph::build(&patterns, &config)?;
        let reverse = forward.reversed();
        let optimizer = OffsetOptimizer::new(AdmmSolver::new(config.solver.clone()));
        Ok(Self {
            forward_cache: DepartureOffsetCache::new(config.cache_capacity),
            reverse_cache: DepartureOffsetCache::new(config.cache_capacity),
            patterns,
            config,
            forward,
            reverse,
            optimizer,
        })
    }

    /// Build a scheduler for every pattern of `routes`.
    pub fn for_routes(routes: &[Route], config: SchedulerConfig) -> Result<Self, ScheduleError> {
        let patterns = routes.iter().flat_map(|r| r.patterns.iter().cloned()).collect();
        Self::new(patterns, config)
    }

    pub fn patterns(&self) -> &[RoutePattern] {
        &self.patterns
    }

    pub fn graph(&self, direction: Direction) -> &SchedulingGraph {
        match direction {
            Direction::Outbound => &self.forward,
            Direction::Inbound => &self.reverse,
        }
    }

    fn cache(&self, direction: Direction) -> &DepartureOffsetCache {
        match direction {
            Direction::Outbound => &self.forward_cache,
            Direction::Inbound => &self.reverse_cache,
        }
    }

    /// Departure offsets for a trips-per-hour combination.
    ///
    /// Results are cached per direction; failures are not.
    pub fn departure_offsets(
        &self,
        direction: Direction,
        trips: &BTreeMap<PatternId, u32>,
    ) -> Result<Arc<OptimizedTimetable>, ScheduleError> {
        self.cache(direction)
            .get_or_try_insert(trips, || self.solve(direction, trips))
    }

    fn solve(&self, direction: Direction, trips: &BTreeMap<PatternId, u32>) -> Result<OptimizedTimetable, ScheduleError> {
        let problem = SchedulingProblem::new(
            self.graph(direction),
            trips,
            self.config.period_secs,
            self.config.dispatch_spacing_secs,
        )?;
        let outcome = OrderingSearch::new(&problem, self.config.search_limits()).run();
        debug!(
            %direction,
            orderings = outcome.orderings.len(),
            truncated = outcome.truncated,
            "Searched orderings"
        );

        self.optimizer
            .optimize(&problem, &outcome.orderings)?
            .ok_or_else(|| {
                warn!(%direction, ?trips, "No feasible ordering");
                ScheduleError::NoFeasibleOrdering {
                    direction,
                    trips: problem.trips(),
                }
            })
    }

    /// Constant-frequency windows of this subgraph's patterns.
    pub fn windows(&self, calendar: &CalendarService) -> Vec<FrequencyWindow> {
        constant_frequency_windows(&self.patterns, calendar)
    }

    /// Offsets for every window and direction of a calendar service.
    pub fn schedule(&self, calendar: &CalendarService) -> Result<SubgraphTimetable, ScheduleError> {
        let windows = self
            .windows(calendar)
            .into_iter()
            .map(|window| {
                let outbound = self.departure_offsets(Direction::Outbound, &window.trips)?;
                let inbound = self.departure_offsets(Direction::Inbound, &window.trips)?;
                info!(
                    range = %window.range,
                    outbound = ?outbound.offsets,
                    inbound = ?inbound.offsets,
                    "Scheduled window"
                );
                Ok(WindowOffsets {
                    range: window.range,
                    trips: window.trips,
                    outbound,
                    inbound,
                })
            })
            .collect::<Result<Vec<_>, ScheduleError>>()?;

        Ok(SubgraphTimetable {
            patterns: self.patterns.iter().map(|p| p.id.clone()).collect(),
            period: self.config.period_secs,
            windows,
        })
    }

    /// Every departure of a calendar service.
    pub fn departures(&self, calendar: &CalendarService) -> Result<Vec<Departure>, ScheduleError> {
        Ok(self.schedule(calendar)?.departures().collect())
    }
}

/// Partition `routes` and schedule every subgraph in parallel.
///
/// Subgraph timetables are returned in partition order.
pub async fn schedule_subgraphs(
    routes: &[Route],
    calendar: &CalendarService,
    config: &SchedulerConfig,
) -> Result<Vec<SubgraphTimetable>, ScheduleError> {
    let subgraphs = partition_routes(routes);
    debug!(subgraphs = subgraphs.len(), %calendar, "Scheduling subgraphs");

    let tasks: Vec<_> = subgraphs
        .into_iter()
        .map(|subgraph| {
            let calendar = calendar.clone();
            let config = config.clone();
            tokio::task::spawn_blocking(move || {
                SubgraphScheduler::for_routes(&subgraph, config)?.schedule(&calendar)
            })
        })
        .collect();

    join_all(tasks)
        .await
        .into_iter()
        .map(|joined| {
            joined
                .map_err(|e| ScheduleError::Task(e.to_string()))
                .and_then(|result| result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Frequencies, Schedule};
    use crate::fixtures::{pattern, pid, shuttle_patterns, tph, xyz_patterns};

    fn weekday() -> CalendarService {
        CalendarService::new("weekday")
    }

    fn hourly(ranges: &[(&str, u32)]) -> Schedule {
        let frequencies = Frequencies::new(
            ranges
                .iter()
                .map(|(range, headway)| (TimeRange::parse(range).unwrap(), *headway)),
        )
        .unwrap();
        Schedule::new([(weekday(), frequencies)])
    }

    fn route(id: &str, patterns: Vec<RoutePattern>) -> Route {
        Route {
            id: id.to_string(),
            name: None,
            patterns,
        }
    }

    fn shuttle_route() -> Route {
        let patterns = shuttle_patterns()
            .into_iter()
            .map(|p| p.with_schedule(hourly(&[("6:00-7:00", 30)])))
            .collect();
        route("shuttle", patterns)
    }

    #[test]
    fn partitions_by_shared_station() {
        let routes = vec![
            route("r1", vec![pattern("p", &[("a", "0:00"), ("b", "0:05")])]),
            route("r2", vec![pattern("q", &[("x", "0:00"), ("y", "0:05")])]),
            route("r3", vec![pattern("r", &[("b", "0:00"), ("c", "0:05")])]),
            route("r4", vec![pattern("s", &[("c", "0:00"), ("d", "0:05")])]),
        ];
        let groups: Vec<Vec<String>> = partition_routes(&routes)
            .into_iter()
            .map(|g| g.into_iter().map(|r| r.id).collect())
            .collect();
        assert_eq!(groups, vec![vec!["r1", "r3", "r4"], vec!["r2"]]);
    }

    #[test]
    fn shuttle_offsets_both_directions() {
        let scheduler = SubgraphScheduler::new(shuttle_patterns(), SchedulerConfig::default()).unwrap();
        let trips = tph(&[("a", 2), ("b", 2)]);
        let expected = BTreeMap::from([(pid("a"), 0), (pid("b"), 900)]);

        for direction in Direction::ALL {
            let timetable = scheduler.departure_offsets(direction, &trips).unwrap();
            assert_eq!(timetable.offsets, expected, "{direction}");
        }
        assert!(scheduler.graph(Direction::Inbound).is_reversed());
    }

    #[test]
    fn offsets_are_cached() {
        let scheduler = SubgraphScheduler::new(shuttle_patterns(), SchedulerConfig::default()).unwrap();
        let trips = tph(&[("a", 2), ("b", 2)]);
        let first = scheduler.departure_offsets(Direction::Outbound, &trips).unwrap();
        let second = scheduler.departure_offsets(Direction::Outbound, &trips).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn empty_working_set() {
        let scheduler = SubgraphScheduler::new(shuttle_patterns(), SchedulerConfig::default()).unwrap();
        let timetable = scheduler
            .departure_offsets(Direction::Outbound, &tph(&[("a", 0)]))
            .unwrap();
        assert!(timetable.offsets.is_empty());
    }

    #[test]
    fn exclusion_too_long_for_the_period() {
        // Four arrivals an hour at each terminal cannot be 1000s apart.
        let config = SchedulerConfig::new(3600, 60, 1000);
        let scheduler = SubgraphScheduler::new(shuttle_patterns(), config).unwrap();
        for direction in Direction::ALL {
            let err = scheduler
                .departure_offsets(direction, &tph(&[("a", 2), ("b", 2)]))
                .unwrap_err();
            assert_eq!(
                err,
                ScheduleError::NoFeasibleOrdering {
                    direction,
                    trips: tph(&[("a", 2), ("b", 2)])
                }
            );
        }
        let err = scheduler
            .departure_offsets(Direction::Inbound, &tph(&[("a", 2), ("b", 2)]))
            .unwrap_err();
        assert_eq!(err.to_string(), "no feasible inbound ordering for a=2, b=2");
    }

    #[test]
    fn unknown_pattern_is_reported() {
        let scheduler = SubgraphScheduler::new(xyz_patterns(), SchedulerConfig::default()).unwrap();
        let err = scheduler
            .departure_offsets(Direction::Outbound, &tph(&[("w", 1)]))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Problem(_)), "{err}");
    }

    #[test]
    fn departures_for_calendar() {
        let scheduler = SubgraphScheduler::for_routes(&[shuttle_route()], SchedulerConfig::default()).unwrap();
        let departures = scheduler.departures(&weekday()).unwrap();

        // Two patterns, two trips an hour, two directions.
        assert_eq!(departures.len(), 8);
        let outbound_b: Vec<_> = departures
            .iter()
            .filter(|d| d.direction == Direction::Outbound && d.pattern == pid("b"))
            .map(|d| d.time.num_seconds())
            .collect();
        assert_eq!(outbound_b, vec![6 * 3600 + 900, 6 * 3600 + 2700]);

        assert!(scheduler.departures(&CalendarService::new("sunday")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn schedules_subgraphs_in_parallel() {
        let other = route(
            "branch",
            vec![pattern("c", &[("u", "0:00"), ("v", "0:07")]).with_schedule(hourly(&[("6:00-8:00", 20)]))],
        );
        let routes = vec![shuttle_route(), other];

        let timetables = schedule_subgraphs(&routes, &weekday(), &SchedulerConfig::default())
            .await
            .unwrap();

        assert_eq!(timetables.len(), 2);
        assert_eq!(timetables[0].patterns, vec![pid("a"), pid("b")]);
        assert_eq!(timetables[1].patterns, vec![pid("c")]);
        assert_eq!(timetables[1].windows[0].offsets(Direction::Inbound), &BTreeMap::from([(pid("c"), 0)]));
        assert_eq!(timetables[1].departures().count(), 2 * 6);
    }

    #[tokio::test]
    async fn subgraph_errors_propagate() {
        let broken = route("broken", vec![pattern("d", &[])]);
        let err = schedule_subgraphs(&[broken], &weekday(), &SchedulerConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Graph(_)), "{err}");
    }
}
