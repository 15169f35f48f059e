//! Scoring orderings and choosing the best timetable.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::domain::{PatternId, Seconds};
use crate::graph::{GraphError, LocationId};
use crate::ordering::Ordering;
use crate::problem::SchedulingProblem;

use super::model::OffsetModel;
use super::solver::{AdmmSolver, ConvexSolver, SolveOutcome};

/// Relative slack within which a later ordering does not replace the best.
const TIE_TOLERANCE: f64 = 1e-6;

/// The winning timetable for one problem.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedTimetable {
    /// Departure offset of each working-set pattern, in whole seconds.
    pub offsets: BTreeMap<PatternId, Seconds>,
    /// Objective of the winning ordering.
    pub objective: f64,
    /// Patterns in order of first dispatch.
    pub dispatch_order: Vec<PatternId>,
    /// Arrival instants at each location within one period, in the order
    /// the ordering fixed.
    pub arrivals: BTreeMap<LocationId, Vec<Seconds>>,
}

/// Scores orderings with a [`ConvexSolver`] and keeps the best.
#[derive(Debug, Clone, Default)]
pub struct OffsetOptimizer<S = AdmmSolver> {
    solver: S,
}

impl<S: ConvexSolver> OffsetOptimizer<S> {
    pub fn new(solver: S) -> Self {
        Self { solver }
    }

    /// Solve the model for one ordering.
    pub fn score(
        &self,
        problem: &SchedulingProblem<'_>,
        ordering: &Ordering,
    ) -> Result<(OffsetModel, SolveOutcome), GraphError> {
        let model = OffsetModel::build(problem, ordering)?;
        let outcome = self.solver.solve(model.program());
        Ok((model, outcome))
    }

    /// The best timetable over `orderings`, or `None` if no ordering has a
    /// finite objective.
    ///
    /// Later orderings only win if they are better by more than a small
    /// relative tolerance, so ties keep the earlier ordering.
    pub fn optimize(
        &self,
        problem: &SchedulingProblem<'_>,
        orderings: &[Ordering],
    ) -> Result<Option<OptimizedTimetable>, GraphError> {
        let mut best: Option<(f64, usize, Vec<Seconds>)> = None;

        for (i, ordering) in orderings.iter().enumerate() {
            let (_, outcome) = self.score(problem, ordering)?;
            let (x, objective, iterations) = match outcome {
                SolveOutcome::Optimal { x, objective, iterations, .. } => (x, objective, iterations),
                other => {
                    trace!(ordering = i, outcome = ?other, "Ordering has no optimal offsets");
                    continue;
                }
            };
            trace!(ordering = i, objective, iterations, "Scored ordering");

            let improves = match &best {
                None => true,
                Some((value, _, _)) => objective < value - TIE_TOLERANCE * value.abs().max(1.0),
            };
            if improves {
                let offsets = x.iter().map(|v| v.round() as Seconds).collect();
                best = Some((objective, i, offsets));
            }
        }

        let Some((objective, index, offsets)) = best else {
            debug!(orderings = orderings.len(), "No ordering has a finite objective");
            return Ok(None);
        };
        debug!(orderings = orderings.len(), winner = index, objective, "Selected ordering");
        Ok(Some(materialize(problem, &orderings[index], &offsets, objective)))
    }
}

fn materialize(
    problem: &SchedulingProblem<'_>,
    ordering: &Ordering,
    offsets: &[Seconds],
    objective: f64,
) -> OptimizedTimetable {
    let by_service: BTreeMap<_, _> = ordering
        .dispatch_order()
        .iter()
        .copied()
        .zip(offsets.iter().copied())
        .collect();

    let arrivals = ordering
        .arrivals()
        .iter()
        .map(|(location, list)| {
            let times = list
                .iter()
                .map(|arrival| {
                    let spec = problem.service(arrival.service);
                    let offset = by_service.get(&arrival.service).copied().unwrap_or(0);
                    let travel = spec.travel_time_to(location.as_str()).unwrap_or(0);
                    offset + arrival.repetition as Seconds * spec.headway() + travel
                })
                .collect();
            (location.clone(), times)
        })
        .collect();

    OptimizedTimetable {
        offsets: by_service
            .iter()
            .map(|(&s, &offset)| (problem.service(s).id().clone(), offset))
            .collect(),
        objective,
        dispatch_order: ordering.dispatch_order_ids(problem),
        arrivals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::fixtures::{pid, shuttle_patterns, tph, xyz_patterns};
    use crate::graph::SchedulingGraph;
    use crate::ordering::{OrderingSearch, SearchLimits};

    fn solve(graph: &SchedulingGraph, trips: &BTreeMap<PatternId, u32>) -> Option<OptimizedTimetable> {
        let problem = SchedulingProblem::new(graph, trips, 3600, 60).unwrap();
        let outcome = OrderingSearch::new(&problem, SearchLimits::default()).run();
        OffsetOptimizer::<AdmmSolver>::default()
            .optimize(&problem, &outcome.orderings)
            .unwrap()
    }

    fn assert_separated(graph: &SchedulingGraph, timetable: &OptimizedTimetable) {
        for (location, times) in &timetable.arrivals {
            let exclusion = graph.location(location.as_str()).unwrap().exclusion_secs();
            for pair in times.windows(2) {
                assert!(pair[1] - pair[0] >= exclusion - 1, "{location}: {times:?}");
            }
            if times.len() >= 2 {
                let wrap = times[0] + 3600 - times[times.len() - 1];
                assert!(wrap >= exclusion - 1, "{location} wraps: {times:?}");
            }
        }
    }

    #[test]
    fn shuttle_spreads_evenly() {
        let graph = SchedulingGraph::build(&shuttle_patterns(), &SchedulerConfig::default()).unwrap();
        let timetable = solve(&graph, &tph(&[("a", 2), ("b", 2)])).unwrap();

        assert_eq!(timetable.offsets, BTreeMap::from([(pid("a"), 0), (pid("b"), 900)]));
        assert_eq!(timetable.dispatch_order, vec![pid("a"), pid("b")]);
        assert!(timetable.objective.abs() < 1e-3);
        assert_eq!(timetable.arrivals["s"], vec![0, 900, 1800, 2700]);
        assert_eq!(timetable.arrivals["t"], vec![600, 1500, 2400, 3300]);
    }

    #[test]
    fn xyz_best_ordering() {
        let graph = SchedulingGraph::build(&xyz_patterns(), &SchedulerConfig::default()).unwrap();
        let timetable = solve(&graph, &tph(&[("x", 2), ("y", 2), ("z", 2)])).unwrap();

        assert!((timetable.objective - 291_600.0).abs() < 1.0, "{}", timetable.objective);
        assert_eq!(
            timetable.offsets,
            BTreeMap::from([(pid("x"), 0), (pid("y"), 1680), (pid("z"), 570)])
        );
        assert_eq!(timetable.dispatch_order, vec![pid("x"), pid("z"), pid("y")]);
        assert_separated(&graph, &timetable);
    }

    #[test]
    fn dominance_pruning_keeps_the_best_timetable() {
        let graph = SchedulingGraph::build(&xyz_patterns(), &SchedulerConfig::default()).unwrap();
        for trips in [tph(&[("x", 2), ("y", 2), ("z", 2)]), tph(&[("x", 4), ("y", 4), ("z", 2)])] {
            let problem = SchedulingProblem::new(&graph, &trips, 3600, 60).unwrap();
            let pruning = SearchLimits {
                dominance_pruning: true,
                ..SearchLimits::default()
            };
            let orderings = OrderingSearch::new(&problem, pruning).run().orderings;
            let pruned = OffsetOptimizer::<AdmmSolver>::default()
                .optimize(&problem, &orderings)
                .unwrap();

            assert_eq!(pruned, solve(&graph, &trips), "{trips:?}");
        }
    }

    #[test]
    fn single_service_is_pinned_at_zero() {
        let graph = SchedulingGraph::build(&xyz_patterns(), &SchedulerConfig::default()).unwrap();
        let timetable = solve(&graph, &tph(&[("y", 3)])).unwrap();

        assert_eq!(timetable.offsets, BTreeMap::from([(pid("y"), 0)]));
        assert_eq!(timetable.arrivals["c"], vec![0, 1200, 2400]);
        assert_separated(&graph, &timetable);
    }

    #[test]
    fn no_orderings_means_no_timetable() {
        let graph = SchedulingGraph::build(&shuttle_patterns(), &SchedulerConfig::default()).unwrap();
        let problem = SchedulingProblem::new(&graph, &tph(&[("a", 2), ("b", 2)]), 3600, 60).unwrap();
        let optimizer = OffsetOptimizer::new(AdmmSolver::default());
        assert_eq!(optimizer.optimize(&problem, &[]).unwrap(), None);
    }

    #[test]
    fn failed_solves_are_skipped() {
        struct Refuses;
        impl ConvexSolver for Refuses {
            fn solve(&self, _: &crate::optimize::QuadraticProgram) -> SolveOutcome {
                SolveOutcome::Infeasible
            }
        }

        let graph = SchedulingGraph::build(&shuttle_patterns(), &SchedulerConfig::default()).unwrap();
        let problem = SchedulingProblem::new(&graph, &tph(&[("a", 2), ("b", 2)]), 3600, 60).unwrap();
        let outcome = OrderingSearch::new(&problem, SearchLimits::default()).run();
        let optimizer = OffsetOptimizer::new(Refuses);
        assert_eq!(optimizer.optimize(&problem, &outcome.orderings).unwrap(), None);
    }
}
