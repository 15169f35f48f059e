//! The departure-offset model for one ordering.
//!
//! One variable per working-set service, in dispatch order. The first
//! service departs at offset zero and every other service somewhere within
//! its headway, no earlier than the service dispatched before it. At every
//! location the arrivals keep the order the search placed them in, at least
//! the exclusion time apart, including across the period boundary. The
//! objective pulls each location's gaps towards an even spread.

use std::collections::HashMap;

use tracing::trace;

use crate::domain::Seconds;
use crate::graph::{GraphError, LocationId};
use crate::ordering::{OrderedArrival, Ordering};
use crate::problem::{SchedulingProblem, ServiceIdx};

use super::program::{LinearExpr, QuadraticProgram};

/// A quadratic program together with the services its variables stand for.
#[derive(Debug, Clone)]
pub struct OffsetModel {
    program: QuadraticProgram,
    variables: Vec<ServiceIdx>,
}

impl OffsetModel {
    /// Build the model for `ordering`.
    pub fn build(problem: &SchedulingProblem<'_>, ordering: &Ordering) -> Result<Self, GraphError> {
        let variables = ordering.dispatch_order().to_vec();
        let index: HashMap<ServiceIdx, usize> =
            variables.iter().enumerate().map(|(i, &s)| (s, i)).collect();
        let mut program = QuadraticProgram::new(variables.len());

        for (i, &service) in variables.iter().enumerate() {
            let upper = if i == 0 { 0.0 } else { (problem.headway(service) - 1) as f64 };
            program.add_constraint(&LinearExpr::var(i), 0.0, upper);
        }
        for i in 1..variables.len() {
            program.add_at_least(&(&LinearExpr::var(i) - &LinearExpr::var(i - 1)), 0.0);
        }

        let period = problem.period();
        for (location, arrivals) in ordering.arrivals() {
            if arrivals.is_empty() {
                continue;
            }
            let exclusion = problem.exclusion_time(location.as_str()) as f64;
            let times = arrivals
                .iter()
                .map(|arrival| arrival_time(problem, &index, location, arrival))
                .collect::<Result<Vec<_>, _>>()?;

            for pair in times.windows(2) {
                program.add_at_least(&(&pair[1] - &pair[0]), exclusion);
            }
            let wrap = &(times[0].clone() + period as f64) - &times[times.len() - 1];
            if times.len() >= 2 {
                program.add_at_least(&wrap, exclusion);
            }

            let n = times.len() as Seconds;
            let weight = 1.0 / n as f64;
            let ideal = (period / n) as f64;
            for pair in times.windows(2) {
                program.add_square(weight, &(&pair[1] - &pair[0] - ideal));
            }
            program.add_square(weight, &(wrap - ideal));
        }

        trace!(
            variables = program.num_variables(),
            constraints = program.num_constraints(),
            "Built offset model"
        );
        Ok(Self { program, variables })
    }

    pub fn program(&self) -> &QuadraticProgram {
        &self.program
    }

    /// Services in variable order, which is dispatch order.
    pub fn variables(&self) -> &[ServiceIdx] {
        &self.variables
    }
}

/// `offset + repetition·headway + travel` for one arrival.
fn arrival_time(
    problem: &SchedulingProblem<'_>,
    index: &HashMap<ServiceIdx, usize>,
    location: &LocationId,
    arrival: &OrderedArrival,
) -> Result<LinearExpr, GraphError> {
    let spec = problem.service(arrival.service);
    let travel = spec
        .travel_time_to(location.as_str())
        .ok_or_else(|| GraphError::MissingTravelTime {
            pattern: spec.id().clone(),
            station: location.clone(),
        })?;
    let var = index
        .get(&arrival.service)
        .copied()
        .ok_or_else(|| GraphError::UnknownPattern(spec.id().clone()))?;
    let shift = arrival.repetition as Seconds * spec.headway() + travel;
    Ok(LinearExpr::var(var) + shift as f64)
}
