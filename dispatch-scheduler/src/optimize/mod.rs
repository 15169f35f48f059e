//! Departure-offset optimization.
//!
//! Each [`Ordering`](crate::ordering::Ordering) becomes a small convex
//! quadratic program over the services' departure offsets. The program is
//! solved per ordering and the lowest objective wins.

pub mod model;
pub mod program;
pub mod select;
pub mod solver;

pub use model::OffsetModel;
pub use program::{LinearExpr, QuadraticProgram};
pub use select::{OffsetOptimizer, OptimizedTimetable};
pub use solver::{AdmmSolver, ConvexSolver, SolveOutcome, SolverConfig};
