//! Convex QP solving.
//!
//! [`AdmmSolver`] is an operator-splitting (ADMM) method on dense matrices
//! with over-relaxation, adaptive step size, infeasibility detection and a
//! final polishing step that re-solves the KKT system on the active
//! constraints. It is meant for the small programs the offset model
//! produces: one variable per service and a few constraints per arrival.

use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use tracing::trace;

use super::program::QuadraticProgram;

/// Result of solving a quadratic program.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Optimal {
        x: DVector<f64>,
        objective: f64,
        iterations: usize,
        polished: bool,
    },
    /// The constraints admit no solution.
    Infeasible,
    /// The objective decreases without bound over the feasible set.
    Unbounded,
    /// No convergence within the iteration ceiling.
    IterationLimit,
}

impl SolveOutcome {
    /// The objective value, or +∞ for anything but an optimal solve.
    pub fn objective(&self) -> f64 {
        match self {
            SolveOutcome::Optimal { objective, .. } => *objective,
            _ => f64::INFINITY,
        }
    }
}

/// A solver for convex quadratic programs.
pub trait ConvexSolver {
    fn solve(&self, program: &QuadraticProgram) -> SolveOutcome;
}

/// Configuration for [`AdmmSolver`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Iteration ceiling.
    pub max_iterations: usize,

    /// Absolute convergence tolerance.
    pub eps_abs: f64,

    /// Relative convergence tolerance.
    pub eps_rel: f64,

    /// Tolerance for primal and dual infeasibility certificates.
    pub eps_infeasible: f64,

    /// Initial ADMM step size.
    pub rho: f64,

    /// Regularization on the variable update.
    pub sigma: f64,

    /// Over-relaxation factor, in (0, 2).
    pub alpha: f64,

    /// Iterations between step-size updates.
    pub adaptive_rho_interval: usize,

    /// Whether to refine converged solutions on the active constraints.
    pub polish: bool,
}

impl SolverConfig {
    pub fn new(max_iterations: usize, eps_abs: f64, eps_rel: f64, polish: bool) -> Self {
        Self {
            max_iterations,
            eps_abs,
            eps_rel,
            polish,
            ..Self::default()
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20_000,
            eps_abs: 1e-5,
            eps_rel: 1e-5,
            eps_infeasible: 1e-6,
            rho: 0.1,
            sigma: 1e-6,
            alpha: 1.6,
            adaptive_rho_interval: 25,
            polish: true,
        }
    }
}

const RHO_MIN: f64 = 1e-6;
const RHO_MAX: f64 = 1e6;
const RHO_EQUALITY_SCALE: f64 = 1e3;
const RHO_ADAPT_THRESHOLD: f64 = 5.0;
const POLISH_DELTA: f64 = 1e-9;
const POLISH_ACTIVE: f64 = 1e-7;
const POLISH_FEASIBILITY: f64 = 1e-6;

/// ADMM solver for convex QPs.
#[derive(Debug, Clone, Default)]
pub struct AdmmSolver {
    config: SolverConfig,
}

fn inf_norm(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
}

impl AdmmSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Per-row step sizes: equality rows are stiffer, free rows nearly slack.
    fn step_sizes(&self, rho: f64, lower: &DVector<f64>, upper: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            lower.len(),
            lower.iter().zip(upper.iter()).map(|(&l, &u)| {
                if l == u {
                    rho * RHO_EQUALITY_SCALE
                } else if l == f64::NEG_INFINITY && u == f64::INFINITY {
                    RHO_MIN
                } else {
                    rho
                }
            }),
        )
    }

    /// `P + σI + Aᵀ diag(ρ) A`, which is positive definite for σ > 0.
    fn reduced_kkt(&self, p: &DMatrix<f64>, a: &DMatrix<f64>, steps: &DVector<f64>) -> DMatrix<f64> {
        let n = p.nrows();
        let mut scaled = a.clone();
        for (mut row, &step) in scaled.row_iter_mut().zip(steps.iter()) {
            row *= step;
        }
        p + DMatrix::identity(n, n) * self.config.sigma + a.transpose() * scaled
    }

    fn is_primal_infeasible(
        &self,
        delta_y: &DVector<f64>,
        at: &DMatrix<f64>,
        lower: &DVector<f64>,
        upper: &DVector<f64>,
    ) -> bool {
        let eps = self.config.eps_infeasible;
        let norm = inf_norm(delta_y);
        if norm <= eps {
            return false;
        }
        if inf_norm(&(at * delta_y)) > eps * norm {
            return false;
        }
        let mut support = 0.0;
        for ((&dy, &l), &u) in delta_y.iter().zip(lower.iter()).zip(upper.iter()) {
            if dy > 0.0 {
                support += u * dy;
            } else if dy < 0.0 {
                support += l * dy;
            }
        }
        // An infinite bound on the side δy points to makes this +∞.
        support < -eps * norm
    }

    fn is_dual_infeasible(
        &self,
        delta_x: &DVector<f64>,
        p: &DMatrix<f64>,
        q: &DVector<f64>,
        a: &DMatrix<f64>,
        lower: &DVector<f64>,
        upper: &DVector<f64>,
    ) -> bool {
        let eps = self.config.eps_infeasible;
        let norm = inf_norm(delta_x);
        if norm <= eps {
            return false;
        }
        let tol = eps * norm;
        if inf_norm(&(p * delta_x)) > tol || q.dot(delta_x) > -tol {
            return false;
        }
        let adx = a * delta_x;
        adx.iter()
            .zip(lower.iter().zip(upper.iter()))
            .all(|(&v, (&l, &u))| {
                let above = u == f64::INFINITY || v <= tol;
                let below = l == f64::NEG_INFINITY || v >= -tol;
                above && below
            })
    }

    /// Re-solve the equality-constrained problem on the active set.
    fn polish(
        &self,
        program: &QuadraticProgram,
        a: &DMatrix<f64>,
        lower: &DVector<f64>,
        upper: &DVector<f64>,
        y: &DVector<f64>,
    ) -> Option<DVector<f64>> {
        let n = program.num_variables();
        let mut active: Vec<(usize, f64)> = Vec::new();
        for (r, &dual) in y.iter().enumerate() {
            if lower[r] == upper[r] || dual < -POLISH_ACTIVE {
                active.push((r, lower[r]));
            }
        }
        for (r, &dual) in y.iter().enumerate() {
            if lower[r] != upper[r] && dual > POLISH_ACTIVE {
                active.push((r, upper[r]));
            }
        }

        let k = active.len();
        let mut kkt = DMatrix::<f64>::zeros(n + k, n + k);
        kkt.view_mut((0, 0), (n, n)).copy_from(program.p());
        for i in 0..n {
            kkt[(i, i)] += POLISH_DELTA;
        }
        let mut rhs = DVector::<f64>::zeros(n + k);
        for i in 0..n {
            rhs[i] = -program.q()[i];
        }
        for (j, &(r, bound)) in active.iter().enumerate() {
            for i in 0..n {
                kkt[(i, n + j)] = a[(r, i)];
                kkt[(n + j, i)] = a[(r, i)];
            }
            kkt[(n + j, n + j)] = -POLISH_DELTA;
            rhs[n + j] = bound;
        }

        let solution = kkt.lu().solve(&rhs)?;
        let x = solution.rows(0, n).into_owned();
        program
            .is_feasible(&x, POLISH_FEASIBILITY)
            .then_some(x)
    }
}

impl ConvexSolver for AdmmSolver {
    fn solve(&self, program: &QuadraticProgram) -> SolveOutcome {
        let config = &self.config;
        let n = program.num_variables();
        let m = program.num_constraints();

        if n == 0 {
            return SolveOutcome::Optimal {
                x: DVector::<f64>::zeros(0),
                objective: program.constant(),
                iterations: 0,
                polished: false,
            };
        }

        let p = program.p();
        let q = program.q();
        let a = program.constraint_matrix();
        let at = a.transpose();
        let lower = program.lower_bounds();
        let upper = program.upper_bounds();

        let mut x = DVector::<f64>::zeros(n);
        let mut z = DVector::<f64>::zeros(m);
        let mut y = DVector::<f64>::zeros(m);
        let mut rho = config.rho;
        let mut steps = self.step_sizes(rho, &lower, &upper);
        let Some(mut factor) = self.reduced_kkt(p, &a, &steps).cholesky() else {
            return SolveOutcome::IterationLimit;
        };

        for iteration in 1..=config.max_iterations {
            let rhs = &x * config.sigma - q + &at * (steps.component_mul(&z) - &y);
            let x_tilde = factor.solve(&rhs);
            let z_tilde = &a * &x_tilde;

            let x_next = &x_tilde * config.alpha + &x * (1.0 - config.alpha);
            let z_relaxed = &z_tilde * config.alpha + &z * (1.0 - config.alpha);
            let mut z_next = &z_relaxed + y.component_div(&steps);
            for ((v, &l), &u) in z_next.iter_mut().zip(lower.iter()).zip(upper.iter()) {
                *v = v.max(l).min(u);
            }
            let y_next = &y + steps.component_mul(&(&z_relaxed - &z_next));

            let delta_x = &x_next - &x;
            let delta_y = &y_next - &y;
            x = x_next;
            z = z_next;
            y = y_next;

            let ax = &a * &x;
            let px = p * &x;
            let aty = &at * &y;
            let primal_residual = inf_norm(&(&ax - &z));
            let dual_residual = inf_norm(&(&px + q + &aty));
            let primal_scale = inf_norm(&ax).max(inf_norm(&z));
            let dual_scale = inf_norm(&px).max(inf_norm(&aty)).max(inf_norm(q));

            if primal_residual <= config.eps_abs + config.eps_rel * primal_scale
                && dual_residual <= config.eps_abs + config.eps_rel * dual_scale
            {
                if config.polish {
                    if let Some(polished) = self.polish(program, &a, &lower, &upper, &y) {
                        return SolveOutcome::Optimal {
                            objective: program.objective(&polished),
                            x: polished,
                            iterations: iteration,
                            polished: true,
                        };
                    }
                    trace!(iteration, "Polishing failed; keeping ADMM solution");
                }
                return SolveOutcome::Optimal {
                    objective: program.objective(&x),
                    x,
                    iterations: iteration,
                    polished: false,
                };
            }

            if self.is_primal_infeasible(&delta_y, &at, &lower, &upper) {
                trace!(iteration, "Primal infeasibility certificate found");
                return SolveOutcome::Infeasible;
            }
            if self.is_dual_infeasible(&delta_x, p, q, &a, &lower, &upper) {
                trace!(iteration, "Dual infeasibility certificate found");
                return SolveOutcome::Unbounded;
            }

            if config.adaptive_rho_interval > 0 && iteration % config.adaptive_rho_interval == 0 {
                let primal_ratio = primal_residual / primal_scale.max(1e-12);
                let dual_ratio = dual_residual / dual_scale.max(1e-12);
                let proposed = (rho * (primal_ratio / dual_ratio.max(1e-12)).sqrt()).clamp(RHO_MIN, RHO_MAX);
                if proposed > rho * RHO_ADAPT_THRESHOLD || proposed < rho / RHO_ADAPT_THRESHOLD {
                    rho = proposed;
                    steps = self.step_sizes(rho, &lower, &upper);
                    match self.reduced_kkt(p, &a, &steps).cholesky() {
                        Some(refactored) => factor = refactored,
                        None => return SolveOutcome::IterationLimit,
                    }
                }
            }
        }

        SolveOutcome::IterationLimit
    }
}
