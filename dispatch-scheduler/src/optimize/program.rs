//! Convex quadratic programs in the form
//!
//! ```text
//! minimize    ½ xᵀPx + qᵀx + c
//! subject to  l ≤ Ax ≤ u
//! ```
//!
//! built up from linear expressions over the decision variables.

use std::ops::{Add, Sub};

use nalgebra::{DMatrix, DVector};

/// `Σ coefficient·x[i] + constant` over a program's variables.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(usize, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// The variable `x[index]`.
    pub fn var(index: usize) -> Self {
        Self {
            terms: vec![(index, 1.0)],
            constant: 0.0,
        }
    }

    /// Dense coefficient vector of length `n`, summing repeated variables.
    fn coefficients(&self, n: usize) -> DVector<f64> {
        let mut dense = DVector::zeros(n);
        for &(i, c) in &self.terms {
            dense[i] += c;
        }
        dense
    }

    fn max_variable(&self) -> Option<usize> {
        self.terms.iter().map(|&(i, _)| i).max()
    }

    pub fn evaluate(&self, x: &DVector<f64>) -> f64 {
        self.terms.iter().map(|&(i, c)| c * x[i]).sum::<f64>() + self.constant
    }
}

impl Add<&LinearExpr> for &LinearExpr {
    type Output = LinearExpr;

    fn add(self, rhs: &LinearExpr) -> LinearExpr {
        let mut terms = self.terms.clone();
        terms.extend_from_slice(&rhs.terms);
        LinearExpr {
            terms,
            constant: self.constant + rhs.constant,
        }
    }
}

impl Sub<&LinearExpr> for &LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: &LinearExpr) -> LinearExpr {
        let mut terms = self.terms.clone();
        terms.extend(rhs.terms.iter().map(|&(i, c)| (i, -c)));
        LinearExpr {
            terms,
            constant: self.constant - rhs.constant,
        }
    }
}

impl Add<f64> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: f64) -> LinearExpr {
        self.constant += rhs;
        self
    }
}

impl Sub<f64> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: f64) -> LinearExpr {
        self.constant -= rhs;
        self
    }
}

/// One constraint row `lower ≤ aᵀx ≤ upper`. Either bound may be infinite.
#[derive(Debug, Clone, PartialEq)]
struct Row {
    coefficients: DVector<f64>,
    lower: f64,
    upper: f64,
}

/// A quadratic program under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticProgram {
    p: DMatrix<f64>,
    q: DVector<f64>,
    constant: f64,
    rows: Vec<Row>,
}

impl QuadraticProgram {
    /// An empty program over `n` variables.
    pub fn new(n: usize) -> Self {
        Self {
            p: DMatrix::zeros(n, n),
            q: DVector::zeros(n),
            constant: 0.0,
            rows: Vec::new(),
        }
    }

    pub fn num_variables(&self) -> usize {
        self.q.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.rows.len()
    }

    /// Add `weight · expr²` to the objective.
    pub fn add_square(&mut self, weight: f64, expr: &LinearExpr) {
        debug_assert!(expr.max_variable().is_none_or(|i| i < self.num_variables()));
        let c = expr.coefficients(self.num_variables());
        let d = expr.constant;
        self.p += (&c * c.transpose()) * (2.0 * weight);
        self.q += &c * (2.0 * weight * d);
        self.constant += weight * d * d;
    }

    /// Constrain `lower ≤ expr ≤ upper`.
    pub fn add_constraint(&mut self, expr: &LinearExpr, lower: f64, upper: f64) {
        debug_assert!(expr.max_variable().is_none_or(|i| i < self.num_variables()));
        self.rows.push(Row {
            coefficients: expr.coefficients(self.num_variables()),
            lower: lower - expr.constant,
            upper: upper - expr.constant,
        });
    }

    /// Constrain `expr ≥ lower`.
    pub fn add_at_least(&mut self, expr: &LinearExpr, lower: f64) {
        self.add_constraint(expr, lower, f64::INFINITY);
    }

    pub fn p(&self) -> &DMatrix<f64> {
        &self.p
    }

    pub fn q(&self) -> &DVector<f64> {
        &self.q
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// The constraint matrix `A`, one row per constraint.
    pub fn constraint_matrix(&self) -> DMatrix<f64> {
        let n = self.num_variables();
        DMatrix::from_fn(self.rows.len(), n, |r, c| self.rows[r].coefficients[c])
    }

    pub fn lower_bounds(&self) -> DVector<f64> {
        DVector::from_iterator(self.rows.len(), self.rows.iter().map(|r| r.lower))
    }

    pub fn upper_bounds(&self) -> DVector<f64> {
        DVector::from_iterator(self.rows.len(), self.rows.iter().map(|r| r.upper))
    }

    /// Objective value at `x`.
    pub fn objective(&self, x: &DVector<f64>) -> f64 {
        0.5 * (x.transpose() * &self.p * x)[(0, 0)] + self.q.dot(x) + self.constant
    }

    /// True if every constraint holds at `x` within `tolerance`.
    pub fn is_feasible(&self, x: &DVector<f64>, tolerance: f64) -> bool {
        self.rows.iter().all(|row| {
            let value = row.coefficients.dot(x);
            value >= row.lower - tolerance && value <= row.upper + tolerance
        })
    }
}
