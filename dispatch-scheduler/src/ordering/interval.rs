//! Half-open time intervals with an optional upper bound.

use std::fmt;

use crate::domain::Seconds;

/// The half-open interval `[lower, upper)`, where a missing upper bound is
/// unbounded. Intervals produced by [`Interval::intersection`] are never
/// empty; [`Interval::new`] accepts any bounds.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    lower: Seconds,
    upper: Option<Seconds>,
}

impl Interval {
    pub fn new(lower: Seconds, upper: Option<Seconds>) -> Self {
        Self { lower, upper }
    }

    /// `[lower, upper)`.
    pub fn bounded(lower: Seconds, upper: Seconds) -> Self {
        Self::new(lower, Some(upper))
    }

    /// `[lower, ∞)`.
    pub fn from(lower: Seconds) -> Self {
        Self::new(lower, None)
    }

    pub fn lower(&self) -> Seconds {
        self.lower
    }

    pub fn upper(&self) -> Option<Seconds> {
        self.upper
    }

    /// True if the bounds cross or touch.
    pub fn is_empty(&self) -> bool {
        self.upper.is_some_and(|upper| self.lower >= upper)
    }

    pub fn contains(&self, t: Seconds) -> bool {
        self.lower <= t && self.upper.is_none_or(|upper| t < upper)
    }

    /// The overlap of two intervals, or `None` if it is empty.
    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        let upper = match (self.upper, other.upper) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let result = Interval::new(self.lower.max(other.lower), upper);
        (!result.is_empty()).then_some(result)
    }

    /// Both bounds shifted by `by`.
    pub fn offset(&self, by: Seconds) -> Interval {
        Interval::new(self.lower + by, self.upper.map(|upper| upper + by))
    }

    /// The part of this interval at or after `bound`.
    pub fn bounded_below(&self, bound: Seconds) -> Option<Interval> {
        self.intersection(&Interval::from(bound))
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interval{}", self)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upper {
            Some(upper) => write!(f, "[{}, {})", self.lower, upper),
            None => write!(f, "[{}, inf)", self.lower),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        fn interval()(lower in -1000i64..1000, len in 1i64..500, unbounded in any::<bool>()) -> Interval {
            if unbounded { Interval::from(lower) } else { Interval::bounded(lower, lower + len) }
        }
    }

    proptest! {
        /// Intersection is commutative
        #[test]
        fn intersection_commutes(a in interval(), b in interval()) {
            prop_assert_eq!(a.intersection(&b), b.intersection(&a));
        }

        /// A point lies in the intersection iff it lies in both operands
        #[test]
        fn intersection_membership(a in interval(), b in interval(), t in -1500i64..2000) {
            let both = a.contains(t) && b.contains(t);
            let inside = a.intersection(&b).is_some_and(|i| i.contains(t));
            prop_assert_eq!(both, inside);
        }

        /// Offsetting preserves membership of shifted points
        #[test]
        fn offset_shifts_membership(a in interval(), by in -500i64..500, t in -1500i64..2000) {
            prop_assert_eq!(a.contains(t), a.offset(by).contains(t + by));
        }
    }
}
