//! Ordering search: which service dispatches when, and in what order trains
//! pass each key location.
//!
//! The search is combinatorial and exhaustive up to configurable ceilings.
//! Its output is a list of [`Ordering`]s, each of which the optimizer turns
//! into concrete departure offsets.

pub mod dominance;
pub mod interval;
pub mod pool;
pub mod search;
pub mod sequence;

pub use dominance::{DominanceGraph, Signature};
pub use interval::Interval;
pub use pool::{Arrival, ArrivalList, DispatchPool};
pub use search::{OrderedArrival, Ordering, OrderingSearch, SearchLimits, SearchOutcome};
pub use sequence::{cannot_be_cyclical, dispatch_is_too_late, minimum_time_spanned};
