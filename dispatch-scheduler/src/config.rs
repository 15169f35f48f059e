//! Scheduler configuration.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::Deserialize;

use crate::domain::{Seconds, StationName};
use crate::optimize::SolverConfig;
use crate::ordering::SearchLimits;

/// Configuration parameters for timetable synthesis.
///
/// Every field has a default, so a scenario file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Length of the repeating timetable period (seconds).
    pub period_secs: Seconds,

    /// Minimum gap between two dispatches from the same location (seconds).
    pub dispatch_spacing_secs: Seconds,

    /// Minimum gap between two arrivals at any location (seconds).
    pub default_exclusion_secs: Seconds,

    /// Per-station exclusion times overriding the default (seconds).
    pub exclusion_overrides: BTreeMap<StationName, Seconds>,

    /// Maximum number of search states expanded per ordering search.
    /// The search stops and reports truncation past this.
    pub max_search_states: usize,

    /// Maximum number of orderings collected per ordering search.
    pub max_orderings: usize,

    /// Whether to prune candidate dispatches against the dominance graph.
    pub dominance_pruning: bool,

    /// Maximum number of cached offset solutions per graph.
    pub cache_capacity: u64,

    pub solver: SolverConfig,
}

impl SchedulerConfig {
    /// Create a new configuration with the given core parameters and
    /// defaults for everything else.
    pub fn new(
        period_secs: Seconds,
        dispatch_spacing_secs: Seconds,
        default_exclusion_secs: Seconds,
    ) -> Self {
        Self {
            period_secs,
            dispatch_spacing_secs,
            default_exclusion_secs,
            ..Self::default()
        }
    }

    /// Returns the period as a Duration.
    pub fn period(&self) -> Duration {
        Duration::seconds(self.period_secs)
    }

    /// Returns the dispatch spacing as a Duration.
    pub fn dispatch_spacing(&self) -> Duration {
        Duration::seconds(self.dispatch_spacing_secs)
    }

    /// Exclusion time at `station`, honouring overrides.
    pub fn exclusion_for(&self, station: &str) -> Seconds {
        self.exclusion_overrides
            .get(station)
            .copied()
            .unwrap_or(self.default_exclusion_secs)
    }

    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits {
            max_states: self.max_search_states,
            max_orderings: self.max_orderings,
            dominance_pruning: self.dominance_pruning,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period_secs: 3600, // 1 hour
            dispatch_spacing_secs: 60,
            default_exclusion_secs: 60,
            exclusion_overrides: BTreeMap::new(),
            max_search_states: 2_000_000,
            max_orderings: 100_000,
            dominance_pruning: false,
            cache_capacity: 256,
            solver: SolverConfig::default(),
        }
    }
}
