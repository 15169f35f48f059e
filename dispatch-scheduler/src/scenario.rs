//! Scenario files: a network's routes plus scheduler configuration, as JSON.
//!
//! ```json
//! {
//!   "config": { "default_exclusion_secs": 90 },
//!   "routes": [
//!     {
//!       "id": "red",
//!       "patterns": [
//!         {
//!           "id": "red-a",
//!           "stations": ["alewife", "park", "ashmont"],
//!           "travel_times": { "alewife": "0:00", "park": "0:17", "ashmont": "0:35" },
//!           "schedule": { "weekday": { "6:00-9:00": 10, "9:00-16:00": 15 } }
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::domain::{CalendarService, Route, RoutePattern};

/// Errors loading a scenario.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A network to schedule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: SchedulerConfig,
    pub routes: Vec<Route>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario = Self::from_json(&json)?;
        debug!(
            path = %path.display(),
            routes = scenario.routes.len(),
            "Loaded scenario"
        );
        Ok(scenario)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &RoutePattern> {
        self.routes.iter().flat_map(|r| r.patterns.iter())
    }

    /// Every calendar service any pattern runs on, sorted.
    pub fn calendars(&self) -> Vec<CalendarService> {
        let mut calendars: Vec<_> = self
            .patterns()
            .flat_map(|p| p.schedule.calendars().cloned())
            .collect();
        calendars.sort();
        calendars.dedup();
        calendars
    }
}
