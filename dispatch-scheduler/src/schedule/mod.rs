//! Timetables from route patterns.
//!
//! Turns a network's route patterns and their schedules into departure
//! offsets per constant-frequency window and direction, and from those into
//! dispatch timestamps.

pub mod cache;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod frequency;

pub use cache::{DepartureOffsetCache, OffsetKey, offset_key};
pub use dispatch::{Departure, Direction, DispatchTimes};
pub use engine::{SubgraphScheduler, SubgraphTimetable, WindowOffsets, partition_routes, schedule_subgraphs};
pub use error::ScheduleError;
pub use frequency::{FrequencyWindow, constant_frequency_windows};
