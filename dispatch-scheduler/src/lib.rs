//! Periodic dispatch timetabling.
//!
//! Given route patterns that share track, their travel times and how many
//! trips each should run per hour, find departure offsets so that trains
//! never pass a shared location closer together than its exclusion time,
//! and the hour-long pattern repeats cleanly.
//!
//! The pipeline: [`graph`] reduces patterns to the key locations where they
//! interact, [`problem`] fixes one trips-per-hour combination, [`ordering`]
//! enumerates the feasible orders of arrivals, [`optimize`] solves for the
//! best offsets, and [`schedule`] turns offsets into departures.

pub mod config;
pub mod domain;
pub mod graph;
pub mod optimize;
pub mod ordering;
pub mod problem;
pub mod scenario;
pub mod schedule;

#[cfg(test)]
mod fixtures;
