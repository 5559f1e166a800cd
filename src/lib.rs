//! Recurring workout scheduling engine.
//!
//! Schedules describe when workouts should happen (one-off or recurring);
//! this crate resolves their concrete occurrences, materializes workout
//! sessions from templates ahead of time, backfills missed occurrences, and
//! dispatches reminders. [`jobs::run`] drives everything on timers;
//! each piece is also callable on its own with an explicit clock.

pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod materializer;
pub mod models;
pub mod notify;
pub mod processor;
pub mod recurrence;
pub mod reminder;
pub mod store;

#[cfg(test)]
pub mod test_utils;

pub use config::SchedulerOptions;
pub use error::SchedulerError;
pub use models::{RecurrencePattern, ResolvedOccurrence, WorkoutSchedule};
