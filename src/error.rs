//! Error types for the scheduling engine.
//!
//! Per-occurrence and per-schedule failures are caught and logged inside the
//! batch entry points; only storage failures while loading the schedule list
//! propagate out, so the surrounding job runner can apply its retry policy.

use crate::notify::NotifyError;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
  #[error("schedule {0} has no resolvable workout template")]
  TemplateUnresolved(i64),

  #[error("invalid recurrence configuration for schedule {schedule_id}: {reason}")]
  InvalidRecurrence { schedule_id: i64, reason: String },

  #[error("failed to materialize occurrence for schedule {schedule_id}: {source}")]
  MaterializationFailed {
    schedule_id: i64,
    #[source]
    source: sqlx::Error,
  },

  #[error("reminder dispatch failed: {0}")]
  ReminderDispatch(#[from] NotifyError),

  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("migration failed: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),
}
