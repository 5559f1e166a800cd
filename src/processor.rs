//! Occurrence resolution and batch processing.
//!
//! Two passes share the same machinery: the due pass materializes sessions
//! ahead of upcoming occurrences, and the optional missed pass backfills
//! occurrences that were never materialized in time. Resolution is pure over
//! the schedule list and an explicit `now`; only the batch entry points touch
//! storage. One failing occurrence never aborts the rest of a batch.

use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::config::SchedulerOptions;
use crate::error::SchedulerError;
use crate::materializer;
use crate::models::schedule::{ResolvedOccurrence, WorkoutSchedule};
use crate::recurrence;
use crate::store;

/// ---------------------------------------------------------------------------
/// Resolution
/// ---------------------------------------------------------------------------

/// Occurrences falling inside the due window `[now, now + advance)`.
///
/// One-off schedules contribute their single instant. Recurring schedules
/// contribute at most one occurrence per pass (the next one after `now`);
/// the recurring-job cadence picks up anything after it on later passes.
pub fn resolve_due_occurrences(
  schedules: &[WorkoutSchedule],
  options: &SchedulerOptions,
  now: NaiveDateTime,
) -> Vec<ResolvedOccurrence> {
  let (window_start, window_end) = options.due_window(now);
  let mut resolved = Vec::new();

  for schedule in schedules {
    if schedule.is_one_off() {
      match schedule.scheduled_datetime {
        Some(instant) if instant >= window_start && instant < window_end => {
          resolved.push(ResolvedOccurrence::new(schedule.clone(), instant));
        }
        Some(_) => {}
        None => {
          warn!(
            schedule_id = schedule.id,
            "one-off schedule has no scheduled datetime, skipping"
          );
        }
      }
      continue;
    }

    if let Some(next) = recurrence::next_occurrence(schedule, now) {
      if next >= window_start && next < window_end {
        resolved.push(ResolvedOccurrence::new(schedule.clone(), next));
      }
    }
  }

  resolved
}

/// Occurrences falling inside the missed window
/// `[now - max_days, now - maximum_hours_late)`. Only recurring schedules
/// are backfilled; a past one-off is simply expired. Empty when the
/// configured window is inverted.
pub fn resolve_missed_occurrences(
  schedules: &[WorkoutSchedule],
  options: &SchedulerOptions,
  now: NaiveDateTime,
) -> Vec<ResolvedOccurrence> {
  let Some((window_start, window_end)) = options.missed_window(now) else {
    warn!(
      max_days = options.max_days_for_missed_workouts,
      max_hours_late = options.maximum_hours_late,
      "missed-workout window is inverted, nothing to resolve"
    );
    return Vec::new();
  };

  let mut resolved = Vec::new();
  for schedule in schedules {
    if schedule.is_one_off() {
      continue;
    }

    // Enumerate by calendar date, then trim to the exact instants; the range
    // helper has date granularity and can overshoot at both edges.
    for instant in
      recurrence::occurrences_in_range(schedule, window_start.date(), window_end.date())
    {
      if instant >= window_start && instant < window_end {
        resolved.push(ResolvedOccurrence::new(schedule.clone(), instant));
      }
    }
  }

  resolved
}

/// ---------------------------------------------------------------------------
/// Batch Processing
/// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
  pub created: usize,
  pub skipped: usize,
  pub failed: usize,
}

/// Materialize sessions for every due occurrence of every active schedule.
pub async fn process_due_workouts(
  pool: &SqlitePool,
  options: &SchedulerOptions,
  now: NaiveDateTime,
) -> Result<ProcessingSummary, SchedulerError> {
  let schedules = store::load_active_schedules(pool).await?;
  let occurrences = resolve_due_occurrences(&schedules, options, now);
  process_batch(pool, occurrences, false, options, now).await
}

/// Backfill sessions for occurrences that slipped through the due pass.
/// No-op unless `create_missed_workouts` is enabled.
pub async fn process_missed_workouts(
  pool: &SqlitePool,
  options: &SchedulerOptions,
  now: NaiveDateTime,
) -> Result<ProcessingSummary, SchedulerError> {
  if !options.create_missed_workouts {
    return Ok(ProcessingSummary::default());
  }

  let schedules = store::load_active_schedules(pool).await?;
  let occurrences = resolve_missed_occurrences(&schedules, options, now);
  process_batch(pool, occurrences, true, options, now).await
}

async fn process_batch(
  pool: &SqlitePool,
  occurrences: Vec<ResolvedOccurrence>,
  missed: bool,
  options: &SchedulerOptions,
  now: NaiveDateTime,
) -> Result<ProcessingSummary, SchedulerError> {
  let mut summary = ProcessingSummary::default();

  for occurrence in occurrences {
    match process_one(pool, &occurrence, missed, options, now).await {
      Ok(true) => summary.created += 1,
      Ok(false) => summary.skipped += 1,
      Err(err) => {
        error!(
          schedule_id = occurrence.schedule.id,
          occurrence = %occurrence.occurrence,
          error = %err,
          "failed to process occurrence"
        );
        summary.failed += 1;
      }
    }
  }

  info!(
    created = summary.created,
    skipped = summary.skipped,
    failed = summary.failed,
    missed,
    "processed occurrence batch"
  );

  Ok(summary)
}

/// Returns `Ok(true)` when a session was created, `Ok(false)` when the
/// occurrence date already has one.
async fn process_one(
  pool: &SqlitePool,
  occurrence: &ResolvedOccurrence,
  missed: bool,
  options: &SchedulerOptions,
  now: NaiveDateTime,
) -> Result<bool, SchedulerError> {
  let schedule = &occurrence.schedule;

  let template_id = store::resolve_template_id(pool, schedule)
    .await?
    .ok_or(SchedulerError::TemplateUnresolved(schedule.id))?;

  // Any session on the occurrence date fulfils it, whoever created it.
  if store::has_session_for_date(
    pool,
    template_id,
    schedule.client_user_id,
    occurrence.occurrence.date(),
  )
  .await?
  {
    return Ok(false);
  }

  materializer::materialize(pool, occurrence, missed, options, now).await?;
  Ok(true)
}

/// ---------------------------------------------------------------------------
/// Cleanup
/// ---------------------------------------------------------------------------

/// Deactivate schedules that can never produce another occurrence: recurring
/// ones past their end date, and one-offs at least a day past their instant
/// (the grace day keeps the missed pass's view of them intact). Returns the
/// number of schedules deactivated.
pub async fn cleanup_expired_schedules(
  pool: &SqlitePool,
  now: NaiveDateTime,
) -> Result<u64, SchedulerError> {
  let ended = sqlx::query(
    "UPDATE workout_schedules SET is_active = 0 \
     WHERE is_active = 1 AND end_date IS NOT NULL AND end_date < ?",
  )
  .bind(now.date())
  .execute(pool)
  .await?
  .rows_affected();

  let spent = sqlx::query(
    "UPDATE workout_schedules SET is_active = 0 \
     WHERE is_active = 1 AND is_recurring = 0 \
     AND scheduled_datetime IS NOT NULL AND scheduled_datetime < ?",
  )
  .bind(now - chrono::Duration::days(1))
  .execute(pool)
  .await?
  .rows_affected();

  let deactivated = ended + spent;
  if deactivated > 0 {
    info!(ended, spent, "deactivated expired schedules");
  }
  Ok(deactivated)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
