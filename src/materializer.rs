//! Session materialization.
//!
//! Turns a resolved occurrence into a concrete workout session row with its
//! exercises and sets copied from the template. The whole aggregate, the
//! schedule bookkeeping update, and one-off deactivation commit in a single
//! transaction so a partial write never leaves a half-built session behind.

use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use tracing::info;

use crate::config::SchedulerOptions;
use crate::error::SchedulerError;
use crate::models::schedule::ResolvedOccurrence;
use crate::models::session::{SessionStatus, WorkoutSession};
use crate::models::template::WorkoutTemplate;
use crate::store;

/// ---------------------------------------------------------------------------
/// Materialize
/// ---------------------------------------------------------------------------

/// Create the session for a resolved occurrence; returns the created session.
///
/// `missed` marks backfilled occurrences, which get status `Missed` when
/// `mark_missed_workouts_as_late` is set. `now` stamps the schedule's
/// generation bookkeeping.
pub async fn materialize(
  pool: &SqlitePool,
  occurrence: &ResolvedOccurrence,
  missed: bool,
  options: &SchedulerOptions,
  now: NaiveDateTime,
) -> Result<WorkoutSession, SchedulerError> {
  let schedule = &occurrence.schedule;

  let template_id = store::resolve_template_id(pool, schedule)
    .await?
    .ok_or(SchedulerError::TemplateUnresolved(schedule.id))?;
  let template = store::load_template(pool, template_id)
    .await?
    .ok_or(SchedulerError::TemplateUnresolved(schedule.id))?;

  let status = if missed && options.mark_missed_workouts_as_late {
    SessionStatus::Missed
  } else {
    SessionStatus::Scheduled
  };

  let mut tx = pool.begin().await?;
  let session = match write_session(&mut tx, occurrence, &template, status, now).await {
    Ok(session) => session,
    Err(SchedulerError::Database(source)) => {
      tx.rollback().await.ok();
      return Err(SchedulerError::MaterializationFailed {
        schedule_id: schedule.id,
        source,
      });
    }
    Err(other) => {
      tx.rollback().await.ok();
      return Err(other);
    }
  };
  // Commit failures lose the session too, so they carry the same context.
  if let Err(source) = tx.commit().await {
    return Err(SchedulerError::MaterializationFailed {
      schedule_id: schedule.id,
      source,
    });
  }

  info!(
    schedule_id = schedule.id,
    session_id = session.id,
    occurrence = %occurrence.occurrence,
    status = %session.status,
    "materialized workout session"
  );

  Ok(session)
}

async fn write_session(
  tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
  occurrence: &ResolvedOccurrence,
  template: &WorkoutTemplate,
  status: SessionStatus,
  now: NaiveDateTime,
) -> Result<WorkoutSession, SchedulerError> {
  let schedule = &occurrence.schedule;

  // Schedule-level name/description win; the template fills the gaps.
  let name = if schedule.name.is_empty() {
    template.name.clone()
  } else {
    schedule.name.clone()
  };
  let description = schedule
    .description
    .clone()
    .or_else(|| template.description.clone());
  let is_from_coach = schedule
    .coach_user_id
    .is_some_and(|coach_id| coach_id != schedule.client_user_id);

  let session = sqlx::query(
    r#"
    INSERT INTO workout_sessions (
      name, description, start_datetime, user_id, template_id,
      template_assignment_id, is_from_coach, status
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    "#,
  )
  .bind(&name)
  .bind(&description)
  .bind(occurrence.occurrence)
  .bind(schedule.client_user_id)
  .bind(template.id)
  .bind(schedule.template_assignment_id)
  .bind(is_from_coach)
  .bind(status.to_string())
  .execute(&mut **tx)
  .await?;
  let session_id = session.last_insert_rowid();

  for exercise in &template.exercises {
    let session_exercise = sqlx::query(
      r#"
      INSERT INTO workout_exercises (session_id, exercise_name, order_index, rest_seconds, notes)
      VALUES (?1, ?2, ?3, ?4, ?5)
      "#,
    )
    .bind(session_id)
    .bind(&exercise.exercise_name)
    .bind(exercise.order_index)
    .bind(exercise.rest_seconds)
    .bind(&exercise.notes)
    .execute(&mut **tx)
    .await?;
    let exercise_id = session_exercise.last_insert_rowid();

    for set in &exercise.sets {
      sqlx::query(
        r#"
        INSERT INTO workout_sets (
          workout_exercise_id, set_type, sequence_num, set_number,
          reps, weight, notes, is_completed
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)
        "#,
      )
      .bind(exercise_id)
      .bind(&set.set_type)
      .bind(set.sequence_num)
      .bind(set.sequence_num + 1)
      .bind(set.default_reps)
      .bind(set.default_weight)
      .bind(&set.notes)
      .execute(&mut **tx)
      .await?;
    }
  }

  store::update_generation_bookkeeping(&mut **tx, schedule.id, now, session_id).await?;

  // A one-off schedule is spent once its single session exists.
  if schedule.is_one_off() {
    store::deactivate_schedule(&mut **tx, schedule.id).await?;
  }

  Ok(WorkoutSession {
    id: session_id,
    name,
    description,
    start_datetime: occurrence.occurrence,
    user_id: schedule.client_user_id,
    template_id: Some(template.id),
    template_assignment_id: schedule.template_assignment_id,
    is_from_coach,
    status,
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
