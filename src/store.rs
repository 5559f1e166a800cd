//! Storage collaborator: schedule/template reads, the date-grained
//! "already processed" predicate, and the small bookkeeping writes.
//!
//! Free async functions over `&SqlitePool` with manual row mapping; the
//! write helpers used inside materialization/reminder transactions are
//! generic over the executor so they run against either the pool or an open
//! transaction.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::error::SchedulerError;
use crate::models::schedule::{RecurrencePattern, WorkoutSchedule};
use crate::models::session::{SessionStatus, WorkoutExercise, WorkoutSession, WorkoutSet};
use crate::models::template::{TemplateExercise, TemplateSet, WorkoutTemplate};

const SCHEDULE_COLUMNS: &str = "id, template_id, template_assignment_id, client_user_id, \
   coach_user_id, name, description, start_date, end_date, scheduled_datetime, is_recurring, \
   recurrence_pattern, recurrence_day_of_week, multiple_days_of_week, recurrence_day_of_month, \
   is_active, send_reminder, reminder_hours_before, last_reminder_sent, last_generation_status, \
   last_generated_workout_date, last_generated_session_id";

/// ---------------------------------------------------------------------------
/// Schedule Reads
/// ---------------------------------------------------------------------------

/// All active schedules. Rows with an unknown recurrence pattern are skipped
/// with a warning rather than failing the whole load.
pub async fn load_active_schedules(pool: &SqlitePool) -> Result<Vec<WorkoutSchedule>, SchedulerError> {
  let rows = sqlx::query(&format!(
    "SELECT {SCHEDULE_COLUMNS} FROM workout_schedules WHERE is_active = 1"
  ))
  .fetch_all(pool)
  .await?;

  collect_schedules(rows)
}

/// Active schedules with reminders enabled; the per-occurrence dedup happens
/// in the reminder scan, which needs computed occurrence instants.
pub async fn load_reminder_candidates(
  pool: &SqlitePool,
) -> Result<Vec<WorkoutSchedule>, SchedulerError> {
  let rows = sqlx::query(&format!(
    "SELECT {SCHEDULE_COLUMNS} FROM workout_schedules \
     WHERE is_active = 1 AND send_reminder = 1"
  ))
  .fetch_all(pool)
  .await?;

  collect_schedules(rows)
}

fn collect_schedules(rows: Vec<SqliteRow>) -> Result<Vec<WorkoutSchedule>, SchedulerError> {
  let mut schedules = Vec::new();
  for row in rows {
    if let Some(schedule) = schedule_from_row(&row)? {
      schedules.push(schedule);
    }
  }
  Ok(schedules)
}

fn schedule_from_row(row: &SqliteRow) -> Result<Option<WorkoutSchedule>, SchedulerError> {
  let id: i64 = row.try_get("id")?;
  let pattern_raw: String = row.try_get("recurrence_pattern")?;
  let recurrence_pattern = match pattern_raw.parse::<RecurrencePattern>() {
    Ok(pattern) => pattern,
    Err(reason) => {
      let err = SchedulerError::InvalidRecurrence { schedule_id: id, reason };
      warn!(error = %err, "skipping schedule");
      return Ok(None);
    }
  };

  let recurrence_day_of_month: Option<i64> = row.try_get("recurrence_day_of_month")?;

  Ok(Some(WorkoutSchedule {
    id,
    template_id: row.try_get("template_id")?,
    template_assignment_id: row.try_get("template_assignment_id")?,
    client_user_id: row.try_get("client_user_id")?,
    coach_user_id: row.try_get("coach_user_id")?,
    name: row.try_get("name")?,
    description: row.try_get("description")?,
    start_date: row.try_get("start_date")?,
    end_date: row.try_get("end_date")?,
    scheduled_datetime: row.try_get("scheduled_datetime")?,
    is_recurring: row.try_get("is_recurring")?,
    recurrence_pattern,
    recurrence_day_of_week: row.try_get("recurrence_day_of_week")?,
    multiple_days_of_week: row.try_get("multiple_days_of_week")?,
    recurrence_day_of_month: recurrence_day_of_month.and_then(|d| u32::try_from(d).ok()),
    is_active: row.try_get("is_active")?,
    send_reminder: row.try_get("send_reminder")?,
    reminder_hours_before: row.try_get("reminder_hours_before")?,
    last_reminder_sent: row.try_get("last_reminder_sent")?,
    last_generation_status: row.try_get("last_generation_status")?,
    last_generated_workout_date: row.try_get("last_generated_workout_date")?,
    last_generated_session_id: row.try_get("last_generated_session_id")?,
  }))
}

/// ---------------------------------------------------------------------------
/// Template Resolution
/// ---------------------------------------------------------------------------

/// Resolve a schedule's template id: the direct reference wins, otherwise
/// the template-assignment indirection. `None` when neither resolves.
pub async fn resolve_template_id(
  pool: &SqlitePool,
  schedule: &WorkoutSchedule,
) -> Result<Option<i64>, SchedulerError> {
  if let Some(template_id) = schedule.template_id {
    let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workout_templates WHERE id = ?")
      .bind(template_id)
      .fetch_one(pool)
      .await?;
    if found > 0 {
      return Ok(Some(template_id));
    }
  }

  if let Some(assignment_id) = schedule.template_assignment_id {
    let template_id: Option<i64> =
      sqlx::query_scalar("SELECT template_id FROM template_assignments WHERE id = ?")
        .bind(assignment_id)
        .fetch_optional(pool)
        .await?;
    if template_id.is_some() {
      return Ok(template_id);
    }
  }

  Ok(None)
}

/// Load a template with its exercises (by `order_index`) and each exercise's
/// sets (by `sequence_num`).
pub async fn load_template(
  pool: &SqlitePool,
  template_id: i64,
) -> Result<Option<WorkoutTemplate>, SchedulerError> {
  let Some(row) = sqlx::query("SELECT id, name, description FROM workout_templates WHERE id = ?")
    .bind(template_id)
    .fetch_optional(pool)
    .await?
  else {
    return Ok(None);
  };

  let mut template = WorkoutTemplate {
    id: row.try_get("id")?,
    name: row.try_get("name")?,
    description: row.try_get("description")?,
    exercises: Vec::new(),
  };

  let exercise_rows = sqlx::query(
    "SELECT id, exercise_name, order_index, rest_seconds, notes \
     FROM template_exercises WHERE template_id = ? ORDER BY order_index",
  )
  .bind(template_id)
  .fetch_all(pool)
  .await?;

  for exercise_row in exercise_rows {
    let mut exercise = TemplateExercise {
      id: exercise_row.try_get("id")?,
      exercise_name: exercise_row.try_get("exercise_name")?,
      order_index: exercise_row.try_get("order_index")?,
      rest_seconds: exercise_row.try_get("rest_seconds")?,
      notes: exercise_row.try_get("notes")?,
      sets: Vec::new(),
    };

    let set_rows = sqlx::query(
      "SELECT id, sequence_num, set_type, default_reps, default_weight, notes \
       FROM template_sets WHERE template_exercise_id = ? ORDER BY sequence_num",
    )
    .bind(exercise.id)
    .fetch_all(pool)
    .await?;

    for set_row in set_rows {
      exercise.sets.push(TemplateSet {
        id: set_row.try_get("id")?,
        sequence_num: set_row.try_get("sequence_num")?,
        set_type: set_row.try_get("set_type")?,
        default_reps: set_row.try_get("default_reps")?,
        default_weight: set_row.try_get("default_weight")?,
        notes: set_row.try_get("notes")?,
      });
    }

    template.exercises.push(exercise);
  }

  Ok(Some(template))
}

/// ---------------------------------------------------------------------------
/// Session Reads
/// ---------------------------------------------------------------------------

/// Load a materialized session row back into the model.
pub async fn load_session(
  pool: &SqlitePool,
  session_id: i64,
) -> Result<Option<WorkoutSession>, SchedulerError> {
  let Some(row) = sqlx::query(
    "SELECT id, name, description, start_datetime, user_id, template_id, \
     template_assignment_id, is_from_coach, status FROM workout_sessions WHERE id = ?",
  )
  .bind(session_id)
  .fetch_optional(pool)
  .await?
  else {
    return Ok(None);
  };

  let status_raw: String = row.try_get("status")?;
  let status = status_raw
    .parse::<SessionStatus>()
    .map_err(|err| sqlx::Error::ColumnDecode {
      index: "status".into(),
      source: err.into(),
    })?;

  Ok(Some(WorkoutSession {
    id: row.try_get("id")?,
    name: row.try_get("name")?,
    description: row.try_get("description")?,
    start_datetime: row.try_get("start_datetime")?,
    user_id: row.try_get("user_id")?,
    template_id: row.try_get("template_id")?,
    template_assignment_id: row.try_get("template_assignment_id")?,
    is_from_coach: row.try_get("is_from_coach")?,
    status,
  }))
}

/// A session's exercises in `order_index` order.
pub async fn load_session_exercises(
  pool: &SqlitePool,
  session_id: i64,
) -> Result<Vec<WorkoutExercise>, SchedulerError> {
  let rows = sqlx::query(
    "SELECT id, session_id, exercise_name, order_index, rest_seconds, notes \
     FROM workout_exercises WHERE session_id = ? ORDER BY order_index",
  )
  .bind(session_id)
  .fetch_all(pool)
  .await?;

  let mut exercises = Vec::with_capacity(rows.len());
  for row in rows {
    exercises.push(WorkoutExercise {
      id: row.try_get("id")?,
      session_id: row.try_get("session_id")?,
      exercise_name: row.try_get("exercise_name")?,
      order_index: row.try_get("order_index")?,
      rest_seconds: row.try_get("rest_seconds")?,
      notes: row.try_get("notes")?,
    });
  }
  Ok(exercises)
}

/// An exercise's sets in `sequence_num` order.
pub async fn load_exercise_sets(
  pool: &SqlitePool,
  workout_exercise_id: i64,
) -> Result<Vec<WorkoutSet>, SchedulerError> {
  let rows = sqlx::query(
    "SELECT id, workout_exercise_id, set_type, sequence_num, set_number, reps, weight, \
     notes, is_completed FROM workout_sets WHERE workout_exercise_id = ? ORDER BY sequence_num",
  )
  .bind(workout_exercise_id)
  .fetch_all(pool)
  .await?;

  let mut sets = Vec::with_capacity(rows.len());
  for row in rows {
    sets.push(WorkoutSet {
      id: row.try_get("id")?,
      workout_exercise_id: row.try_get("workout_exercise_id")?,
      set_type: row.try_get("set_type")?,
      sequence_num: row.try_get("sequence_num")?,
      set_number: row.try_get("set_number")?,
      reps: row.try_get("reps")?,
      weight: row.try_get("weight")?,
      notes: row.try_get("notes")?,
      is_completed: row.try_get("is_completed")?,
    });
  }
  Ok(sets)
}

/// ---------------------------------------------------------------------------
/// Already-Processed Predicate
/// ---------------------------------------------------------------------------

/// Date-grained idempotency check: does a session already exist for this
/// template + user + calendar date? Any session created on that date through
/// any path fulfils the occurrence.
pub async fn has_session_for_date(
  pool: &SqlitePool,
  template_id: i64,
  user_id: i64,
  date: NaiveDate,
) -> Result<bool, SchedulerError> {
  let Some(next_day) = date.succ_opt() else {
    return Ok(false);
  };
  let day_start = date.and_time(NaiveTime::MIN);
  let day_end = next_day.and_time(NaiveTime::MIN);

  let count: i64 = sqlx::query_scalar(
    "SELECT COUNT(*) FROM workout_sessions \
     WHERE template_id = ? AND user_id = ? AND start_datetime >= ? AND start_datetime < ?",
  )
  .bind(template_id)
  .bind(user_id)
  .bind(day_start)
  .bind(day_end)
  .fetch_one(pool)
  .await?;

  Ok(count > 0)
}

/// ---------------------------------------------------------------------------
/// Contacts
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ClientContact {
  pub name: String,
  pub email: Option<String>,
}

pub async fn load_client_contact(
  pool: &SqlitePool,
  user_id: i64,
) -> Result<Option<ClientContact>, SchedulerError> {
  let row = sqlx::query("SELECT name, email FROM users WHERE id = ?")
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

  match row {
    Some(row) => Ok(Some(ClientContact {
      name: row.try_get("name")?,
      email: row.try_get("email")?,
    })),
    None => Ok(None),
  }
}

/// ---------------------------------------------------------------------------
/// Bookkeeping Writes
/// ---------------------------------------------------------------------------

pub async fn update_generation_bookkeeping<'e, E>(
  executor: E,
  schedule_id: i64,
  generated_at: NaiveDateTime,
  session_id: i64,
) -> Result<(), SchedulerError>
where
  E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
  sqlx::query(
    "UPDATE workout_schedules SET last_generation_status = 'Processed', \
     last_generated_workout_date = ?, last_generated_session_id = ? WHERE id = ?",
  )
  .bind(generated_at)
  .bind(session_id)
  .bind(schedule_id)
  .execute(executor)
  .await?;
  Ok(())
}

pub async fn deactivate_schedule<'e, E>(executor: E, schedule_id: i64) -> Result<(), SchedulerError>
where
  E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
  sqlx::query("UPDATE workout_schedules SET is_active = 0 WHERE id = ?")
    .bind(schedule_id)
    .execute(executor)
    .await?;
  Ok(())
}

pub async fn set_last_reminder_sent<'e, E>(
  executor: E,
  schedule_id: i64,
  sent_at: NaiveDateTime,
) -> Result<(), SchedulerError>
where
  E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
  sqlx::query("UPDATE workout_schedules SET last_reminder_sent = ? WHERE id = ?")
    .bind(sent_at)
    .bind(schedule_id)
    .execute(executor)
    .await?;
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
