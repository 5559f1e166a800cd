//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Schedule and template factories
//! - Date/time construction helpers

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;

use crate::models::schedule::{RecurrencePattern, WorkoutSchedule};

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  // Run migrations
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Build a NaiveDateTime from parts
pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
  NaiveDate::from_ymd_opt(y, m, d)
    .expect("valid date")
    .and_hms_opt(h, min, 0)
    .expect("valid time")
}

/// Build a NaiveDate from parts
pub fn on(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// ---------------------------------------------------------------------------
/// Schedule Factory
/// ---------------------------------------------------------------------------

/// Create a schedule with sensible defaults for the given pattern.
/// Starts on Monday 2025-01-06 with no end date; tests override fields
/// as needed before inserting.
pub fn make_schedule(pattern: RecurrencePattern) -> WorkoutSchedule {
  WorkoutSchedule {
    id: 1,
    template_id: Some(1),
    template_assignment_id: None,
    client_user_id: 1,
    coach_user_id: None,
    name: "Push Day".to_string(),
    description: None,
    start_date: on(2025, 1, 6),
    end_date: None,
    scheduled_datetime: None,
    is_recurring: pattern != RecurrencePattern::Once,
    recurrence_pattern: pattern,
    recurrence_day_of_week: None,
    multiple_days_of_week: None,
    recurrence_day_of_month: None,
    is_active: true,
    send_reminder: false,
    reminder_hours_before: 24,
    last_reminder_sent: None,
    last_generation_status: None,
    last_generated_workout_date: None,
    last_generated_session_id: None,
  }
}

/// ---------------------------------------------------------------------------
/// Seed Helpers
/// ---------------------------------------------------------------------------

/// Insert a schedule row; the `id` field on the value is ignored and the
/// database-assigned id is returned.
pub async fn insert_schedule(pool: &SqlitePool, schedule: &WorkoutSchedule) -> i64 {
  let result = sqlx::query(
    r#"
    INSERT INTO workout_schedules (
      template_id, template_assignment_id, client_user_id, coach_user_id,
      name, description, start_date, end_date, scheduled_datetime,
      is_recurring, recurrence_pattern, recurrence_day_of_week,
      multiple_days_of_week, recurrence_day_of_month, is_active,
      send_reminder, reminder_hours_before, last_reminder_sent,
      last_generation_status, last_generated_workout_date, last_generated_session_id
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)
    "#,
  )
  .bind(schedule.template_id)
  .bind(schedule.template_assignment_id)
  .bind(schedule.client_user_id)
  .bind(schedule.coach_user_id)
  .bind(&schedule.name)
  .bind(&schedule.description)
  .bind(schedule.start_date)
  .bind(schedule.end_date)
  .bind(schedule.scheduled_datetime)
  .bind(schedule.is_recurring)
  .bind(schedule.recurrence_pattern.to_string())
  .bind(schedule.recurrence_day_of_week)
  .bind(&schedule.multiple_days_of_week)
  .bind(schedule.recurrence_day_of_month.map(|d| d as i64))
  .bind(schedule.is_active)
  .bind(schedule.send_reminder)
  .bind(schedule.reminder_hours_before)
  .bind(schedule.last_reminder_sent)
  .bind(&schedule.last_generation_status)
  .bind(schedule.last_generated_workout_date)
  .bind(schedule.last_generated_session_id)
  .execute(pool)
  .await
  .expect("Failed to insert test schedule");

  result.last_insert_rowid()
}

/// Insert a user and return its id
pub async fn seed_user(pool: &SqlitePool, name: &str, email: Option<&str>) -> i64 {
  let result = sqlx::query("INSERT INTO users (name, email) VALUES (?1, ?2)")
    .bind(name)
    .bind(email)
    .execute(pool)
    .await
    .expect("Failed to insert test user");

  result.last_insert_rowid()
}

/// Insert a template with `exercise_count` exercises of `sets_per_exercise`
/// sets each; returns the template id
pub async fn seed_template(
  pool: &SqlitePool,
  name: &str,
  exercise_count: usize,
  sets_per_exercise: usize,
) -> i64 {
  let result = sqlx::query("INSERT INTO workout_templates (name, description) VALUES (?1, ?2)")
    .bind(name)
    .bind(format!("{} template", name))
    .execute(pool)
    .await
    .expect("Failed to insert test template");
  let template_id = result.last_insert_rowid();

  for exercise_index in 0..exercise_count {
    let exercise = sqlx::query(
      r#"
      INSERT INTO template_exercises (template_id, exercise_name, order_index, rest_seconds)
      VALUES (?1, ?2, ?3, ?4)
      "#,
    )
    .bind(template_id)
    .bind(format!("Exercise {}", exercise_index + 1))
    .bind(exercise_index as i64)
    .bind(90)
    .execute(pool)
    .await
    .expect("Failed to insert test exercise");
    let exercise_id = exercise.last_insert_rowid();

    for set_index in 0..sets_per_exercise {
      sqlx::query(
        r#"
        INSERT INTO template_sets (template_exercise_id, sequence_num, set_type, default_reps, default_weight)
        VALUES (?1, ?2, 'working', ?3, ?4)
        "#,
      )
      .bind(exercise_id)
      .bind(set_index as i64)
      .bind(8)
      .bind(60.0)
      .execute(pool)
      .await
      .expect("Failed to insert test set");
    }
  }

  template_id
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    // Verify key tables exist
    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('workout_schedules', 'workout_templates', 'workout_sessions')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert!(tables.len() >= 3, "Expected at least 3 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_template_builds_full_aggregate() {
    let pool = setup_test_db().await;

    let template_id = seed_template(&pool, "Pull Day", 2, 3).await;

    let exercise_count: i64 =
      sqlx::query_scalar("SELECT COUNT(*) FROM template_exercises WHERE template_id = ?")
        .bind(template_id)
        .fetch_one(&pool)
        .await
        .expect("Failed to count exercises");
    assert_eq!(exercise_count, 2);

    let set_count: i64 = sqlx::query_scalar(
      "SELECT COUNT(*) FROM template_sets WHERE template_exercise_id IN \
       (SELECT id FROM template_exercises WHERE template_id = ?)",
    )
    .bind(template_id)
    .fetch_one(&pool)
    .await
    .expect("Failed to count sets");
    assert_eq!(set_count, 6);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_insert_schedule_round_trips() {
    let pool = setup_test_db().await;
    let user_id = seed_user(&pool, "Avery", Some("avery@example.com")).await;
    let template_id = seed_template(&pool, "Pull Day", 1, 1).await;

    let mut schedule = make_schedule(RecurrencePattern::Weekly);
    schedule.client_user_id = user_id;
    schedule.template_id = Some(template_id);
    schedule.recurrence_day_of_week = Some(3);
    let id = insert_schedule(&pool, &schedule).await;

    let loaded = crate::store::load_active_schedules(&pool)
      .await
      .expect("Failed to load schedules");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, id);
    assert_eq!(loaded[0].recurrence_pattern, RecurrencePattern::Weekly);
    assert_eq!(loaded[0].recurrence_day_of_week, Some(3));
    assert_eq!(loaded[0].start_date, on(2025, 1, 6));

    teardown_test_db(pool).await;
  }
}
