//! Materialized workout sessions and their exercises/sets.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Session Status
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
  /// Created ahead of its occurrence by due-processing
  Scheduled,
  /// Backfilled for an occurrence that was never materialized in time
  Missed,
}

impl std::fmt::Display for SessionStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Scheduled => write!(f, "Scheduled"),
      Self::Missed => write!(f, "Missed"),
    }
  }
}

impl std::str::FromStr for SessionStatus {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Scheduled" => Ok(Self::Scheduled),
      "Missed" => Ok(Self::Missed),
      _ => Err(format!("Unknown session status: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Session Aggregate
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSession {
  pub id: i64,
  pub name: String,
  pub description: Option<String>,
  pub start_datetime: NaiveDateTime,
  pub user_id: i64,
  pub template_id: Option<i64>,
  pub template_assignment_id: Option<i64>,
  pub is_from_coach: bool,
  pub status: SessionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutExercise {
  pub id: i64,
  pub session_id: i64,
  pub exercise_name: String,
  pub order_index: i64,
  pub rest_seconds: Option<i64>,
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSet {
  pub id: i64,
  pub workout_exercise_id: i64,
  pub set_type: Option<String>,
  pub sequence_num: i64,
  pub set_number: i64,
  pub reps: Option<i64>,
  pub weight: Option<f64>,
  pub notes: Option<String>,
  pub is_completed: bool,
}
