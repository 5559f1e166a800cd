//! Workout templates: the exercise/set blueprints copied into sessions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutTemplate {
  pub id: i64,
  pub name: String,
  pub description: Option<String>,
  /// Ordered by `order_index`.
  pub exercises: Vec<TemplateExercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateExercise {
  pub id: i64,
  pub exercise_name: String,
  pub order_index: i64,
  pub rest_seconds: Option<i64>,
  pub notes: Option<String>,
  /// Ordered by `sequence_num`.
  pub sets: Vec<TemplateSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSet {
  pub id: i64,
  pub sequence_num: i64,
  pub set_type: Option<String>,
  pub default_reps: Option<i64>,
  pub default_weight: Option<f64>,
  pub notes: Option<String>,
}
