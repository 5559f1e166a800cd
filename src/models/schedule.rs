//! Schedule definitions and resolved occurrences.
//!
//! A `WorkoutSchedule` is the stored recurrence rule (created and edited
//! outside this engine); a `ResolvedOccurrence` pairs a schedule with one
//! concrete instant the recurrence math produced. The pairing is an explicit
//! value type so the stored schedule is never mutated to carry a computed
//! date.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// ---------------------------------------------------------------------------
/// Recurrence Pattern
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum RecurrencePattern {
  /// Single occurrence at `scheduled_datetime`
  #[default]
  Once,
  /// Every week on the configured days
  Weekly,
  /// Every other week (anchored on `start_date`) on the configured days
  BiWeekly,
  /// Once a month on `recurrence_day_of_month`
  Monthly,
}

impl std::fmt::Display for RecurrencePattern {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Once => write!(f, "Once"),
      Self::Weekly => write!(f, "Weekly"),
      Self::BiWeekly => write!(f, "BiWeekly"),
      Self::Monthly => write!(f, "Monthly"),
    }
  }
}

impl std::str::FromStr for RecurrencePattern {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Once" => Ok(Self::Once),
      "Weekly" => Ok(Self::Weekly),
      "BiWeekly" => Ok(Self::BiWeekly),
      "Monthly" => Ok(Self::Monthly),
      _ => Err(format!("Unknown recurrence pattern: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Workout Schedule
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSchedule {
  pub id: i64,

  /// Direct template reference (self-scheduling path).
  pub template_id: Option<i64>,
  /// Template via a coach assignment. Exactly one of the two must resolve.
  pub template_assignment_id: Option<i64>,

  pub client_user_id: i64,
  pub coach_user_id: Option<i64>,

  pub name: String,
  pub description: Option<String>,

  /// Lower bound for recurrence generation; no occurrence precedes it.
  pub start_date: NaiveDate,
  /// Inclusive upper bound (date-grained, independent of time-of-day).
  pub end_date: Option<NaiveDate>,
  /// One-off schedules: the exact occurrence instant.
  /// Recurring schedules: only the time-of-day component is meaningful.
  pub scheduled_datetime: Option<NaiveDateTime>,

  pub is_recurring: bool,
  pub recurrence_pattern: RecurrencePattern,
  /// 0 = Sunday .. 6 = Saturday
  pub recurrence_day_of_week: Option<i64>,
  /// Comma-separated weekday integers, unioned with the single day above.
  pub multiple_days_of_week: Option<String>,
  pub recurrence_day_of_month: Option<u32>,

  pub is_active: bool,

  pub send_reminder: bool,
  pub reminder_hours_before: i64,
  pub last_reminder_sent: Option<NaiveDateTime>,

  // Bookkeeping written back after each successful materialization.
  pub last_generation_status: Option<String>,
  pub last_generated_workout_date: Option<NaiveDateTime>,
  pub last_generated_session_id: Option<i64>,
}

/// Where the occurrence-day set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySource {
  Configured,
  /// Nothing valid was configured; the start date's weekday was used.
  StartDateFallback,
}

impl WorkoutSchedule {
  /// One-off schedules occur exactly once, at `scheduled_datetime`.
  pub fn is_one_off(&self) -> bool {
    !self.is_recurring || self.recurrence_pattern == RecurrencePattern::Once
  }

  /// Union of the single configured day and the comma-separated list, with
  /// invalid entries dropped. Weekly/BiWeekly schedules with no valid day
  /// fall back to the start date's weekday.
  pub fn occurrence_days(&self) -> (Vec<Weekday>, DaySource) {
    let mut days = Vec::new();

    if let Some(value) = self.recurrence_day_of_week {
      match weekday_from_index(value) {
        Some(day) => days.push(day),
        None => warn!(
          schedule_id = self.id,
          value, "schedule has an out-of-range recurrence day of week"
        ),
      }
    }

    if let Some(csv) = &self.multiple_days_of_week {
      for entry in csv.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.parse::<i64>().ok().and_then(weekday_from_index) {
          Some(day) => {
            if !days.contains(&day) {
              days.push(day);
            }
          }
          None => warn!(
            schedule_id = self.id,
            entry, "ignoring invalid day-of-week entry in multiple_days_of_week"
          ),
        }
      }
    }

    if days.is_empty()
      && matches!(
        self.recurrence_pattern,
        RecurrencePattern::Weekly | RecurrencePattern::BiWeekly
      )
    {
      let fallback = self.start_date.weekday();
      warn!(
        schedule_id = self.id,
        day = %fallback,
        "schedule has no valid days of week, using start date's weekday as fallback"
      );
      return (vec![fallback], DaySource::StartDateFallback);
    }

    (days, DaySource::Configured)
  }
}

/// Map a stored weekday integer (0 = Sunday .. 6 = Saturday) to a `Weekday`.
pub fn weekday_from_index(value: i64) -> Option<Weekday> {
  match value {
    0 => Some(Weekday::Sun),
    1 => Some(Weekday::Mon),
    2 => Some(Weekday::Tue),
    3 => Some(Weekday::Wed),
    4 => Some(Weekday::Thu),
    5 => Some(Weekday::Fri),
    6 => Some(Weekday::Sat),
    _ => None,
  }
}

/// ---------------------------------------------------------------------------
/// Resolved Occurrence
/// ---------------------------------------------------------------------------

/// A schedule paired with one concrete occurrence instant. Transient: never
/// persisted, handed from the resolvers to the materializer.
#[derive(Debug, Clone)]
pub struct ResolvedOccurrence {
  pub schedule: WorkoutSchedule,
  pub occurrence: NaiveDateTime,
}

impl ResolvedOccurrence {
  pub fn new(schedule: WorkoutSchedule, occurrence: NaiveDateTime) -> Self {
    Self { schedule, occurrence }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::make_schedule;

  #[test]
  fn pattern_roundtrips_through_strings() {
    for pattern in [
      RecurrencePattern::Once,
      RecurrencePattern::Weekly,
      RecurrencePattern::BiWeekly,
      RecurrencePattern::Monthly,
    ] {
      let parsed: RecurrencePattern = pattern.to_string().parse().unwrap();
      assert_eq!(parsed, pattern);
    }
    assert!("Daily".parse::<RecurrencePattern>().is_err());
  }

  #[test]
  fn one_off_detection() {
    let mut schedule = make_schedule(RecurrencePattern::Weekly);
    assert!(!schedule.is_one_off());

    schedule.recurrence_pattern = RecurrencePattern::Once;
    assert!(schedule.is_one_off());

    let mut schedule = make_schedule(RecurrencePattern::Monthly);
    schedule.is_recurring = false;
    assert!(schedule.is_one_off());
  }

  #[test]
  fn occurrence_days_unions_and_dedups() {
    let mut schedule = make_schedule(RecurrencePattern::Weekly);
    schedule.recurrence_day_of_week = Some(1);
    schedule.multiple_days_of_week = Some("1, 4,4".to_string());

    let (days, source) = schedule.occurrence_days();
    assert_eq!(days, vec![Weekday::Mon, Weekday::Thu]);
    assert_eq!(source, DaySource::Configured);
  }

  #[test]
  fn occurrence_days_drops_invalid_entries() {
    let mut schedule = make_schedule(RecurrencePattern::Weekly);
    schedule.recurrence_day_of_week = Some(9);
    schedule.multiple_days_of_week = Some("banana,7,2".to_string());

    let (days, _) = schedule.occurrence_days();
    assert_eq!(days, vec![Weekday::Tue]);
  }

  #[test]
  fn occurrence_days_falls_back_to_start_date_weekday() {
    let mut schedule = make_schedule(RecurrencePattern::Weekly);
    schedule.recurrence_day_of_week = None;
    schedule.multiple_days_of_week = Some("".to_string());
    // 2025-01-06 is a Monday
    schedule.start_date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();

    let (days, source) = schedule.occurrence_days();
    assert_eq!(days, vec![Weekday::Mon]);
    assert_eq!(source, DaySource::StartDateFallback);
  }

  #[test]
  fn monthly_schedule_gets_no_weekday_fallback() {
    let mut schedule = make_schedule(RecurrencePattern::Monthly);
    schedule.recurrence_day_of_week = None;
    schedule.multiple_days_of_week = None;

    let (days, source) = schedule.occurrence_days();
    assert!(days.is_empty());
    assert_eq!(source, DaySource::Configured);
  }
}
