//! Scheduler configuration.
//!
//! Options mirror the processing knobs the engine recognizes, loadable from
//! the environment with typed defaults. The configured timezone also decides
//! what "now" means for all date arithmetic: entry points take an explicit
//! `now` so tests stay deterministic, and `SchedulerOptions::now()` is the
//! production clock.

use chrono::{Duration, Local, NaiveDateTime, Utc};
use std::env;
use tracing::warn;

/// ---------------------------------------------------------------------------
/// Options
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
  /// How far ahead of an occurrence its session is created (hours).
  pub hours_advance_creation: i64,
  /// Near edge of the missed-backfill window: occurrences younger than this
  /// are left for the due path (hours).
  pub maximum_hours_late: i64,
  /// Wall-clock arithmetic in the local zone; UTC when false.
  pub use_local_time_zone: bool,
  /// Feature flag for missed-occurrence backfill.
  pub create_missed_workouts: bool,
  /// How far back the missed-backfill window reaches (days).
  pub max_days_for_missed_workouts: i64,
  /// Backfilled sessions get status "Missed" instead of "Scheduled".
  pub mark_missed_workouts_as_late: bool,
}

impl Default for SchedulerOptions {
  fn default() -> Self {
    Self {
      hours_advance_creation: 24,
      maximum_hours_late: 1,
      use_local_time_zone: true,
      create_missed_workouts: false,
      max_days_for_missed_workouts: 7,
      mark_missed_workouts_as_late: true,
    }
  }
}

impl SchedulerOptions {
  /// Load options from `SCHEDULER_*` environment variables, falling back to
  /// the defaults for anything unset or unparsable.
  pub fn from_env() -> Self {
    dotenvy::dotenv().ok();
    let defaults = Self::default();
    Self {
      hours_advance_creation: env_i64(
        "SCHEDULER_HOURS_ADVANCE_CREATION",
        defaults.hours_advance_creation,
      ),
      maximum_hours_late: env_i64("SCHEDULER_MAXIMUM_HOURS_LATE", defaults.maximum_hours_late),
      use_local_time_zone: env_bool(
        "SCHEDULER_USE_LOCAL_TIME_ZONE",
        defaults.use_local_time_zone,
      ),
      create_missed_workouts: env_bool(
        "SCHEDULER_CREATE_MISSED_WORKOUTS",
        defaults.create_missed_workouts,
      ),
      max_days_for_missed_workouts: env_i64(
        "SCHEDULER_MAX_DAYS_FOR_MISSED_WORKOUTS",
        defaults.max_days_for_missed_workouts,
      ),
      mark_missed_workouts_as_late: env_bool(
        "SCHEDULER_MARK_MISSED_WORKOUTS_AS_LATE",
        defaults.mark_missed_workouts_as_late,
      ),
    }
  }

  /// Current wall-clock time in the configured zone.
  pub fn now(&self) -> NaiveDateTime {
    if self.use_local_time_zone {
      Local::now().naive_local()
    } else {
      Utc::now().naive_utc()
    }
  }

  /// Due window: `[now, now + hours_advance_creation)`.
  pub fn due_window(&self, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (now, now + Duration::hours(self.hours_advance_creation))
  }

  /// Missed window: `[now - max_days, now - maximum_hours_late)`. Returns
  /// `None` when the configuration inverts the window.
  pub fn missed_window(&self, now: NaiveDateTime) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let start = now - Duration::days(self.max_days_for_missed_workouts);
    let end = now - Duration::hours(self.maximum_hours_late);
    if start >= end {
      return None;
    }
    Some((start, end))
  }
}

fn env_i64(key: &str, default: i64) -> i64 {
  match env::var(key) {
    Ok(raw) => raw.parse().unwrap_or_else(|_| {
      warn!(key, value = %raw, "unparsable integer in environment, using default");
      default
    }),
    Err(_) => default,
  }
}

fn env_bool(key: &str, default: bool) -> bool {
  match env::var(key) {
    Ok(raw) => match raw.to_lowercase().as_str() {
      "1" | "true" | "yes" => true,
      "0" | "false" | "no" => false,
      _ => {
        warn!(key, value = %raw, "unparsable boolean in environment, using default");
        default
      }
    },
    Err(_) => default,
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
