//! Recurrence math for workout schedules.
//!
//! Pure, deterministic date arithmetic: given a schedule's recurrence rule
//! and a reference instant, compute the next occurrence, or enumerate every
//! occurrence inside a date window. No I/O happens here; the resolvers in
//! `processor` and `reminder` drive these functions.
//!
//! All arithmetic is on wall-clock `NaiveDateTime` values. Callers convert
//! "now" into the configured zone before calling in (see
//! `SchedulerOptions::now`).

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::warn;

use crate::models::schedule::{RecurrencePattern, WorkoutSchedule};

/// Anchor time-of-day when a schedule has no `scheduled_datetime` (5 PM).
const DEFAULT_ANCHOR_HOUR: u32 = 17;

/// Upper bound on the day-by-day scan: a bi-weekly schedule whose matching
/// weekday just passed on an unaligned week needs at most 21 days.
const SCAN_DAYS: u32 = 28;

/// ---------------------------------------------------------------------------
/// Next Occurrence
/// ---------------------------------------------------------------------------

/// Compute the next occurrence of a recurring schedule strictly after
/// `reference` (same-day occurrences count only while their time-of-day is
/// still ahead). Returns `None` for one-off schedules (the caller uses
/// `scheduled_datetime` directly) and for schedules past their end date.
pub fn next_occurrence(
  schedule: &WorkoutSchedule,
  reference: NaiveDateTime,
) -> Option<NaiveDateTime> {
  if schedule.is_one_off() {
    return None;
  }

  if let Some(end) = schedule.end_date {
    if end < reference.date() {
      return None;
    }
  }

  // Never produce an occurrence before the schedule starts.
  let floor = schedule.start_date.and_time(NaiveTime::MIN);
  let reference = reference.max(floor);
  let time_of_day = anchor_time(schedule);

  match schedule.recurrence_pattern {
    RecurrencePattern::Once => None,
    RecurrencePattern::Weekly => {
      next_day_of_week_occurrence(schedule, reference, time_of_day, false)
    }
    RecurrencePattern::BiWeekly => {
      next_day_of_week_occurrence(schedule, reference, time_of_day, true)
    }
    RecurrencePattern::Monthly => next_monthly_occurrence(schedule, reference, time_of_day),
  }
}

fn next_day_of_week_occurrence(
  schedule: &WorkoutSchedule,
  reference: NaiveDateTime,
  time_of_day: NaiveTime,
  biweekly: bool,
) -> Option<NaiveDateTime> {
  let (days, _) = schedule.occurrence_days();
  if days.is_empty() {
    warn!(
      schedule_id = schedule.id,
      pattern = %schedule.recurrence_pattern,
      "schedule has no derivable occurrence days"
    );
    return None;
  }

  let mut date = reference.date();
  for _ in 0..SCAN_DAYS {
    if days.contains(&date.weekday()) && (!biweekly || on_biweekly_cycle(schedule.start_date, date))
    {
      // Today only counts while its time-of-day is still ahead.
      if date != reference.date() || time_of_day > reference.time() {
        if let Some(end) = schedule.end_date {
          if date > end {
            return None;
          }
        }
        return Some(date.and_time(time_of_day));
      }
    }
    date = date.succ_opt()?;
  }

  None
}

fn next_monthly_occurrence(
  schedule: &WorkoutSchedule,
  reference: NaiveDateTime,
  time_of_day: NaiveTime,
) -> Option<NaiveDateTime> {
  let day_of_month = schedule
    .recurrence_day_of_month
    .unwrap_or_else(|| schedule.start_date.day());

  // Compare against the clipped candidate, not the raw day-of-month: in a
  // short month the clipped day can equal or precede the reference even when
  // the configured day is still numerically ahead.
  let date = reference.date();
  let this_month = clipped_monthly_date(schedule.id, date.year(), date.month(), day_of_month)?;
  let this_month_due =
    this_month > date || (this_month == date && time_of_day > reference.time());

  let candidate = if this_month_due {
    this_month
  } else {
    let (year, month) = next_month(date.year(), date.month());
    clipped_monthly_date(schedule.id, year, month, day_of_month)?
  };

  if let Some(end) = schedule.end_date {
    if candidate > end {
      return None;
    }
  }

  Some(candidate.and_time(time_of_day))
}

/// ---------------------------------------------------------------------------
/// Occurrences In Range
/// ---------------------------------------------------------------------------

/// All occurrences of a recurring schedule with dates inside
/// `[range_start, range_end]`, ordered ascending. Equivalent to repeatedly
/// advancing `next_occurrence` through the window. One-off schedules yield
/// nothing (their single instant lives on the schedule itself).
pub fn occurrences_in_range(
  schedule: &WorkoutSchedule,
  range_start: NaiveDate,
  range_end: NaiveDate,
) -> Vec<NaiveDateTime> {
  if schedule.is_one_off() {
    return Vec::new();
  }

  let start = range_start.max(schedule.start_date);
  if start > range_end {
    return Vec::new();
  }
  let time_of_day = anchor_time(schedule);

  match schedule.recurrence_pattern {
    RecurrencePattern::Once => Vec::new(),
    RecurrencePattern::Weekly => day_set_occurrences(schedule, start, range_end, time_of_day, false),
    RecurrencePattern::BiWeekly => {
      day_set_occurrences(schedule, start, range_end, time_of_day, true)
    }
    RecurrencePattern::Monthly => monthly_occurrences(schedule, start, range_end, time_of_day),
  }
}

fn day_set_occurrences(
  schedule: &WorkoutSchedule,
  start: NaiveDate,
  range_end: NaiveDate,
  time_of_day: NaiveTime,
  biweekly: bool,
) -> Vec<NaiveDateTime> {
  let (days, _) = schedule.occurrence_days();
  if days.is_empty() {
    warn!(
      schedule_id = schedule.id,
      pattern = %schedule.recurrence_pattern,
      "schedule has no derivable occurrence days"
    );
    return Vec::new();
  }

  let mut occurrences = Vec::new();
  let mut date = start;
  while date <= range_end {
    if let Some(end) = schedule.end_date {
      if date > end {
        break;
      }
    }
    if days.contains(&date.weekday()) && (!biweekly || on_biweekly_cycle(schedule.start_date, date))
    {
      occurrences.push(date.and_time(time_of_day));
    }
    date = match date.succ_opt() {
      Some(next) => next,
      None => break,
    };
  }
  occurrences
}

fn monthly_occurrences(
  schedule: &WorkoutSchedule,
  start: NaiveDate,
  range_end: NaiveDate,
  time_of_day: NaiveTime,
) -> Vec<NaiveDateTime> {
  let day_of_month = schedule
    .recurrence_day_of_month
    .unwrap_or_else(|| schedule.start_date.day());

  let mut occurrences = Vec::new();
  let (mut year, mut month) = (start.year(), start.month());
  while let Some(first_of_month) = NaiveDate::from_ymd_opt(year, month, 1) {
    if first_of_month > range_end {
      break;
    }
    if let Some(candidate) = clipped_monthly_date(schedule.id, year, month, day_of_month) {
      if let Some(end) = schedule.end_date {
        if candidate > end {
          break;
        }
      }
      if candidate >= start && candidate <= range_end {
        occurrences.push(candidate.and_time(time_of_day));
      }
    }
    (year, month) = next_month(year, month);
  }
  occurrences
}

/// ---------------------------------------------------------------------------
/// Calendar Helpers
/// ---------------------------------------------------------------------------

fn anchor_time(schedule: &WorkoutSchedule) -> NaiveTime {
  schedule
    .scheduled_datetime
    .map(|dt| dt.time())
    .or_else(|| NaiveTime::from_hms_opt(DEFAULT_ANCHOR_HOUR, 0, 0))
    .unwrap_or(NaiveTime::MIN)
}

/// Bi-weekly alignment: whole weeks elapsed since the schedule's start date
/// must be even.
fn on_biweekly_cycle(start_date: NaiveDate, candidate: NaiveDate) -> bool {
  (candidate - start_date).num_days().div_euclid(7) % 2 == 0
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
  if month == 12 {
    (year + 1, 1)
  } else {
    (year, month + 1)
  }
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
  let (next_year, next_month) = next_month(year, month);
  Some(
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
      .pred_opt()?
      .day(),
  )
}

/// Resolve a day-of-month against a concrete month, clipping to the month's
/// last day when the requested day does not exist (Feb 30 never errors).
fn clipped_monthly_date(
  schedule_id: i64,
  year: i32,
  month: u32,
  day_of_month: u32,
) -> Option<NaiveDate> {
  let last_day = days_in_month(year, month)?;
  let day = day_of_month.clamp(1, last_day);
  if day != day_of_month {
    warn!(
      schedule_id,
      year,
      month,
      requested = day_of_month,
      actual = day,
      "requested day of month does not exist, clipping to month boundary"
    );
  }
  NaiveDate::from_ymd_opt(year, month, day)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
