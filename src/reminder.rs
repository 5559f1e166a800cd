//! Reminder scanning and dispatch.
//!
//! Each scan walks the reminder-enabled schedules, computes the next upcoming
//! occurrence, and fires a notice once `now` enters the configured lead
//! window. `last_reminder_sent` is only stamped after a successful dispatch,
//! so a failed send is retried on the next scan; a stamp inside the current
//! occurrence's lead window suppresses duplicates.

use chrono::{Duration, NaiveDateTime};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::error::SchedulerError;
use crate::models::schedule::WorkoutSchedule;
use crate::notify::{Notifier, NotifyError, ReminderNotice};
use crate::recurrence;
use crate::store;

/// ---------------------------------------------------------------------------
/// Scan
/// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReminderSummary {
  pub sent: usize,
  pub skipped: usize,
  pub failed: usize,
}

/// Scan reminder-enabled schedules and dispatch any reminder whose lead
/// window has opened.
pub async fn process_due_reminders<N: Notifier>(
  pool: &SqlitePool,
  notifier: &N,
  now: NaiveDateTime,
) -> Result<ReminderSummary, SchedulerError> {
  let candidates = store::load_reminder_candidates(pool).await?;
  let mut summary = ReminderSummary::default();
  let mut sent_ids = Vec::new();

  for schedule in &candidates {
    let Some(upcoming) = upcoming_occurrence(schedule, now) else {
      summary.skipped += 1;
      continue;
    };

    let lead = Duration::hours(schedule.reminder_hours_before);
    if now < upcoming - lead {
      summary.skipped += 1;
      continue;
    }

    // A reminder already sent inside this occurrence's lead window covers it.
    if let Some(last) = schedule.last_reminder_sent {
      if last + lead >= upcoming {
        summary.skipped += 1;
        continue;
      }
    }

    match dispatch(pool, notifier, schedule, upcoming).await {
      Ok(()) => {
        summary.sent += 1;
        sent_ids.push(schedule.id);
      }
      Err(err) => {
        error!(
          schedule_id = schedule.id,
          occurrence = %upcoming,
          error = %err,
          "failed to dispatch reminder"
        );
        summary.failed += 1;
      }
    }
  }

  // Stamp all successful dispatches in one transaction.
  if !sent_ids.is_empty() {
    let mut tx = pool.begin().await?;
    for schedule_id in &sent_ids {
      store::set_last_reminder_sent(&mut *tx, *schedule_id, now).await?;
    }
    tx.commit().await?;
  }

  info!(
    sent = summary.sent,
    skipped = summary.skipped,
    failed = summary.failed,
    "processed reminder scan"
  );

  Ok(summary)
}

/// The occurrence a reminder would announce: the one-off instant while it is
/// still ahead, or the next recurring occurrence after `now`.
fn upcoming_occurrence(schedule: &WorkoutSchedule, now: NaiveDateTime) -> Option<NaiveDateTime> {
  if schedule.is_one_off() {
    return schedule.scheduled_datetime.filter(|instant| *instant > now);
  }
  recurrence::next_occurrence(schedule, now)
}

async fn dispatch<N: Notifier>(
  pool: &SqlitePool,
  notifier: &N,
  schedule: &WorkoutSchedule,
  upcoming: NaiveDateTime,
) -> Result<(), SchedulerError> {
  let contact = store::load_client_contact(pool, schedule.client_user_id).await?;
  let Some(contact) = contact else {
    warn!(
      schedule_id = schedule.id,
      user_id = schedule.client_user_id,
      "reminder candidate has no user row"
    );
    return Err(NotifyError::MissingContact(schedule.client_user_id).into());
  };
  let Some(email) = contact.email else {
    return Err(NotifyError::MissingContact(schedule.client_user_id).into());
  };

  let notice = ReminderNotice {
    schedule_id: schedule.id,
    recipient_name: contact.name,
    recipient_email: email,
    workout_name: schedule.name.clone(),
    scheduled_for: upcoming,
    description: schedule.description.clone(),
  };

  notifier.send(&notice).await?;
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
