//! Background job runner.
//!
//! One loop drives the recurring jobs on their own cadences: due processing
//! hourly, missed backfill and reminder scans every 15 minutes, schedule
//! cleanup daily. Every tick reads the clock through the configured options
//! so the local/UTC choice lives in one place, and a failing tick is logged
//! and retried on the next one.

use sqlx::SqlitePool;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::config::SchedulerOptions;
use crate::notify::WebhookNotifier;
use crate::{processor, reminder};

const DUE_INTERVAL: Duration = Duration::from_secs(60 * 60);
const MISSED_INTERVAL: Duration = Duration::from_secs(15 * 60);
const REMINDER_INTERVAL: Duration = Duration::from_secs(15 * 60);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Run the scheduler's job loop until the surrounding task is cancelled.
/// Every job also fires once at startup.
pub async fn run(pool: SqlitePool, options: SchedulerOptions, notifier: WebhookNotifier) {
  let mut due = interval(DUE_INTERVAL);
  let mut missed = interval(MISSED_INTERVAL);
  let mut reminders = interval(REMINDER_INTERVAL);
  let mut cleanup = interval(CLEANUP_INTERVAL);
  for ticker in [&mut due, &mut missed, &mut reminders, &mut cleanup] {
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
  }

  info!(
    use_local_time_zone = options.use_local_time_zone,
    create_missed_workouts = options.create_missed_workouts,
    "scheduler job loop started"
  );

  loop {
    tokio::select! {
      _ = due.tick() => {
        if let Err(err) = processor::process_due_workouts(&pool, &options, options.now()).await {
          error!(error = %err, "due-workout job failed");
        }
      }
      _ = missed.tick() => {
        if let Err(err) = processor::process_missed_workouts(&pool, &options, options.now()).await {
          error!(error = %err, "missed-workout job failed");
        }
      }
      _ = reminders.tick() => {
        if let Err(err) = reminder::process_due_reminders(&pool, &notifier, options.now()).await {
          error!(error = %err, "reminder job failed");
        }
      }
      _ = cleanup.tick() => {
        if let Err(err) = processor::cleanup_expired_schedules(&pool, options.now()).await {
          error!(error = %err, "cleanup job failed");
        }
      }
    }
  }
}
