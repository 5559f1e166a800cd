use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::error::SchedulerError;

pub type DbPool = SqlitePool;

/// Initialize the database connection pool and run migrations
///
/// `database_url` is a sqlx SQLite URL, e.g. `sqlite://scheduler.db?mode=rwc`
pub async fn connect(database_url: &str) -> Result<DbPool, SchedulerError> {
  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(database_url)
    .await?;

  // Run migrations
  sqlx::migrate!("./migrations").run(&pool).await?;

  info!(database_url, "database initialized");

  Ok(pool)
}
