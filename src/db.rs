use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::totp::TotpResult;

pub type DbPool = SqlitePool;

/// Open the process-wide pool for `database_url` and bring the schema up to date.
pub async fn connect(database_url: &str) -> TotpResult<DbPool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;
    run_migrations(&pool).await?;
    tracing::debug!(database_url, "TOTP table initialized");
    Ok(pool)
}

/// A private in-memory database. A single connection that is never recycled
/// keeps the data alive for the lifetime of the pool.
pub async fn connect_in_memory() -> TotpResult<DbPool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> TotpResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
