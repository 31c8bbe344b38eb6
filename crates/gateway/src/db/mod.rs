//! Database operations for the gateway `PostgreSQL` instance.
//!
//! ## Tables
//!
//! - `feature_usage` - One row per `(subject_id, day)` with the day's gated
//!   call count. Rows are created lazily on the first consuming check of a
//!   day and never deleted, so prior days remain as history.
//! - `tower_sessions.session` - Session storage (created by
//!   `PostgresStore::migrate`).

pub mod usage;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value failed to round-trip through its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Create the usage table if it does not exist yet.
///
/// The schema is a single table, bootstrapped at startup instead of going
/// through a migration toolchain. Nothing reads `updated_at`; it is there
/// for operator queries.
///
/// # Errors
///
/// Returns `sqlx::Error` if the DDL statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS feature_usage (
            subject_id  TEXT        NOT NULL,
            day         DATE        NOT NULL,
            count       INTEGER     NOT NULL DEFAULT 0,
            email       TEXT        NOT NULL,
            updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
            PRIMARY KEY (subject_id, day)
        )
        ",
    )
    .execute(pool)
    .await?;

    Ok(())
}
