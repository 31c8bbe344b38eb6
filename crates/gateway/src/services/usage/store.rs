//! Usage store abstraction.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use nextstep_core::{DayKey, Email, SubjectId};

use crate::db::usage::UsageRepository;

/// The usage store could not serve a read or write.
///
/// The gate fails open on this, so there is deliberately no finer-grained
/// taxonomy: every store failure is handled the same way.
#[derive(Debug, Error)]
#[error("usage store unavailable: {0}")]
pub struct StoreError(pub String);

/// Per-day usage counts keyed by subject.
///
/// Behind a trait so the gate can be exercised in tests with failure
/// injection and without a database.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// The recorded count for `subject` on `day`; 0 when no record exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store is unreachable or errors.
    async fn day_count(&self, subject: &SubjectId, day: DayKey) -> Result<u32, StoreError>;

    /// Record one use for `subject` on `day`, creating the record if absent.
    /// Returns the new count.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store is unreachable or errors.
    async fn record_use(
        &self,
        subject: &SubjectId,
        email: &Email,
        day: DayKey,
    ) -> Result<u32, StoreError>;
}

/// `PostgreSQL`-backed usage store.
#[derive(Clone)]
pub struct PostgresUsageStore {
    pool: PgPool,
}

impl PostgresUsageStore {
    /// Create a new Postgres usage store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageStore for PostgresUsageStore {
    async fn day_count(&self, subject: &SubjectId, day: DayKey) -> Result<u32, StoreError> {
        UsageRepository::new(&self.pool)
            .day_count(subject, day)
            .await
            .map_err(|e| StoreError(e.to_string()))
    }

    async fn record_use(
        &self,
        subject: &SubjectId,
        email: &Email,
        day: DayKey,
    ) -> Result<u32, StoreError> {
        UsageRepository::new(&self.pool)
            .record_use(subject, email, day)
            .await
            .map_err(|e| StoreError(e.to_string()))
    }
}
