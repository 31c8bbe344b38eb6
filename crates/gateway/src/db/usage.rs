//! Usage-record repository.
//!
//! Queries use runtime binding rather than the `sqlx::query!` macros so the
//! crate builds without a live database.

use sqlx::PgPool;
use sqlx::Row;

use nextstep_core::{DayKey, Email, SubjectId};

use super::RepositoryError;

/// Repository for per-day usage counts.
pub struct UsageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UsageRepository<'a> {
    /// Create a new usage repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the recorded count for a subject on a given day.
    ///
    /// Returns 0 when no row exists: a missing record means no uses yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored count is negative.
    pub async fn day_count(
        &self,
        subject: &SubjectId,
        day: DayKey,
    ) -> Result<u32, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT count
            FROM feature_usage
            WHERE subject_id = $1 AND day = $2
            ",
        )
        .bind(subject.as_str())
        .bind(day.date())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => {
                let count: i32 = r.try_get("count")?;
                u32::try_from(count).map_err(|_| {
                    RepositoryError::DataCorruption(format!(
                        "negative usage count {count} for subject {subject} on {day}"
                    ))
                })
            }
            None => Ok(0),
        }
    }

    /// Record one use for a subject on a given day, creating the row if
    /// absent. Returns the new count.
    ///
    /// The increment is a single atomic upsert; callers decide separately
    /// whether the limit allows the use at all.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    /// Returns `RepositoryError::DataCorruption` if the resulting count is
    /// negative.
    pub async fn record_use(
        &self,
        subject: &SubjectId,
        email: &Email,
        day: DayKey,
    ) -> Result<u32, RepositoryError> {
        let row = sqlx::query(
            r"
            INSERT INTO feature_usage (subject_id, day, count, email, updated_at)
            VALUES ($1, $2, 1, $3, now())
            ON CONFLICT (subject_id, day)
            DO UPDATE SET count = feature_usage.count + 1, updated_at = now()
            RETURNING count
            ",
        )
        .bind(subject.as_str())
        .bind(day.date())
        .bind(email.as_str())
        .fetch_one(self.pool)
        .await?;

        let count: i32 = row.try_get("count")?;
        u32::try_from(count).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative usage count {count} for subject {subject} on {day}"
            ))
        })
    }
}
