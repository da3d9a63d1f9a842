//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::entities::{DownloadTracker, Observation, opens_window};
use crate::domain::repository::{DownloadCounterRepository, TrackerRepository};
use crate::domain::value_objects::Slug;
use crate::error::{DownloadError, DownloadResult};

/// Insert races can only repeat while a sweep keeps deleting the row
const OBSERVE_ATTEMPTS: usize = 3;

/// PostgreSQL-backed repository
///
/// Trackers live in `download_trackers`; counters are columns of the
/// catalog's `mod_versions` and `launcher_versions` tables.
#[derive(Clone)]
pub struct PgDownloadRepository {
    pool: PgPool,
}

impl PgDownloadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Clean up expired trackers
    pub async fn cleanup_expired(&self) -> DownloadResult<u64> {
        self.sweep_expired(Utc::now()).await
    }
}

impl TrackerRepository for PgDownloadRepository {
    async fn observe(&self, tracker: &DownloadTracker) -> DownloadResult<Observation> {
        for _ in 0..OBSERVE_ATTEMPTS {
            let mut tx = self.pool.begin().await?;

            // The row lock serialises observers of one pair; after waiting,
            // the latest committed expiry is returned.
            let previous = sqlx::query_scalar::<_, DateTime<Utc>>(
                r#"
                SELECT expires_at
                FROM download_trackers
                WHERE path = $1 AND ip_hash = $2
                FOR UPDATE
                "#,
            )
            .bind(&tracker.path)
            .bind(tracker.ip_hash.as_str())
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(previous) = previous {
                sqlx::query(
                    r#"
                    UPDATE download_trackers
                    SET expires_at = GREATEST(expires_at, $3)
                    WHERE path = $1 AND ip_hash = $2
                    "#,
                )
                .bind(&tracker.path)
                .bind(tracker.ip_hash.as_str())
                .bind(tracker.expires_at)
                .execute(&mut *tx)
                .await?;
                tx.commit().await?;

                return Ok(Observation {
                    is_fresh_download: opens_window(Some(previous), tracker.observed_at),
                });
            }

            let inserted = sqlx::query(
                r#"
                INSERT INTO download_trackers (path, ip_hash, expires_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (path, ip_hash) DO NOTHING
                "#,
            )
            .bind(&tracker.path)
            .bind(tracker.ip_hash.as_str())
            .bind(tracker.expires_at)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if inserted == 1 {
                tx.commit().await?;
                return Ok(Observation {
                    is_fresh_download: true,
                });
            }

            // A concurrent first visit inserted the row; observe it again
            tx.rollback().await?;
        }

        Err(DownloadError::Internal(format!(
            "tracker for {} still contended after {} attempts",
            tracker.path, OBSERVE_ATTEMPTS
        )))
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> DownloadResult<u64> {
        let deleted = sqlx::query("DELETE FROM download_trackers WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

impl DownloadCounterRepository for PgDownloadRepository {
    async fn increment_mod_version(
        &self,
        mod_slug: &Slug,
        version_slug: &Slug,
    ) -> DownloadResult<u64> {
        let updated = sqlx::query(
            r#"
            UPDATE mod_versions AS v
            SET download_count = v.download_count + 1
            FROM mods AS m
            WHERE v.mod_id = m.id
              AND m.slug = $1
              AND v.slug = $2
            "#,
        )
        .bind(mod_slug.as_str())
        .bind(version_slug.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated)
    }

    async fn increment_launcher_version(&self, version_slug: &Slug) -> DownloadResult<u64> {
        let updated = sqlx::query(
            r#"
            UPDATE launcher_versions
            SET download_count = download_count + 1
            WHERE slug = $1
            "#,
        )
        .bind(version_slug.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated)
    }
}
