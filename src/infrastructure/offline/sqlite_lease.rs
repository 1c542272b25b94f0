use crate::application::ports::ReplayLease;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use std::time::Duration;

const LEASE_NAME: &str = "replay";

/// Replay lease stored in the shared database so that separate processes
/// on one database never drain the log at the same time.
pub struct SqliteReplayLease {
    pool: Pool<Sqlite>,
}

impl SqliteReplayLease {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReplayLease for SqliteReplayLease {
    async fn try_acquire(&self, holder: &str, ttl: Duration) -> Result<bool, AppError> {
        let now = Utc::now().timestamp_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl_ms);

        let result = sqlx::query(
            r#"
            INSERT INTO replay_lease (name, holder, expires_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
                holder = excluded.holder,
                expires_at = excluded.expires_at
            WHERE replay_lease.holder = excluded.holder OR replay_lease.expires_at < ?4
            "#,
        )
        .bind(LEASE_NAME)
        .bind(holder)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn release(&self, holder: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM replay_lease WHERE name = ?1 AND holder = ?2")
            .bind(LEASE_NAME)
            .bind(holder)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
