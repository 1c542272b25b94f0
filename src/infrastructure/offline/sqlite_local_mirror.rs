use super::mappers::{mirror_snapshot_from_row, parse_object};
use super::rows::MirrorEntityRow;
use crate::application::ports::LocalMirror;
use crate::domain::entities::MirrorSnapshot;
use crate::domain::value_objects::EntityKind;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{Pool, Sqlite};

const UPSERT_SQL: &str = r#"
    INSERT INTO mirror_entities (entity_kind, entity_key, data, is_temporary, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(entity_kind, entity_key) DO UPDATE SET
        data = excluded.data,
        is_temporary = excluded.is_temporary,
        updated_at = excluded.updated_at
"#;

pub struct SqliteLocalMirror {
    pool: Pool<Sqlite>,
}

impl SqliteLocalMirror {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocalMirror for SqliteLocalMirror {
    async fn upsert(&self, snapshot: &MirrorSnapshot) -> Result<(), AppError> {
        let data = serde_json::to_string(&snapshot.data)?;
        sqlx::query(UPSERT_SQL)
            .bind(snapshot.kind.as_str())
            .bind(&snapshot.key)
            .bind(&data)
            .bind(snapshot.is_temporary)
            .bind(snapshot.updated_at.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, kind: EntityKind, key: &str) -> Result<Option<MirrorSnapshot>, AppError> {
        let row = sqlx::query_as::<_, MirrorEntityRow>(
            "SELECT * FROM mirror_entities WHERE entity_kind = ?1 AND entity_key = ?2",
        )
        .bind(kind.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        row.map(mirror_snapshot_from_row).transpose()
    }

    async fn list(&self, kind: EntityKind) -> Result<Vec<MirrorSnapshot>, AppError> {
        let rows = sqlx::query_as::<_, MirrorEntityRow>(
            "SELECT * FROM mirror_entities WHERE entity_kind = ?1 ORDER BY updated_at",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(mirror_snapshot_from_row).collect()
    }

    async fn remove(&self, kind: EntityKind, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM mirror_entities WHERE entity_kind = ?1 AND entity_key = ?2")
            .bind(kind.as_str())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn rekey(
        &self,
        kind: EntityKind,
        from: &str,
        to: &str,
        fields: &Map<String, Value>,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let source: Option<String> = sqlx::query_scalar(
            "SELECT data FROM mirror_entities WHERE entity_kind = ?1 AND entity_key = ?2",
        )
        .bind(kind.as_str())
        .bind(from)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(source) = source else {
            tx.rollback().await?;
            return Ok(false);
        };
        let existing: Option<String> = sqlx::query_scalar(
            "SELECT data FROM mirror_entities WHERE entity_kind = ?1 AND entity_key = ?2",
        )
        .bind(kind.as_str())
        .bind(to)
        .fetch_optional(&mut *tx)
        .await?;

        // target row (if any) < placeholder row < server fields
        let mut merged = match existing {
            Some(raw) => parse_object(&raw).map_err(AppError::DeserializationError)?,
            None => Map::new(),
        };
        merged.extend(parse_object(&source).map_err(AppError::DeserializationError)?);
        merged.extend(fields.clone());

        sqlx::query("DELETE FROM mirror_entities WHERE entity_kind = ?1 AND entity_key = ?2")
            .bind(kind.as_str())
            .bind(from)
            .execute(&mut *tx)
            .await?;
        sqlx::query(UPSERT_SQL)
            .bind(kind.as_str())
            .bind(to)
            .bind(serde_json::to_string(&merged)?)
            .bind(false)
            .bind(Utc::now().timestamp_millis())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_temporary_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<MirrorSnapshot>, AppError> {
        let rows = sqlx::query_as::<_, MirrorEntityRow>(
            "SELECT * FROM mirror_entities WHERE is_temporary = 1 AND updated_at < ?1",
        )
        .bind(cutoff.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(mirror_snapshot_from_row).collect()
    }

    async fn active_session(&self) -> Result<Option<String>, AppError> {
        let key: Option<String> = sqlx::query_scalar("SELECT session_key FROM active_session WHERE slot = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(key)
    }

    async fn set_active_session(&self, key: Option<&str>) -> Result<(), AppError> {
        match key {
            Some(key) => {
                sqlx::query(
                    r#"
                    INSERT INTO active_session (slot, session_key, updated_at)
                    VALUES (1, ?1, ?2)
                    ON CONFLICT(slot) DO UPDATE SET
                        session_key = excluded.session_key,
                        updated_at = excluded.updated_at
                    "#,
                )
                .bind(key)
                .bind(Utc::now().timestamp_millis())
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM active_session")
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM mirror_entities")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM active_session")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
