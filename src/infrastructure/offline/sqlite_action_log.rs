use super::mappers::{payload_columns, pending_action_from_row};
use super::rows::PendingActionRow;
use crate::application::ports::ActionLog;
use crate::domain::entities::{ActionPayload, PendingAction};
use crate::domain::value_objects::ActionId;
use crate::shared::error::AppError;
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

const SELECT_COLUMNS: &str = "SELECT id, action_type, payload, timestamp, synced, attempts, \
                              last_error, quarantined_at FROM pending_actions";

pub struct SqliteActionLog {
    pool: Pool<Sqlite>,
}

impl SqliteActionLog {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<PendingAction>, AppError> {
        let rows = sqlx::query_as::<_, PendingActionRow>(sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(pending_action_from_row).collect()
    }
}

#[async_trait]
impl ActionLog for SqliteActionLog {
    async fn enqueue(
        &self,
        payload: &ActionPayload,
        timestamp: i64,
    ) -> Result<PendingAction, AppError> {
        let (action_type, payload_json) = payload_columns(payload)?;

        let result = sqlx::query(
            r#"
            INSERT INTO pending_actions (action_type, payload, timestamp, synced, attempts)
            VALUES (?1, ?2, ?3, 0, 0)
            "#,
        )
        .bind(&action_type)
        .bind(&payload_json)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;

        let id = ActionId::new(result.last_insert_rowid()).map_err(AppError::Storage)?;
        Ok(PendingAction::new(payload.clone(), timestamp).with_id(id))
    }

    async fn list_unsynced(&self) -> Result<Vec<PendingAction>, AppError> {
        self.fetch(&format!(
            "{SELECT_COLUMNS} WHERE synced = 0 AND quarantined_at IS NULL"
        ))
        .await
    }

    async fn get(&self, id: ActionId) -> Result<Option<PendingAction>, AppError> {
        let row = sqlx::query_as::<_, PendingActionRow>(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?;
        row.map(pending_action_from_row).transpose()
    }

    async fn update_payload(&self, id: ActionId, payload: &ActionPayload) -> Result<(), AppError> {
        let (action_type, payload_json) = payload_columns(payload)?;
        sqlx::query("UPDATE pending_actions SET action_type = ?1, payload = ?2 WHERE id = ?3")
            .bind(&action_type)
            .bind(&payload_json)
            .bind(id.value())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove(&self, id: ActionId) -> Result<(), AppError> {
        sqlx::query("DELETE FROM pending_actions WHERE id = ?1")
            .bind(id.value())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_unsynced(&self) -> Result<u32, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pending_actions WHERE synced = 0 AND quarantined_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn record_failure(&self, id: ActionId, message: &str) -> Result<u32, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE pending_actions SET attempts = attempts + 1, last_error = ?1 WHERE id = ?2",
        )
        .bind(message)
        .bind(id.value())
        .execute(&mut *tx)
        .await?;
        let attempts: Option<i64> =
            sqlx::query_scalar("SELECT attempts FROM pending_actions WHERE id = ?1")
                .bind(id.value())
                .fetch_optional(&mut *tx)
                .await?;
        tx.commit().await?;

        let attempts =
            attempts.ok_or_else(|| AppError::NotFound(format!("Pending action {id}")))?;
        Ok(u32::try_from(attempts.max(0)).unwrap_or(u32::MAX))
    }

    async fn quarantine(&self, ids: &[ActionId], at: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("UPDATE pending_actions SET quarantined_at = ?1 WHERE id = ?2")
                .bind(at)
                .bind(id.value())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_quarantined(&self) -> Result<Vec<PendingAction>, AppError> {
        self.fetch(&format!(
            "{SELECT_COLUMNS} WHERE quarantined_at IS NOT NULL ORDER BY timestamp, id"
        ))
        .await
    }

    async fn requeue(&self, id: ActionId) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE pending_actions
            SET quarantined_at = NULL, attempts = 0, last_error = NULL
            WHERE id = ?1 AND quarantined_at IS NOT NULL
            "#,
        )
        .bind(id.value())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM pending_actions")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CreateBillingRatePayload, UpdateClientPayload};
    use crate::domain::value_objects::ClientId;
    use crate::infrastructure::database::ConnectionPool;
    use serde_json::{Map, json};

    async fn setup_log() -> SqliteActionLog {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        SqliteActionLog::new(pool.get_pool().clone())
    }

    fn rename(client_id: &str) -> ActionPayload {
        let mut fields = Map::new();
        fields.insert("name".into(), json!("Acme"));
        ActionPayload::UpdateClient(UpdateClientPayload {
            client_id: ClientId::new(client_id.to_string()).unwrap(),
            fields,
        })
    }

    #[tokio::test]
    async fn enqueue_then_list_round_trips_payload() {
        let log = setup_log().await;
        let saved = log.enqueue(&rename("cl_1"), 42).await.unwrap();

        let listed = log.list_unsynced().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, saved.id);
        assert_eq!(listed[0].payload, rename("cl_1"));
        assert_eq!(listed[0].timestamp, 42);
        assert_eq!(log.count_unsynced().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let log = setup_log().await;
        let id = log.enqueue(&rename("cl_1"), 1).await.unwrap().id.unwrap();

        log.remove(id).await.unwrap();
        log.remove(id).await.unwrap();
        assert_eq!(log.count_unsynced().await.unwrap(), 0);
        assert!(log.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_payload_persists_rewrite() {
        let log = setup_log().await;
        let original = ActionPayload::CreateBillingRate(CreateBillingRatePayload {
            client_id: ClientId::new("temp_1".into()).unwrap(),
            rate_type: "hourly".into(),
            amount: "50".into(),
            currency: None,
            is_default: false,
        });
        let id = log.enqueue(&original, 1).await.unwrap().id.unwrap();

        let mut rewritten = original.clone();
        if let ActionPayload::CreateBillingRate(p) = &mut rewritten {
            p.client_id = ClientId::new("cl_abc123".into()).unwrap();
        }
        log.update_payload(id, &rewritten).await.unwrap();

        assert_eq!(log.get(id).await.unwrap().unwrap().payload, rewritten);
    }

    #[tokio::test]
    async fn failures_quarantine_and_requeue() {
        let log = setup_log().await;
        let id = log.enqueue(&rename("cl_1"), 1).await.unwrap().id.unwrap();

        assert_eq!(log.record_failure(id, "500").await.unwrap(), 1);
        assert_eq!(log.record_failure(id, "502").await.unwrap(), 2);
        let stored = log.get(id).await.unwrap().unwrap();
        assert_eq!(stored.last_error.as_deref(), Some("502"));

        log.quarantine(&[id], 99).await.unwrap();
        assert!(log.list_unsynced().await.unwrap().is_empty());
        assert_eq!(log.count_unsynced().await.unwrap(), 0);
        let quarantined = log.list_quarantined().await.unwrap();
        assert_eq!(quarantined.len(), 1);
        assert_eq!(quarantined[0].quarantined_at, Some(99));

        assert!(log.requeue(id).await.unwrap());
        let restored = log.get(id).await.unwrap().unwrap();
        assert_eq!(restored.attempts, 0);
        assert!(restored.last_error.is_none());
        assert_eq!(log.count_unsynced().await.unwrap(), 1);
        assert!(!log.requeue(id).await.unwrap());
    }

    #[tokio::test]
    async fn record_failure_on_missing_action_is_not_found() {
        let log = setup_log().await;
        let missing = ActionId::new(404).unwrap();
        assert!(matches!(
            log.record_failure(missing, "x").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn corrupt_row_surfaces_deserialization_error() {
        let log = setup_log().await;
        sqlx::query(
            "INSERT INTO pending_actions (action_type, payload, timestamp) VALUES ('END_SESSION', 'not json', 1)",
        )
        .execute(&log.pool)
        .await
        .unwrap();

        assert!(matches!(
            log.list_unsynced().await,
            Err(AppError::DeserializationError(_))
        ));
    }
}
