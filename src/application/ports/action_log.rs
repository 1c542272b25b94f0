use crate::domain::entities::{ActionPayload, PendingAction};
use crate::domain::value_objects::ActionId;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Durable log of mutations that the remote API has not confirmed yet.
#[async_trait]
pub trait ActionLog: Send + Sync {
    /// Appends an unsynced action. Fails with `AppError::Storage` when the
    /// local store rejects the write; the mutation is then not durable.
    async fn enqueue(
        &self,
        payload: &ActionPayload,
        timestamp: i64,
    ) -> Result<PendingAction, AppError>;
    /// Unsynced, non-quarantined actions in storage order.
    async fn list_unsynced(&self) -> Result<Vec<PendingAction>, AppError>;
    async fn get(&self, id: ActionId) -> Result<Option<PendingAction>, AppError>;
    async fn update_payload(&self, id: ActionId, payload: &ActionPayload) -> Result<(), AppError>;
    /// Idempotent.
    async fn remove(&self, id: ActionId) -> Result<(), AppError>;
    async fn count_unsynced(&self) -> Result<u32, AppError>;
    /// Bumps the attempt counter and returns the new value.
    async fn record_failure(&self, id: ActionId, message: &str) -> Result<u32, AppError>;
    async fn quarantine(&self, ids: &[ActionId], at: i64) -> Result<(), AppError>;
    async fn list_quarantined(&self) -> Result<Vec<PendingAction>, AppError>;
    /// Returns a quarantined action to the replay queue with a fresh attempt count.
    async fn requeue(&self, id: ActionId) -> Result<bool, AppError>;
    async fn clear(&self) -> Result<(), AppError>;
}
