use crate::domain::entities::PendingAction;
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// Sends one queued action to the remote API.
#[async_trait]
pub trait MutationDispatcher: Send + Sync {
    /// Returns the decoded response body for create kinds and `None` for
    /// kinds whose response carries nothing the engine needs.
    async fn dispatch(&self, action: &PendingAction) -> Result<Option<Value>, AppError>;
}
