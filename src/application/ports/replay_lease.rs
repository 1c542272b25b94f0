use crate::shared::error::AppError;
use async_trait::async_trait;
use std::time::Duration;

/// Cross-process exclusion for replay passes sharing one database.
#[async_trait]
pub trait ReplayLease: Send + Sync {
    async fn try_acquire(&self, holder: &str, ttl: Duration) -> Result<bool, AppError>;
    async fn release(&self, holder: &str) -> Result<(), AppError>;
}
