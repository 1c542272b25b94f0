use crate::domain::entities::MirrorSnapshot;
use crate::domain::value_objects::EntityKind;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

#[async_trait]
pub trait LocalMirror: Send + Sync {
    async fn upsert(&self, snapshot: &MirrorSnapshot) -> Result<(), AppError>;
    async fn get(&self, kind: EntityKind, key: &str) -> Result<Option<MirrorSnapshot>, AppError>;
    async fn list(&self, kind: EntityKind) -> Result<Vec<MirrorSnapshot>, AppError>;
    async fn remove(&self, kind: EntityKind, key: &str) -> Result<(), AppError>;
    /// Moves the entry at `from` to `to` in one transaction, overlaying
    /// `fields`. Returns `false` when nothing is stored under `from`.
    async fn rekey(
        &self,
        kind: EntityKind,
        from: &str,
        to: &str,
        fields: &Map<String, Value>,
    ) -> Result<bool, AppError>;
    async fn list_temporary_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<MirrorSnapshot>, AppError>;
    async fn active_session(&self) -> Result<Option<String>, AppError>;
    async fn set_active_session(&self, key: Option<&str>) -> Result<(), AppError>;
    async fn clear(&self) -> Result<(), AppError>;
}
