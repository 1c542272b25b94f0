use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingActionRow {
    pub id: i64,
    pub action_type: String,
    pub payload: String,
    pub timestamp: i64,
    pub synced: bool,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub quarantined_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MirrorEntityRow {
    pub entity_kind: String,
    pub entity_key: String,
    pub data: String,
    pub is_temporary: bool,
    pub updated_at: i64,
}
