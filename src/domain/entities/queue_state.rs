use super::EntityRef;
use crate::domain::value_objects::ActionId;
use serde::{Deserialize, Serialize};

/// Observable queue state for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    pub is_online: bool,
    pub is_syncing: bool,
    pub pending_count: u32,
}

/// Returned once an action is durably queued (not synced).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedAction {
    pub id: ActionId,
    pub placeholder: Option<EntityRef>,
    pub timestamp: i64,
}

/// User-facing sync notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum SyncNotice {
    SavedOffline { action_id: i64 },
    WentOffline,
    BackOnlineSyncing { pending: u32 },
    SyncComplete { replayed: u32 },
    SyncFailed { message: String, remaining: u32 },
    Quarantined { action_ids: Vec<i64> },
}

impl SyncNotice {
    pub fn message(&self) -> String {
        match self {
            SyncNotice::SavedOffline { .. } => "Saved offline".to_string(),
            SyncNotice::WentOffline => "You are offline. Changes will be saved locally".to_string(),
            SyncNotice::BackOnlineSyncing { pending } => {
                format!("Back online, syncing {pending} change(s)")
            }
            SyncNotice::SyncComplete { .. } => "Sync complete".to_string(),
            SyncNotice::SyncFailed { remaining, .. } => {
                format!("Sync failed, will retry ({remaining} pending)")
            }
            SyncNotice::Quarantined { action_ids } => {
                format!("{} change(s) could not be synced and were set aside", action_ids.len())
            }
        }
    }
}
