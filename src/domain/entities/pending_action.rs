use super::ActionPayload;
use crate::domain::value_objects::{ActionId, ActionKind};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingAction {
    pub id: Option<ActionId>,
    pub payload: ActionPayload,
    /// Creation time in epoch milliseconds; replay order.
    pub timestamp: i64,
    pub synced: bool,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub quarantined_at: Option<i64>,
}

impl PendingAction {
    pub fn new(payload: ActionPayload, timestamp: i64) -> Self {
        Self {
            id: None,
            payload,
            timestamp,
            synced: false,
            attempts: 0,
            last_error: None,
            quarantined_at: None,
        }
    }

    pub fn with_id(mut self, id: ActionId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.payload.kind()
    }

    pub fn is_quarantined(&self) -> bool {
        self.quarantined_at.is_some()
    }

    /// Replay order: timestamp, then insertion order for equal timestamps.
    pub fn replay_order(a: &PendingAction, b: &PendingAction) -> Ordering {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.id.map(i64::from).cmp(&b.id.map(i64::from)))
    }
}
