//! In-memory port implementations for service tests.

use crate::application::ports::{ActionLog, LocalMirror, ReplayLease};
use crate::domain::entities::{ActionPayload, MirrorSnapshot, PendingAction};
use crate::domain::value_objects::{ActionId, EntityKind};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct InMemoryActionLog {
    next_id: Mutex<i64>,
    actions: Mutex<BTreeMap<i64, PendingAction>>,
    pub fail_enqueue: Mutex<bool>,
    pub payload_updates: Mutex<Vec<(i64, ActionPayload)>>,
}

impl InMemoryActionLog {
    pub fn snapshot(&self) -> Vec<PendingAction> {
        self.actions.lock().unwrap().values().cloned().collect()
    }

    pub fn payload_of(&self, id: ActionId) -> Option<ActionPayload> {
        self.actions
            .lock()
            .unwrap()
            .get(&id.value())
            .map(|action| action.payload.clone())
    }
}

#[async_trait]
impl ActionLog for InMemoryActionLog {
    async fn enqueue(
        &self,
        payload: &ActionPayload,
        timestamp: i64,
    ) -> Result<PendingAction, AppError> {
        if *self.fail_enqueue.lock().unwrap() {
            return Err(AppError::Storage("disk full".into()));
        }
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let id = ActionId::new(*next).map_err(AppError::Internal)?;
        let action = PendingAction::new(payload.clone(), timestamp).with_id(id);
        self.actions.lock().unwrap().insert(*next, action.clone());
        Ok(action)
    }

    async fn list_unsynced(&self) -> Result<Vec<PendingAction>, AppError> {
        Ok(self
            .actions
            .lock()
            .unwrap()
            .values()
            .filter(|action| !action.synced && !action.is_quarantined())
            .cloned()
            .collect())
    }

    async fn get(&self, id: ActionId) -> Result<Option<PendingAction>, AppError> {
        Ok(self.actions.lock().unwrap().get(&id.value()).cloned())
    }

    async fn update_payload(&self, id: ActionId, payload: &ActionPayload) -> Result<(), AppError> {
        if let Some(action) = self.actions.lock().unwrap().get_mut(&id.value()) {
            action.payload = payload.clone();
        }
        self.payload_updates
            .lock()
            .unwrap()
            .push((id.value(), payload.clone()));
        Ok(())
    }

    async fn remove(&self, id: ActionId) -> Result<(), AppError> {
        self.actions.lock().unwrap().remove(&id.value());
        Ok(())
    }

    async fn count_unsynced(&self) -> Result<u32, AppError> {
        Ok(self.list_unsynced().await?.len() as u32)
    }

    async fn record_failure(&self, id: ActionId, message: &str) -> Result<u32, AppError> {
        let mut actions = self.actions.lock().unwrap();
        let action = actions
            .get_mut(&id.value())
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        action.attempts += 1;
        action.last_error = Some(message.to_string());
        Ok(action.attempts)
    }

    async fn quarantine(&self, ids: &[ActionId], at: i64) -> Result<(), AppError> {
        let mut actions = self.actions.lock().unwrap();
        for id in ids {
            if let Some(action) = actions.get_mut(&id.value()) {
                action.quarantined_at = Some(at);
            }
        }
        Ok(())
    }

    async fn list_quarantined(&self) -> Result<Vec<PendingAction>, AppError> {
        Ok(self
            .actions
            .lock()
            .unwrap()
            .values()
            .filter(|action| action.is_quarantined())
            .cloned()
            .collect())
    }

    async fn requeue(&self, id: ActionId) -> Result<bool, AppError> {
        let mut actions = self.actions.lock().unwrap();
        match actions.get_mut(&id.value()) {
            Some(action) if action.is_quarantined() => {
                action.quarantined_at = None;
                action.attempts = 0;
                action.last_error = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear(&self) -> Result<(), AppError> {
        self.actions.lock().unwrap().clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMirror {
    entries: Mutex<BTreeMap<(EntityKind, String), MirrorSnapshot>>,
    active: Mutex<Option<String>>,
}

#[async_trait]
impl LocalMirror for InMemoryMirror {
    async fn upsert(&self, snapshot: &MirrorSnapshot) -> Result<(), AppError> {
        self.entries
            .lock()
            .unwrap()
            .insert((snapshot.kind, snapshot.key.clone()), snapshot.clone());
        Ok(())
    }

    async fn get(&self, kind: EntityKind, key: &str) -> Result<Option<MirrorSnapshot>, AppError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&(kind, key.to_string()))
            .cloned())
    }

    async fn list(&self, kind: EntityKind) -> Result<Vec<MirrorSnapshot>, AppError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .filter(|snapshot| snapshot.kind == kind)
            .cloned()
            .collect())
    }

    async fn remove(&self, kind: EntityKind, key: &str) -> Result<(), AppError> {
        self.entries.lock().unwrap().remove(&(kind, key.to_string()));
        Ok(())
    }

    async fn rekey(
        &self,
        kind: EntityKind,
        from: &str,
        to: &str,
        fields: &Map<String, Value>,
    ) -> Result<bool, AppError> {
        let mut entries = self.entries.lock().unwrap();
        let Some(mut snapshot) = entries.remove(&(kind, from.to_string())) else {
            return Ok(false);
        };
        snapshot.key = to.to_string();
        snapshot.is_temporary = false;
        snapshot.merge(fields);
        entries.insert((kind, to.to_string()), snapshot);
        Ok(true)
    }

    async fn list_temporary_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<MirrorSnapshot>, AppError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .filter(|snapshot| snapshot.is_temporary && snapshot.updated_at < cutoff)
            .cloned()
            .collect())
    }

    async fn active_session(&self) -> Result<Option<String>, AppError> {
        Ok(self.active.lock().unwrap().clone())
    }

    async fn set_active_session(&self, key: Option<&str>) -> Result<(), AppError> {
        *self.active.lock().unwrap() = key.map(str::to_string);
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        self.entries.lock().unwrap().clear();
        *self.active.lock().unwrap() = None;
        Ok(())
    }
}

/// Lease that is always held by someone else.
pub struct BusyLease;

#[async_trait]
impl ReplayLease for BusyLease {
    async fn try_acquire(&self, _holder: &str, _ttl: Duration) -> Result<bool, AppError> {
        Ok(false)
    }

    async fn release(&self, _holder: &str) -> Result<(), AppError> {
        Ok(())
    }
}

/// Lease with a real expiry, keyed by holder.
#[derive(Default)]
pub struct ExpiringLease {
    held: Mutex<Option<(String, Instant)>>,
}

#[async_trait]
impl ReplayLease for ExpiringLease {
    async fn try_acquire(&self, holder: &str, ttl: Duration) -> Result<bool, AppError> {
        let mut held = self.held.lock().unwrap();
        let now = Instant::now();
        if let Some((owner, expires_at)) = held.as_ref() {
            if owner != holder && *expires_at > now {
                return Ok(false);
            }
        }
        *held = Some((holder.to_string(), now + ttl));
        Ok(true)
    }

    async fn release(&self, holder: &str) -> Result<(), AppError> {
        let mut held = self.held.lock().unwrap();
        if held.as_ref().is_some_and(|(owner, _)| owner == holder) {
            *held = None;
        }
        Ok(())
    }
}
