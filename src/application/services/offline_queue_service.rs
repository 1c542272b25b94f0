use super::connectivity_monitor::ConnectivityMonitor;
use super::id_resolver::resolve_created;
use super::mirror_reconciler::MirrorReconciler;
use super::replay_engine::ReplayEngine;
use crate::application::ports::{ActionLog, LocalMirror, MutationDispatcher, SyncNotifier};
use crate::domain::entities::{
    ActionPayload, EntityRef, PendingAction, QueueState, QueuedAction, ReplayPhase, ReplayReport,
    ReplayStatus, Resolution, SyncNotice,
};
use crate::domain::value_objects::{ActionId, TemporaryIdGenerator};
use crate::shared::error::AppError;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const TARGET: &str = "offline::queue";

/// Outcome of [`OfflineQueueService::submit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Confirmed by the remote API right away.
    Applied { resolution: Option<Resolution> },
    /// Durably queued for a later replay pass.
    Queued(QueuedAction),
}

/// Front door for UI mutations: queues while offline, replays on reconnect
/// and publishes queue state.
pub struct OfflineQueueService {
    log: Arc<dyn ActionLog>,
    mirror: MirrorReconciler,
    dispatcher: Arc<dyn MutationDispatcher>,
    engine: Arc<ReplayEngine>,
    connectivity: Arc<ConnectivityMonitor>,
    notifier: Option<Arc<dyn SyncNotifier>>,
    state: watch::Sender<QueueState>,
    temp_ids: TemporaryIdGenerator,
    auto_sync: bool,
    mirror_ttl: Option<chrono::Duration>,
}

impl OfflineQueueService {
    pub fn new(
        engine: Arc<ReplayEngine>,
        log: Arc<dyn ActionLog>,
        mirror: Arc<dyn LocalMirror>,
        dispatcher: Arc<dyn MutationDispatcher>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        let (state, _) = watch::channel(QueueState {
            is_online: connectivity.is_online(),
            is_syncing: false,
            pending_count: 0,
        });
        Self {
            log,
            mirror: MirrorReconciler::new(mirror),
            dispatcher,
            engine,
            connectivity,
            notifier: None,
            state,
            temp_ids: TemporaryIdGenerator::new(),
            auto_sync: true,
            mirror_ttl: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn SyncNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_auto_sync(mut self, auto_sync: bool) -> Self {
        self.auto_sync = auto_sync;
        self
    }

    /// Enables pruning of temporary mirror entries older than `ttl` after
    /// each clean pass.
    pub fn with_mirror_ttl(mut self, ttl: Option<chrono::Duration>) -> Self {
        self.mirror_ttl = ttl;
        self
    }

    pub fn state(&self) -> QueueState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueueState> {
        self.state.subscribe()
    }

    pub fn engine(&self) -> Arc<ReplayEngine> {
        Arc::clone(&self.engine)
    }

    /// Loads the persisted pending count and the newest stored timestamp;
    /// call once before `start`.
    pub async fn initialize(&self) -> Result<QueueState, AppError> {
        let mut stored = self.log.list_unsynced().await?;
        stored.extend(self.log.list_quarantined().await?);
        if let Some(newest) = stored.iter().map(|action| action.timestamp).max() {
            self.temp_ids.observe(newest);
        }
        self.refresh_pending_count().await?;
        Ok(self.state())
    }

    /// Durably records a mutation for later replay and applies it to the
    /// mirror. Fails only when the log write fails.
    pub async fn queue_action(&self, payload: ActionPayload) -> Result<QueuedAction, AppError> {
        let mut payload = payload;
        let placeholder = payload.assign_placeholder(&self.temp_ids);
        let timestamp = self.temp_ids.next_millis();

        let action = self.log.enqueue(&payload, timestamp).await.map_err(|err| {
            tracing::error!(
                target: TARGET,
                kind = %payload.kind(),
                error = %err,
                "failed to persist offline action"
            );
            err
        })?;
        let id = action
            .id
            .ok_or_else(|| AppError::Internal("Enqueued action without id".to_string()))?;

        if let Err(err) = self.mirror.apply_optimistic(&action).await {
            tracing::warn!(
                target: TARGET,
                action_id = %id,
                error = %err,
                "failed to apply optimistic mirror update"
            );
        }
        if let Err(err) = self.refresh_pending_count().await {
            tracing::warn!(target: TARGET, error = %err, "failed to refresh pending count");
        }

        tracing::info!(
            target: TARGET,
            action_id = %id,
            kind = %action.kind(),
            placeholder = ?placeholder.as_ref().map(EntityRef::key),
            "action saved offline"
        );
        self.emit(SyncNotice::SavedOffline {
            action_id: id.value(),
        });

        Ok(QueuedAction {
            id,
            placeholder,
            timestamp,
        })
    }

    /// Sends the mutation straight to the remote API when online with an
    /// empty queue; otherwise queues it. Going direct while actions are
    /// pending would let this mutation overtake them.
    pub async fn submit(&self, payload: ActionPayload) -> Result<SubmitOutcome, AppError> {
        let can_go_direct = self.connectivity.is_online()
            && self.engine.phase() == ReplayPhase::Idle
            && self.log.count_unsynced().await? == 0;
        if !can_go_direct {
            return self.queue_action(payload).await.map(SubmitOutcome::Queued);
        }

        let mut payload = payload;
        payload.assign_placeholder(&self.temp_ids);
        let action = PendingAction::new(payload, self.temp_ids.next_millis());

        let body = self.dispatcher.dispatch(&action).await?;
        let resolved = resolve_created(&action.payload, body.as_ref())?;

        let mirrored = match self.mirror.apply_optimistic(&action).await {
            Ok(()) => match &resolved {
                Some(resolved) => self.mirror.confirm_created(resolved).await,
                None => Ok(()),
            },
            Err(err) => Err(err),
        };
        if let Err(err) = mirrored {
            tracing::warn!(
                target: TARGET,
                kind = %action.kind(),
                error = %err,
                "failed to mirror confirmed mutation"
            );
        }

        Ok(SubmitOutcome::Applied {
            resolution: resolved.map(|resolved| resolved.resolution),
        })
    }

    /// Runs one replay pass and publishes its outcome.
    pub async fn sync_now(&self) -> Result<ReplayReport, AppError> {
        self.state.send_modify(|state| state.is_syncing = true);
        let result = self.engine.run_pass().await;

        if let Err(err) = self.refresh_pending_count().await {
            tracing::warn!(target: TARGET, error = %err, "failed to refresh pending count");
        }

        match &result {
            Ok(report) => {
                self.publish_report(report);
                if report.is_complete() {
                    self.prune_after_pass().await;
                }
            }
            Err(err) => {
                tracing::error!(target: TARGET, error = %err, "replay pass failed");
                self.emit(SyncNotice::SyncFailed {
                    message: err.to_string(),
                    remaining: self.state().pending_count,
                });
            }
        }

        // A skipped call must not clear the flag of the pass still running.
        let still_draining = self.engine.phase() == ReplayPhase::Draining;
        self.state
            .send_modify(|state| state.is_syncing = still_draining);
        result
    }

    pub async fn quarantined(&self) -> Result<Vec<PendingAction>, AppError> {
        self.log.list_quarantined().await
    }

    /// Returns a quarantined action to the queue.
    pub async fn requeue(&self, id: ActionId) -> Result<bool, AppError> {
        let requeued = self.log.requeue(id).await?;
        if requeued {
            tracing::info!(target: TARGET, action_id = %id, "quarantined action requeued");
            self.refresh_pending_count().await?;
        }
        Ok(requeued)
    }

    /// Deletes temporary mirror entries older than `max_age` that no queued
    /// or quarantined action still refers to.
    pub async fn prune_mirror(&self, max_age: chrono::Duration) -> Result<u32, AppError> {
        let cutoff = Utc::now() - max_age;
        let stale = self.mirror.store().list_temporary_before(cutoff).await?;
        if stale.is_empty() {
            return Ok(0);
        }

        let mut live: HashSet<(String, String)> = HashSet::new();
        let mut actions = self.log.list_unsynced().await?;
        actions.extend(self.log.list_quarantined().await?);
        for action in &actions {
            for entity in action
                .payload
                .temp_ref()
                .into_iter()
                .chain(action.payload.references())
            {
                live.insert((entity.kind().to_string(), entity.key()));
            }
        }

        let mut removed = 0u32;
        for snapshot in stale {
            if live.contains(&(snapshot.kind.to_string(), snapshot.key.clone())) {
                continue;
            }
            self.mirror.store().remove(snapshot.kind, &snapshot.key).await?;
            removed += 1;
        }

        if removed > 0 {
            tracing::info!(target: "offline::mirror", removed, "pruned orphaned temporary entries");
        }
        Ok(removed)
    }

    /// Follows connectivity: replays once at startup when online and on
    /// every offline → online transition.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let mut online_rx = service.connectivity.subscribe();
        tokio::spawn(async move {
            let online = *online_rx.borrow_and_update();
            service.state.send_modify(|state| state.is_online = online);
            if online && service.auto_sync {
                service.replay_in_background("startup").await;
            }

            while online_rx.changed().await.is_ok() {
                let online = *online_rx.borrow_and_update();
                let was_online = service.state().is_online;
                service.state.send_modify(|state| state.is_online = online);
                if online == was_online {
                    continue;
                }

                if online {
                    let pending = service.state().pending_count;
                    service.emit(SyncNotice::BackOnlineSyncing { pending });
                    if service.auto_sync {
                        service.replay_in_background("reconnect").await;
                    }
                } else {
                    service.emit(SyncNotice::WentOffline);
                }
            }
        })
    }

    async fn replay_in_background(&self, reason: &str) {
        tracing::debug!(target: TARGET, reason, "triggering replay");
        if let Err(err) = self.sync_now().await {
            tracing::warn!(target: TARGET, reason, error = %err, "automatic replay failed");
        }
    }

    fn publish_report(&self, report: &ReplayReport) {
        if !report.quarantined.is_empty() {
            self.emit(SyncNotice::Quarantined {
                action_ids: report.quarantined.clone(),
            });
        }
        match &report.status {
            ReplayStatus::Completed if report.replayed > 0 && report.remaining == 0 => {
                self.emit(SyncNotice::SyncComplete {
                    replayed: report.replayed,
                });
            }
            ReplayStatus::Blocked => {
                self.emit(SyncNotice::SyncFailed {
                    message: report.error.clone().unwrap_or_default(),
                    remaining: report.remaining,
                });
            }
            _ => {}
        }
    }

    async fn prune_after_pass(&self) {
        let Some(ttl) = self.mirror_ttl else {
            return;
        };
        if let Err(err) = self.prune_mirror(ttl).await {
            tracing::warn!(target: "offline::mirror", error = %err, "mirror pruning failed");
        }
    }

    async fn refresh_pending_count(&self) -> Result<(), AppError> {
        let pending = self.log.count_unsynced().await?;
        self.state.send_modify(|state| state.pending_count = pending);
        Ok(())
    }

    fn emit(&self, notice: SyncNotice) {
        if let Some(notifier) = &self.notifier {
            if let Err(err) = notifier.emit(&notice) {
                tracing::warn!(
                    target: TARGET,
                    error = %err,
                    "failed to emit sync notice"
                );
            }
        }
    }
}
