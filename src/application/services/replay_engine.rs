use super::connectivity_monitor::ConnectivityMonitor;
use super::id_resolver::{IdResolver, resolve_created};
use super::mirror_reconciler::MirrorReconciler;
use crate::application::ports::{ActionLog, LocalMirror, MutationDispatcher, ReplayLease};
use crate::domain::entities::{
    EntityRef, PendingAction, ReplayPhase, ReplayReport, ReplayStatus, ResolvedEntity,
    SkipReason,
};
use crate::domain::value_objects::ActionId;
use crate::shared::error::AppError;
use crate::shared::metrics::{PassOutcome, ReplayMetrics, ReplayMetricsSnapshot};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

const TARGET: &str = "offline::replay";

#[derive(Debug, Clone)]
pub struct ReplayPolicy {
    /// Attempts after which a failing head action and its dependents are set
    /// aside. `None` blocks the queue until the action succeeds.
    pub quarantine_after: Option<u32>,
    pub lease_ttl: Duration,
}

impl Default for ReplayPolicy {
    fn default() -> Self {
        Self {
            quarantine_after: None,
            lease_ttl: Duration::from_secs(120),
        }
    }
}

struct DrainingFlag<'a>(&'a AtomicBool);

impl<'a> DrainingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for DrainingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drains the action log against the remote API in creation order.
pub struct ReplayEngine {
    log: Arc<dyn ActionLog>,
    mirror: MirrorReconciler,
    dispatcher: Arc<dyn MutationDispatcher>,
    connectivity: Arc<ConnectivityMonitor>,
    lease: Option<Arc<dyn ReplayLease>>,
    holder: String,
    policy: ReplayPolicy,
    gate: Mutex<()>,
    draining: AtomicBool,
    metrics: ReplayMetrics,
}

impl ReplayEngine {
    pub fn new(
        log: Arc<dyn ActionLog>,
        mirror: Arc<dyn LocalMirror>,
        dispatcher: Arc<dyn MutationDispatcher>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            log,
            mirror: MirrorReconciler::new(mirror),
            dispatcher,
            connectivity,
            lease: None,
            holder: Uuid::new_v4().to_string(),
            policy: ReplayPolicy::default(),
            gate: Mutex::new(()),
            draining: AtomicBool::new(false),
            metrics: ReplayMetrics::new(),
        }
    }

    pub fn with_policy(mut self, policy: ReplayPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_lease(mut self, lease: Arc<dyn ReplayLease>) -> Self {
        self.lease = Some(lease);
        self
    }

    pub fn phase(&self) -> ReplayPhase {
        if self.draining.load(Ordering::SeqCst) {
            ReplayPhase::Draining
        } else {
            ReplayPhase::Idle
        }
    }

    pub fn metrics(&self) -> ReplayMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Runs one replay pass. Concurrent callers get a `Skipped` report while a
    /// pass is in flight; they never start a second one.
    pub async fn run_pass(&self) -> Result<ReplayReport, AppError> {
        let Ok(_gate) = self.gate.try_lock() else {
            debug!(target: TARGET, "replay pass already in flight");
            return self.skip(SkipReason::AlreadyDraining).await;
        };
        let _draining = DrainingFlag::raise(&self.draining);

        if !self.connectivity.is_online() {
            debug!(target: TARGET, "offline, replay deferred");
            return self.skip(SkipReason::Offline).await;
        }

        if let Some(lease) = &self.lease {
            if !lease.try_acquire(&self.holder, self.policy.lease_ttl).await? {
                info!(target: TARGET, "replay lease held by another process");
                return self.skip(SkipReason::LeaseHeld).await;
            }
        }

        let result = self.drain().await;

        if let Some(lease) = &self.lease {
            if let Err(err) = lease.release(&self.holder).await {
                warn!(target: TARGET, error = %err, "failed to release replay lease");
            }
        }

        match &result {
            Ok(report) => {
                let outcome = if report.is_blocked() {
                    PassOutcome::Blocked
                } else {
                    PassOutcome::Completed
                };
                self.metrics
                    .record(outcome, report.replayed, report.error.as_deref());
            }
            Err(err) => {
                let message = err.to_string();
                self.metrics.record(PassOutcome::Blocked, 0, Some(&message));
            }
        }
        result
    }

    async fn skip(&self, reason: SkipReason) -> Result<ReplayReport, AppError> {
        self.metrics.record(PassOutcome::Skipped, 0, None);
        let remaining = self.log.count_unsynced().await?;
        Ok(ReplayReport::skipped(reason, remaining))
    }

    async fn drain(&self) -> Result<ReplayReport, AppError> {
        let mut queue = self.log.list_unsynced().await?;
        queue.sort_by(PendingAction::replay_order);

        let mut report = ReplayReport {
            status: ReplayStatus::Completed,
            replayed: 0,
            remaining: 0,
            resolutions: Vec::new(),
            quarantined: Vec::new(),
            error: None,
        };
        if queue.is_empty() {
            return Ok(report);
        }

        info!(target: TARGET, pending = queue.len(), "replay pass started");
        let mut resolver = IdResolver::new();

        for index in 0..queue.len() {
            if !self.renew_lease().await? {
                warn!(
                    target: TARGET,
                    replayed = report.replayed,
                    "replay lease lost, stopping pass"
                );
                report.status = ReplayStatus::Blocked;
                report.error = Some("Replay lease lost to another process".to_string());
                break;
            }

            let (done, rest) = queue.split_at_mut(index + 1);
            let action = &mut done[index];

            match self.replay_one(&mut resolver, action, rest).await {
                Ok(resolved) => {
                    report.replayed += 1;
                    if let Some(resolved) = resolved {
                        report.resolutions.push(resolved.resolution);
                    }
                }
                Err(err) => {
                    warn!(
                        target: TARGET,
                        action_id = ?action.id.map(i64::from),
                        kind = %action.kind(),
                        error = %err,
                        "replay blocked"
                    );
                    report.status = ReplayStatus::Blocked;
                    report.error = Some(err.to_string());
                    report.quarantined = self.handle_failure(action, rest, &err).await;
                    break;
                }
            }
        }

        report.remaining = self.log.count_unsynced().await?;
        info!(
            target: TARGET,
            replayed = report.replayed,
            remaining = report.remaining,
            blocked = report.is_blocked(),
            "replay pass finished"
        );
        Ok(report)
    }

    async fn replay_one(
        &self,
        resolver: &mut IdResolver,
        action: &mut PendingAction,
        rest: &mut [PendingAction],
    ) -> Result<Option<ResolvedEntity>, AppError> {
        let id = action
            .id
            .ok_or_else(|| AppError::Internal("Stored action without id".to_string()))?;

        if resolver.apply(&mut action.payload) {
            self.log.update_payload(id, &action.payload).await?;
        }

        let gaps = resolver.unresolved(&action.payload);
        if !gaps.is_empty() {
            let keys: Vec<String> = gaps.iter().map(EntityRef::key).collect();
            return Err(AppError::ResolutionGap(format!(
                "{} action {id} references {}",
                action.kind(),
                keys.join(", ")
            )));
        }

        let body = self.dispatcher.dispatch(action).await?;
        let resolved = resolve_created(&action.payload, body.as_ref())?;

        if let Some(resolved) = &resolved {
            resolver.record(&resolved.resolution);
            self.propagate(resolver, id, rest).await?;
            if let Err(err) = self.mirror.confirm_created(resolved).await {
                warn!(
                    target: TARGET,
                    temp = %resolved.resolution.temp_key(),
                    real = %resolved.resolution.real_key(),
                    error = %err,
                    "failed to migrate mirror entry"
                );
            }
        }

        if let Err(err) = self.mirror.confirm_applied(action).await {
            warn!(
                target: TARGET,
                action_id = %id,
                kind = %action.kind(),
                error = %err,
                "failed to apply confirmed mutation to mirror"
            );
        }

        self.log.remove(id).await?;
        debug!(target: TARGET, action_id = %id, kind = %action.kind(), "action replayed");
        Ok(resolved)
    }

    /// Rewrites every stored action other than `current`, including ones
    /// queued after this pass read the log, then brings the in-memory tail
    /// of the pass in step.
    async fn propagate(
        &self,
        resolver: &IdResolver,
        current: ActionId,
        rest: &mut [PendingAction],
    ) -> Result<(), AppError> {
        let mut stored = self.log.list_unsynced().await?;
        stored.extend(self.log.list_quarantined().await?);
        for mut other in stored {
            let Some(other_id) = other.id else {
                continue;
            };
            if other_id == current || !resolver.apply(&mut other.payload) {
                continue;
            }
            self.log.update_payload(other_id, &other.payload).await?;
        }

        for later in rest.iter_mut() {
            resolver.apply(&mut later.payload);
        }
        Ok(())
    }

    async fn renew_lease(&self) -> Result<bool, AppError> {
        match &self.lease {
            Some(lease) => lease.try_acquire(&self.holder, self.policy.lease_ttl).await,
            None => Ok(true),
        }
    }

    /// Records the failure and, once the attempt budget is spent, quarantines
    /// the action together with every later action that depends on what it
    /// would have created.
    async fn handle_failure(
        &self,
        action: &PendingAction,
        rest: &[PendingAction],
        err: &AppError,
    ) -> Vec<i64> {
        let Some(id) = action.id else {
            return Vec::new();
        };
        let attempts = match self.log.record_failure(id, &err.to_string()).await {
            Ok(attempts) => attempts,
            Err(record_err) => {
                warn!(target: TARGET, action_id = %id, error = %record_err, "failed to record replay failure");
                return Vec::new();
            }
        };

        let Some(limit) = self.policy.quarantine_after else {
            return Vec::new();
        };
        if attempts < limit {
            return Vec::new();
        }

        let mut ids: Vec<ActionId> = vec![id];
        let mut created: Vec<EntityRef> = action.payload.temp_ref().into_iter().collect();
        for later in rest {
            let depends = created
                .iter()
                .any(|entity| later.payload.references_entity(entity));
            if !depends {
                continue;
            }
            if let Some(later_id) = later.id {
                ids.push(later_id);
            }
            if let Some(entity) = later.payload.temp_ref() {
                created.push(entity);
            }
        }

        if let Err(quarantine_err) = self
            .log
            .quarantine(&ids, Utc::now().timestamp_millis())
            .await
        {
            warn!(target: TARGET, error = %quarantine_err, "failed to quarantine actions");
            return Vec::new();
        }

        let ids: Vec<i64> = ids.into_iter().map(i64::from).collect();
        warn!(target: TARGET, action_ids = ?ids, attempts, "actions quarantined");
        ids
    }
}
