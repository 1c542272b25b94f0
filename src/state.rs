use crate::application::ports::{ActionLog, LocalMirror, MutationDispatcher, ReplayLease};
use crate::application::services::{
    ConnectivityMonitor, OfflineQueueService, ReplayEngine, ReplayPolicy,
};
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::notify::BroadcastSyncNotifier;
use crate::infrastructure::offline::{SqliteActionLog, SqliteLocalMirror, SqliteReplayLease};
use crate::infrastructure::remote::{HttpHealthProbe, HttpMutationDispatcher};
use crate::shared::config::AppConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const NOTICE_CAPACITY: usize = 64;

/// Wired-up offline sync stack.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: ConnectionPool,
    pub action_log: Arc<dyn ActionLog>,
    pub mirror: Arc<dyn LocalMirror>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub engine: Arc<ReplayEngine>,
    pub queue: Arc<OfflineQueueService>,
    pub notices: Arc<BroadcastSyncNotifier>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate().map_err(anyhow::Error::msg)?;

        let db_pool =
            ConnectionPool::new(&config.database.url, config.database.max_connections).await?;
        db_pool.migrate().await?;
        let dispatcher: Arc<dyn MutationDispatcher> =
            Arc::new(HttpMutationDispatcher::new(&config.remote)?);

        Self::with_dispatcher(config, db_pool, dispatcher, false).await
    }

    /// Builds the stack over an already migrated pool. Starts offline; the
    /// probe or the caller flips connectivity.
    pub async fn with_dispatcher(
        config: AppConfig,
        db_pool: ConnectionPool,
        dispatcher: Arc<dyn MutationDispatcher>,
        initially_online: bool,
    ) -> anyhow::Result<Self> {
        let pool = db_pool.get_pool().clone();
        let action_log: Arc<dyn ActionLog> = Arc::new(SqliteActionLog::new(pool.clone()));
        let mirror: Arc<dyn LocalMirror> = Arc::new(SqliteLocalMirror::new(pool.clone()));
        let connectivity = Arc::new(ConnectivityMonitor::new(initially_online));

        let policy = ReplayPolicy {
            quarantine_after: config.sync.quarantine_after,
            lease_ttl: Duration::from_secs(config.sync.lease_ttl_secs),
        };
        let mut engine = ReplayEngine::new(
            Arc::clone(&action_log),
            Arc::clone(&mirror),
            Arc::clone(&dispatcher),
            Arc::clone(&connectivity),
        )
        .with_policy(policy);
        if config.sync.lease_ttl_secs > 0 {
            let lease: Arc<dyn ReplayLease> = Arc::new(SqliteReplayLease::new(pool));
            engine = engine.with_lease(lease);
        }
        let engine = Arc::new(engine);

        let notices = Arc::new(BroadcastSyncNotifier::new(NOTICE_CAPACITY));
        let mirror_ttl = config
            .mirror
            .temporary_ttl_hours
            .and_then(|hours| i64::try_from(hours).ok())
            .map(chrono::Duration::hours);
        let queue = OfflineQueueService::new(
            Arc::clone(&engine),
            Arc::clone(&action_log),
            Arc::clone(&mirror),
            dispatcher,
            Arc::clone(&connectivity),
        )
        .with_notifier(notices.clone())
        .with_auto_sync(config.sync.auto_sync)
        .with_mirror_ttl(mirror_ttl);
        let queue = Arc::new(queue);
        queue.initialize().await?;

        Ok(Self {
            config,
            db_pool,
            action_log,
            mirror,
            connectivity,
            engine,
            queue,
            notices,
        })
    }

    /// Starts the health probe and the reconnect listener.
    pub fn start(&self) -> anyhow::Result<Vec<JoinHandle<()>>> {
        let probe = HttpHealthProbe::new(
            &self.config.remote.base_url,
            Duration::from_secs(self.config.connectivity.probe_timeout_secs),
        )?;
        let interval = Duration::from_secs(self.config.connectivity.probe_interval_secs);

        Ok(vec![
            self.connectivity.spawn_probe(Arc::new(probe), interval),
            self.queue.start(),
        ])
    }
}
