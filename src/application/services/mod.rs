pub mod connectivity_monitor;
pub mod id_resolver;
pub mod mirror_reconciler;
pub mod offline_queue_service;
pub mod replay_engine;

#[cfg(test)]
pub(crate) mod test_support;

pub use connectivity_monitor::ConnectivityMonitor;
pub use id_resolver::{IdResolver, resolve_created};
pub use mirror_reconciler::MirrorReconciler;
pub use offline_queue_service::{OfflineQueueService, SubmitOutcome};
pub use replay_engine::{ReplayEngine, ReplayPolicy};
