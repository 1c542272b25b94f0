pub mod broadcast_notifier;
pub mod tracing_notifier;

pub use broadcast_notifier::BroadcastSyncNotifier;
pub use tracing_notifier::TracingSyncNotifier;
