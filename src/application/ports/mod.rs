pub mod action_log;
pub mod connectivity_probe;
pub mod local_mirror;
pub mod mutation_dispatcher;
pub mod replay_lease;
pub mod sync_notifier;

pub use action_log::ActionLog;
pub use connectivity_probe::ConnectivityProbe;
pub use local_mirror::LocalMirror;
pub use mutation_dispatcher::MutationDispatcher;
pub use replay_lease::ReplayLease;
pub use sync_notifier::SyncNotifier;
