pub mod action_payload;
pub mod mirror_snapshot;
pub mod pending_action;
pub mod queue_state;
pub mod replay_report;
pub mod resolution;

pub use action_payload::{
    ActionPayload, CreateBillingRatePayload, CreateClientPayload, CreateInvoicePayload,
    DeleteInvoicePayload, EndSessionPayload, EntityRef, StartSessionPayload,
    UpdateClientPayload, UpdateSessionPayload,
};
pub use mirror_snapshot::MirrorSnapshot;
pub use pending_action::PendingAction;
pub use queue_state::{QueueState, QueuedAction, SyncNotice};
pub use replay_report::{ReplayPhase, ReplayReport, ReplayStatus, SkipReason};
pub use resolution::{Resolution, ResolvedEntity};
