pub mod action_id;
pub mod action_kind;
pub mod client_id;
pub mod entity_kind;
pub mod invoice_id;
pub mod session_id;
pub mod temporary_id;

pub use action_id::ActionId;
pub use action_kind::ActionKind;
pub use client_id::ClientId;
pub use entity_kind::EntityKind;
pub use invoice_id::InvoiceId;
pub use session_id::SessionId;
pub use temporary_id::{TEMP_PREFIX, TemporaryIdGenerator};
