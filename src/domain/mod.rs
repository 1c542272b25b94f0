pub mod entities;
pub mod value_objects;

pub use entities::{ActionPayload, EntityRef, MirrorSnapshot, PendingAction};
pub use value_objects::{ActionId, ActionKind, ClientId, EntityKind, InvoiceId, SessionId};
