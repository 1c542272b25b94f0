use super::EntityRef;
use crate::domain::value_objects::{ClientId, EntityKind, InvoiceId, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A placeholder id paired with the id the server assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Session { temp: SessionId, real: SessionId },
    Client { temp: ClientId, real: ClientId },
    Invoice { temp: InvoiceId, real: InvoiceId },
}

impl Resolution {
    pub fn kind(&self) -> EntityKind {
        match self {
            Resolution::Session { .. } => EntityKind::Session,
            Resolution::Client { .. } => EntityKind::Client,
            Resolution::Invoice { .. } => EntityKind::Invoice,
        }
    }

    pub fn temp_ref(&self) -> EntityRef {
        match self {
            Resolution::Session { temp, .. } => EntityRef::Session(*temp),
            Resolution::Client { temp, .. } => EntityRef::Client(temp.clone()),
            Resolution::Invoice { temp, .. } => EntityRef::Invoice(temp.clone()),
        }
    }

    pub fn real_ref(&self) -> EntityRef {
        match self {
            Resolution::Session { real, .. } => EntityRef::Session(*real),
            Resolution::Client { real, .. } => EntityRef::Client(real.clone()),
            Resolution::Invoice { real, .. } => EntityRef::Invoice(real.clone()),
        }
    }

    pub fn temp_key(&self) -> String {
        self.temp_ref().key()
    }

    pub fn real_key(&self) -> String {
        self.real_ref().key()
    }

    /// JSON form of the real id as stored in mirror records.
    pub fn real_value(&self) -> Value {
        match self {
            Resolution::Session { real, .. } => Value::from(real.value()),
            Resolution::Client { real, .. } => Value::String(real.as_str().to_string()),
            Resolution::Invoice { real, .. } => Value::String(real.as_str().to_string()),
        }
    }

    pub fn temp_value(&self) -> Value {
        match self {
            Resolution::Session { temp, .. } => Value::from(temp.value()),
            Resolution::Client { temp, .. } => Value::String(temp.as_str().to_string()),
            Resolution::Invoice { temp, .. } => Value::String(temp.as_str().to_string()),
        }
    }
}

/// A confirmed create: the id mapping plus whatever fields the server returned
/// (invoice number, status, timestamps).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub resolution: Resolution,
    pub server_fields: Map<String, Value>,
}

impl ResolvedEntity {
    pub fn new(resolution: Resolution, server_fields: Map<String, Value>) -> Self {
        Self {
            resolution,
            server_fields,
        }
    }
}
