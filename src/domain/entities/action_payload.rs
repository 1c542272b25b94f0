use crate::domain::value_objects::{
    ActionKind, ClientId, EntityKind, InvoiceId, SessionId, TemporaryIdGenerator,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const TEMP_ID_FIELD: &str = "tempId";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSessionPayload {
    #[serde(rename = "tempId", default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<SessionId>,
    pub client_id: ClientId,
    pub session_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndSessionPayload {
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSessionPayload {
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
    #[serde(default)]
    pub updates: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateClientPayload {
    #[serde(rename = "tempId", default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<ClientId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateClientPayload {
    #[serde(rename = "clientId")]
    pub client_id: ClientId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBillingRatePayload {
    #[serde(rename = "clientId")]
    pub client_id: ClientId,
    pub rate_type: String,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateInvoicePayload {
    #[serde(rename = "tempId", default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<InvoiceId>,
    pub client_id: ClientId,
    pub client_name: String,
    #[serde(default)]
    pub session_ids: Vec<SessionId>,
    #[serde(default)]
    pub manual_items: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteInvoicePayload {
    #[serde(rename = "invoiceId")]
    pub invoice_id: InvoiceId,
}

/// A queued mutation. Stored as `{"type": KIND, "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionPayload {
    StartSession(StartSessionPayload),
    EndSession(EndSessionPayload),
    UpdateSession(UpdateSessionPayload),
    CreateClient(CreateClientPayload),
    UpdateClient(UpdateClientPayload),
    CreateBillingRate(CreateBillingRatePayload),
    CreateInvoice(CreateInvoicePayload),
    DeleteInvoice(DeleteInvoicePayload),
}

/// An identifier an action either creates or points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Client(ClientId),
    Session(SessionId),
    Invoice(InvoiceId),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Client(_) => EntityKind::Client,
            EntityRef::Session(_) => EntityKind::Session,
            EntityRef::Invoice(_) => EntityKind::Invoice,
        }
    }

    /// Mirror key for the referenced entity.
    pub fn key(&self) -> String {
        match self {
            EntityRef::Client(id) => id.as_str().to_string(),
            EntityRef::Session(id) => id.as_key(),
            EntityRef::Invoice(id) => id.as_str().to_string(),
        }
    }

    pub fn is_temporary(&self) -> bool {
        match self {
            EntityRef::Client(id) => id.is_temporary(),
            EntityRef::Session(id) => id.is_temporary(),
            EntityRef::Invoice(id) => id.is_temporary(),
        }
    }
}

impl ActionPayload {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionPayload::StartSession(_) => ActionKind::StartSession,
            ActionPayload::EndSession(_) => ActionKind::EndSession,
            ActionPayload::UpdateSession(_) => ActionKind::UpdateSession,
            ActionPayload::CreateClient(_) => ActionKind::CreateClient,
            ActionPayload::UpdateClient(_) => ActionKind::UpdateClient,
            ActionPayload::CreateBillingRate(_) => ActionKind::CreateBillingRate,
            ActionPayload::CreateInvoice(_) => ActionKind::CreateInvoice,
            ActionPayload::DeleteInvoice(_) => ActionKind::DeleteInvoice,
        }
    }

    /// Placeholder id this action creates, if any.
    pub fn temp_ref(&self) -> Option<EntityRef> {
        match self {
            ActionPayload::StartSession(p) => p.temp_id.map(EntityRef::Session),
            ActionPayload::CreateClient(p) => p.temp_id.clone().map(EntityRef::Client),
            ActionPayload::CreateInvoice(p) => p.temp_id.clone().map(EntityRef::Invoice),
            _ => None,
        }
    }

    /// Fills in a placeholder id for create kinds that were queued without one.
    pub fn assign_placeholder(&mut self, ids: &TemporaryIdGenerator) -> Option<EntityRef> {
        match self {
            ActionPayload::StartSession(p) if p.temp_id.is_none() => {
                p.temp_id = Some(ids.session());
            }
            ActionPayload::CreateClient(p) if p.temp_id.is_none() => {
                p.temp_id = Some(ids.client());
            }
            ActionPayload::CreateInvoice(p) if p.temp_id.is_none() => {
                p.temp_id = Some(ids.invoice());
            }
            _ => {}
        }
        self.temp_ref()
    }

    /// Identifiers this action points at, excluding the one it creates.
    pub fn references(&self) -> Vec<EntityRef> {
        match self {
            ActionPayload::StartSession(p) => vec![EntityRef::Client(p.client_id.clone())],
            ActionPayload::EndSession(p) => vec![EntityRef::Session(p.session_id)],
            ActionPayload::UpdateSession(p) => {
                let mut refs = vec![EntityRef::Session(p.session_id)];
                if let Some(client) = p.updates.get("client_id").and_then(Value::as_str) {
                    if let Ok(id) = ClientId::new(client.to_string()) {
                        refs.push(EntityRef::Client(id));
                    }
                }
                refs
            }
            ActionPayload::CreateClient(_) => Vec::new(),
            ActionPayload::UpdateClient(p) => vec![EntityRef::Client(p.client_id.clone())],
            ActionPayload::CreateBillingRate(p) => vec![EntityRef::Client(p.client_id.clone())],
            ActionPayload::CreateInvoice(p) => {
                let mut refs = vec![EntityRef::Client(p.client_id.clone())];
                refs.extend(p.session_ids.iter().copied().map(EntityRef::Session));
                refs
            }
            ActionPayload::DeleteInvoice(p) => vec![EntityRef::Invoice(p.invoice_id.clone())],
        }
    }

    pub fn references_entity(&self, target: &EntityRef) -> bool {
        self.references().iter().any(|reference| reference == target)
    }

    /// Splits into the stored `(action_type, payload)` columns.
    pub fn to_parts(&self) -> Result<(ActionKind, Value), serde_json::Error> {
        let mut tagged = serde_json::to_value(self)?;
        let inner = tagged
            .get_mut("payload")
            .map(Value::take)
            .unwrap_or(Value::Object(Map::new()));
        Ok((self.kind(), inner))
    }

    pub fn from_parts(kind: ActionKind, payload: Value) -> Result<Self, serde_json::Error> {
        let mut tagged = Map::new();
        tagged.insert("type".to_string(), Value::String(kind.as_str().to_string()));
        tagged.insert("payload".to_string(), payload);
        serde_json::from_value(Value::Object(tagged))
    }

    /// Request body for the remote API: the payload minus local-only fields.
    pub fn remote_body(&self) -> Result<Value, serde_json::Error> {
        let (_, mut body) = self.to_parts()?;
        if let Value::Object(map) = &mut body {
            map.remove(TEMP_ID_FIELD);
        }
        Ok(body)
    }
}
