use crate::domain::entities::{ActionPayload, EntityRef, Resolution, ResolvedEntity};
use crate::domain::value_objects::{ClientId, InvoiceId, SessionId};
use crate::shared::error::AppError;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Placeholder → server id tables for a single replay pass.
///
/// Rebuilt from scratch at the start of every pass; the log is the durable
/// record and already carries every rewrite a previous pass persisted.
#[derive(Debug, Default)]
pub struct IdResolver {
    sessions: HashMap<SessionId, SessionId>,
    clients: HashMap<ClientId, ClientId>,
    invoices: HashMap<InvoiceId, InvoiceId>,
}

impl IdResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::Session { temp, real } => {
                self.sessions.insert(*temp, *real);
            }
            Resolution::Client { temp, real } => {
                self.clients.insert(temp.clone(), real.clone());
            }
            Resolution::Invoice { temp, real } => {
                self.invoices.insert(temp.clone(), real.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len() + self.clients.len() + self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrites every resolvable placeholder reference in `payload`.
    /// Returns whether anything changed.
    pub fn apply(&self, payload: &mut ActionPayload) -> bool {
        match payload {
            ActionPayload::StartSession(p) => self.client(&mut p.client_id),
            ActionPayload::EndSession(p) => self.session(&mut p.session_id),
            ActionPayload::UpdateSession(p) => {
                let session_changed = self.session(&mut p.session_id);
                let client_changed = self.nested_client(&mut p.updates);
                session_changed || client_changed
            }
            ActionPayload::CreateClient(_) => false,
            ActionPayload::UpdateClient(p) => self.client(&mut p.client_id),
            ActionPayload::CreateBillingRate(p) => self.client(&mut p.client_id),
            ActionPayload::CreateInvoice(p) => {
                let mut changed = self.client(&mut p.client_id);
                for session_id in p.session_ids.iter_mut() {
                    changed |= self.session(session_id);
                }
                changed
            }
            ActionPayload::DeleteInvoice(p) => self.invoice(&mut p.invoice_id),
        }
    }

    /// Placeholder references in `payload` this pass has no server id for.
    pub fn unresolved(&self, payload: &ActionPayload) -> Vec<EntityRef> {
        payload
            .references()
            .into_iter()
            .filter(|reference| reference.is_temporary() && !self.knows(reference))
            .collect()
    }

    fn knows(&self, reference: &EntityRef) -> bool {
        match reference {
            EntityRef::Session(id) => self.sessions.contains_key(id),
            EntityRef::Client(id) => self.clients.contains_key(id),
            EntityRef::Invoice(id) => self.invoices.contains_key(id),
        }
    }

    fn session(&self, id: &mut SessionId) -> bool {
        if !id.is_temporary() {
            return false;
        }
        match self.sessions.get(id) {
            Some(real) => {
                *id = *real;
                true
            }
            None => false,
        }
    }

    fn client(&self, id: &mut ClientId) -> bool {
        if !id.is_temporary() {
            return false;
        }
        match self.clients.get(id) {
            Some(real) => {
                *id = real.clone();
                true
            }
            None => false,
        }
    }

    fn invoice(&self, id: &mut InvoiceId) -> bool {
        if !id.is_temporary() {
            return false;
        }
        match self.invoices.get(id) {
            Some(real) => {
                *id = real.clone();
                true
            }
            None => false,
        }
    }

    fn nested_client(&self, updates: &mut Map<String, Value>) -> bool {
        let Some(Value::String(raw)) = updates.get_mut("client_id") else {
            return false;
        };
        let Ok(mut id) = ClientId::new(raw.clone()) else {
            return false;
        };
        if self.client(&mut id) {
            *raw = id.into();
            true
        } else {
            false
        }
    }
}

/// Reads the server-assigned id for a create action out of its response body.
///
/// Actions that carry no placeholder yield `None`. A create with a placeholder
/// whose response lacks a usable id is a dispatch failure.
pub fn resolve_created(
    payload: &ActionPayload,
    body: Option<&Value>,
) -> Result<Option<ResolvedEntity>, AppError> {
    let Some(temp) = payload.temp_ref() else {
        return Ok(None);
    };

    let kind = payload.kind();
    let fields = match body {
        Some(Value::Object(map)) => map.clone(),
        _ => {
            return Err(AppError::Dispatch(format!(
                "{kind} response has no body to resolve {}",
                temp.key()
            )));
        }
    };
    let raw_id = fields.get("id").ok_or_else(|| {
        AppError::Dispatch(format!("{kind} response is missing an id for {}", temp.key()))
    })?;

    let resolution = match temp {
        EntityRef::Session(temp) => {
            let real = SessionId::new(numeric_id(raw_id).ok_or_else(|| {
                AppError::Dispatch(format!("{kind} returned a non-numeric session id: {raw_id}"))
            })?);
            Resolution::Session { temp, real }
        }
        EntityRef::Client(temp) => {
            let real = ClientId::new(string_id(raw_id)?).map_err(AppError::Dispatch)?;
            Resolution::Client { temp, real }
        }
        EntityRef::Invoice(temp) => {
            let real = InvoiceId::new(string_id(raw_id)?).map_err(AppError::Dispatch)?;
            Resolution::Invoice { temp, real }
        }
    };

    if resolution.real_ref().is_temporary() {
        return Err(AppError::Dispatch(format!(
            "{kind} returned a placeholder id {}",
            resolution.real_key()
        )));
    }

    Ok(Some(ResolvedEntity::new(resolution, fields)))
}

fn numeric_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_id(value: &Value) -> Result<String, AppError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(AppError::Dispatch(format!("Unexpected id value: {other}"))),
    }
}
