use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use worklog_sync::AppState;
use worklog_sync::application::ports::MutationDispatcher;
use worklog_sync::domain::entities::{
    ActionPayload, CreateBillingRatePayload, CreateClientPayload, CreateInvoicePayload,
    EndSessionPayload, PendingAction, StartSessionPayload,
};
use worklog_sync::domain::value_objects::{ActionKind, ClientId, SessionId};
use worklog_sync::infrastructure::database::ConnectionPool;
use worklog_sync::shared::config::AppConfig;
use worklog_sync::shared::error::AppError;

/// Fake remote API: records every dispatched action and hands out
/// sequential server ids for creates.
#[derive(Default)]
pub struct ScriptedDispatcher {
    calls: Mutex<Vec<PendingAction>>,
    failing: Mutex<HashSet<ActionKind>>,
}

#[allow(dead_code)]
impl ScriptedDispatcher {
    pub fn fail_on(&self, kind: ActionKind) {
        self.failing.lock().unwrap().insert(kind);
    }

    pub fn recover(&self, kind: ActionKind) {
        self.failing.lock().unwrap().remove(&kind);
    }

    pub fn calls(&self) -> Vec<PendingAction> {
        self.calls.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<ActionKind> {
        self.calls().iter().map(PendingAction::kind).collect()
    }
}

#[async_trait]
impl MutationDispatcher for ScriptedDispatcher {
    async fn dispatch(&self, action: &PendingAction) -> Result<Option<Value>, AppError> {
        let kind = action.kind();
        if self.failing.lock().unwrap().contains(&kind) {
            return Err(AppError::Dispatch(format!(
                "Remote rejected {kind} with status 503: unavailable"
            )));
        }
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(action.clone());
            calls.len()
        };
        let body = match kind {
            ActionKind::CreateClient => Some(json!({"id": format!("cl_{n}"), "created_at": "2024-05-01T10:00:00Z"})),
            ActionKind::StartSession => Some(json!({"id": 1000 + n as i64, "status": "active"})),
            ActionKind::CreateInvoice => Some(json!({"id": format!("inv_{n}"), "invoice_number": format!("INV-{n:04}")})),
            _ => None,
        };
        Ok(body)
    }
}

pub struct TestContext {
    pub state: AppState,
    pub dispatcher: Arc<ScriptedDispatcher>,
}

#[allow(dead_code)]
pub async fn setup_in_memory(config: AppConfig) -> TestContext {
    let pool = ConnectionPool::from_memory().await.expect("in-memory sqlite");
    pool.migrate().await.expect("migrations");
    setup_with_pool(config, pool).await
}

pub async fn setup_with_pool(config: AppConfig, pool: ConnectionPool) -> TestContext {
    let dispatcher = Arc::new(ScriptedDispatcher::default());
    let state = AppState::with_dispatcher(config, pool, dispatcher.clone(), false)
        .await
        .expect("app state");
    TestContext { state, dispatcher }
}

#[allow(dead_code)]
pub fn create_client(name: &str) -> ActionPayload {
    ActionPayload::CreateClient(CreateClientPayload {
        temp_id: None,
        name: name.to_string(),
        email: Some(format!("{}@example.test", name.to_lowercase())),
        phone: None,
        extra: Map::new(),
    })
}

#[allow(dead_code)]
pub fn billing_rate(client_id: &ClientId) -> ActionPayload {
    ActionPayload::CreateBillingRate(CreateBillingRatePayload {
        client_id: client_id.clone(),
        rate_type: "hourly".into(),
        amount: "50".into(),
        currency: Some("USD".into()),
        is_default: true,
    })
}

#[allow(dead_code)]
pub fn start_session(client_id: &ClientId) -> ActionPayload {
    ActionPayload::StartSession(StartSessionPayload {
        temp_id: None,
        client_id: client_id.clone(),
        session_type: "billable".into(),
        extra: Map::new(),
    })
}

#[allow(dead_code)]
pub fn end_session(session_id: SessionId) -> ActionPayload {
    ActionPayload::EndSession(EndSessionPayload {
        session_id,
        notes: None,
    })
}

#[allow(dead_code)]
pub fn create_invoice(client_id: &ClientId, sessions: Vec<SessionId>) -> ActionPayload {
    ActionPayload::CreateInvoice(CreateInvoicePayload {
        temp_id: None,
        client_id: client_id.clone(),
        client_name: "Acme".into(),
        session_ids: sessions,
        manual_items: Vec::new(),
        extra: Map::new(),
    })
}
