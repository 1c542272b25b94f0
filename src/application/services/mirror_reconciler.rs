use crate::application::ports::LocalMirror;
use crate::domain::entities::{
    ActionPayload, MirrorSnapshot, PendingAction, Resolution, ResolvedEntity,
};
use crate::domain::value_objects::EntityKind;
use crate::shared::error::AppError;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::debug;

/// Keeps the local mirror in step with queued and confirmed mutations.
pub struct MirrorReconciler {
    mirror: Arc<dyn LocalMirror>,
}

impl MirrorReconciler {
    pub fn new(mirror: Arc<dyn LocalMirror>) -> Self {
        Self { mirror }
    }

    pub fn store(&self) -> Arc<dyn LocalMirror> {
        Arc::clone(&self.mirror)
    }

    /// Writes the expected post-mutation state so reads reflect the action
    /// before the server has seen it.
    pub async fn apply_optimistic(&self, action: &PendingAction) -> Result<(), AppError> {
        let at = millis_to_iso(action.timestamp);
        match &action.payload {
            ActionPayload::StartSession(p) => {
                let Some(temp) = p.temp_id else {
                    return Ok(());
                };
                let mut data = p.extra.clone();
                data.insert("id".into(), json!(temp.value()));
                data.insert("client_id".into(), json!(p.client_id.as_str()));
                data.insert("session_type".into(), json!(p.session_type));
                data.entry("start_time").or_insert_with(|| json!(at));
                data.insert("status".into(), json!("active"));

                let key = temp.as_key();
                self.mirror
                    .upsert(&MirrorSnapshot::new(EntityKind::Session, key.clone(), data, true))
                    .await?;
                self.mirror.set_active_session(Some(&key)).await?;
            }
            ActionPayload::EndSession(p) => {
                let key = p.session_id.as_key();
                if let Some(mut snapshot) = self.mirror.get(EntityKind::Session, &key).await? {
                    let mut fields = Map::new();
                    fields.insert("end_time".into(), json!(at));
                    fields.insert("status".into(), json!("completed"));
                    if let Some(notes) = &p.notes {
                        fields.insert("notes".into(), json!(notes));
                    }
                    if let Some(minutes) = snapshot
                        .field("start_time")
                        .and_then(Value::as_str)
                        .and_then(|start| duration_minutes(start, action.timestamp))
                    {
                        fields.insert("duration_minutes".into(), json!(minutes));
                    }
                    snapshot.merge(&fields);
                    self.mirror.upsert(&snapshot).await?;
                }
                if self.mirror.active_session().await?.as_deref() == Some(key.as_str()) {
                    self.mirror.set_active_session(None).await?;
                }
            }
            ActionPayload::UpdateSession(p) => {
                self.merge_into(EntityKind::Session, &p.session_id.as_key(), &p.updates)
                    .await?;
            }
            ActionPayload::CreateClient(p) => {
                let Some(temp) = &p.temp_id else {
                    return Ok(());
                };
                let mut data = p.extra.clone();
                data.insert("id".into(), json!(temp.as_str()));
                data.insert("name".into(), json!(p.name));
                if let Some(email) = &p.email {
                    data.insert("email".into(), json!(email));
                }
                if let Some(phone) = &p.phone {
                    data.insert("phone".into(), json!(phone));
                }
                data.entry("billing_rates").or_insert_with(|| json!([]));
                self.mirror
                    .upsert(&MirrorSnapshot::new(EntityKind::Client, temp.as_str(), data, true))
                    .await?;
            }
            ActionPayload::UpdateClient(p) => {
                self.merge_into(EntityKind::Client, p.client_id.as_str(), &p.fields)
                    .await?;
            }
            ActionPayload::CreateBillingRate(p) => {
                if let Some(mut snapshot) =
                    self.mirror.get(EntityKind::Client, p.client_id.as_str()).await?
                {
                    let mut rates = match snapshot.field("billing_rates") {
                        Some(Value::Array(rates)) => rates.clone(),
                        _ => Vec::new(),
                    };
                    rates.push(json!({
                        "rate_type": p.rate_type,
                        "amount": p.amount,
                        "currency": p.currency,
                        "is_default": p.is_default,
                    }));
                    let mut fields = Map::new();
                    fields.insert("billing_rates".into(), Value::Array(rates));
                    snapshot.merge(&fields);
                    self.mirror.upsert(&snapshot).await?;
                }
            }
            ActionPayload::CreateInvoice(p) => {
                let Some(temp) = &p.temp_id else {
                    return Ok(());
                };
                let mut data = p.extra.clone();
                data.insert("id".into(), json!(temp.as_str()));
                data.insert("client_id".into(), json!(p.client_id.as_str()));
                data.insert("client_name".into(), json!(p.client_name));
                data.insert(
                    "session_ids".into(),
                    json!(p.session_ids.iter().map(|id| id.value()).collect::<Vec<_>>()),
                );
                data.insert("manual_items".into(), json!(p.manual_items));
                data.insert("status".into(), json!("draft"));
                data.entry("created_at").or_insert_with(|| json!(at));
                self.mirror
                    .upsert(&MirrorSnapshot::new(EntityKind::Invoice, temp.as_str(), data, true))
                    .await?;
            }
            ActionPayload::DeleteInvoice(p) => {
                self.mirror
                    .remove(EntityKind::Invoice, p.invoice_id.as_str())
                    .await?;
            }
        }
        Ok(())
    }

    /// Moves a confirmed entity from its placeholder key to the server id and
    /// repoints mirror records that referenced the placeholder.
    pub async fn confirm_created(&self, resolved: &ResolvedEntity) -> Result<(), AppError> {
        let resolution = &resolved.resolution;
        let kind = resolution.kind();
        let temp_key = resolution.temp_key();
        let real_key = resolution.real_key();

        let mut fields = resolved.server_fields.clone();
        fields.insert("id".into(), resolution.real_value());

        let moved = self.mirror.rekey(kind, &temp_key, &real_key, &fields).await?;
        if !moved {
            // Nothing optimistic to upgrade; keep what the server returned.
            self.mirror
                .upsert(&MirrorSnapshot::new(kind, real_key.clone(), fields, false))
                .await?;
        }

        match resolution {
            Resolution::Client { .. } => {
                let temp = resolution.temp_value();
                let real = resolution.real_value();
                for kind in [EntityKind::Session, EntityKind::Invoice] {
                    for mut snapshot in self.mirror.list(kind).await? {
                        let mut fields = Map::new();
                        for field in ["client_id", "clientId"] {
                            if snapshot.field(field) == Some(&temp) {
                                fields.insert(field.into(), real.clone());
                            }
                        }
                        if !fields.is_empty() {
                            snapshot.merge(&fields);
                            self.mirror.upsert(&snapshot).await?;
                        }
                    }
                }
            }
            Resolution::Session { .. } => {
                let temp = resolution.temp_value();
                let real = resolution.real_value();
                for mut snapshot in self.mirror.list(EntityKind::Invoice).await? {
                    let Some(Value::Array(ids)) = snapshot.field("session_ids") else {
                        continue;
                    };
                    if !ids.contains(&temp) {
                        continue;
                    }
                    let rewritten: Vec<Value> = ids
                        .iter()
                        .map(|id| if *id == temp { real.clone() } else { id.clone() })
                        .collect();
                    let mut fields = Map::new();
                    fields.insert("session_ids".into(), Value::Array(rewritten));
                    snapshot.merge(&fields);
                    self.mirror.upsert(&snapshot).await?;
                }
                if self.mirror.active_session().await?.as_deref() == Some(temp_key.as_str()) {
                    self.mirror.set_active_session(Some(&real_key)).await?;
                }
            }
            Resolution::Invoice { .. } => {}
        }

        debug!(
            target: "offline::mirror",
            kind = %kind,
            temp = %temp_key,
            real = %real_key,
            "mirror entry upgraded to server id"
        );
        Ok(())
    }

    /// Applies what the server did for a confirmed action that a create
    /// confirmed earlier in the pass may have put back.
    pub async fn confirm_applied(&self, action: &PendingAction) -> Result<(), AppError> {
        if let ActionPayload::DeleteInvoice(p) = &action.payload {
            self.mirror
                .remove(EntityKind::Invoice, p.invoice_id.as_str())
                .await?;
        }
        Ok(())
    }

    async fn merge_into(
        &self,
        kind: EntityKind,
        key: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), AppError> {
        if let Some(mut snapshot) = self.mirror.get(kind, key).await? {
            snapshot.merge(fields);
            self.mirror.upsert(&snapshot).await?;
        }
        Ok(())
    }
}

fn millis_to_iso(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}

fn duration_minutes(start: &str, end_millis: i64) -> Option<i64> {
    let start = DateTime::parse_from_rfc3339(start).ok()?.with_timezone(&Utc);
    let end = Utc.timestamp_millis_opt(end_millis).single()?;
    Some((end - start).num_minutes().max(0))
}
