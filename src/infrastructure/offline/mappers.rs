use super::rows::{MirrorEntityRow, PendingActionRow};
use crate::domain::entities::{ActionPayload, MirrorSnapshot, PendingAction};
use crate::domain::value_objects::{ActionId, ActionKind, EntityKind};
use crate::shared::error::AppError;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

pub fn pending_action_from_row(row: PendingActionRow) -> Result<PendingAction, AppError> {
    let id = ActionId::new(row.id).map_err(AppError::DeserializationError)?;
    let kind: ActionKind = row
        .action_type
        .parse()
        .map_err(AppError::DeserializationError)?;
    let raw: Value = serde_json::from_str(&row.payload).map_err(|err| {
        AppError::DeserializationError(format!("Invalid payload for action {id}: {err}"))
    })?;
    let payload = ActionPayload::from_parts(kind, raw).map_err(|err| {
        AppError::DeserializationError(format!("Invalid {kind} payload for action {id}: {err}"))
    })?;

    Ok(PendingAction {
        id: Some(id),
        payload,
        timestamp: row.timestamp,
        synced: row.synced,
        attempts: u32::try_from(row.attempts.max(0)).unwrap_or(u32::MAX),
        last_error: row.last_error,
        quarantined_at: row.quarantined_at,
    })
}

/// `(action_type, payload)` column values.
pub fn payload_columns(payload: &ActionPayload) -> Result<(String, String), AppError> {
    let (kind, value) = payload.to_parts()?;
    Ok((kind.as_str().to_string(), serde_json::to_string(&value)?))
}

pub fn mirror_snapshot_from_row(row: MirrorEntityRow) -> Result<MirrorSnapshot, AppError> {
    let kind: EntityKind = row
        .entity_kind
        .parse()
        .map_err(AppError::DeserializationError)?;
    let data = parse_object(&row.data).map_err(|err| {
        AppError::DeserializationError(format!(
            "Invalid mirror data for {kind}/{}: {err}",
            row.entity_key
        ))
    })?;

    Ok(MirrorSnapshot {
        kind,
        key: row.entity_key,
        data,
        is_temporary: row.is_temporary,
        updated_at: millis_to_datetime(row.updated_at),
    })
}

pub fn parse_object(raw: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw).map_err(|err| err.to_string())? {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected an object, got {other}")),
    }
}

pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
}
