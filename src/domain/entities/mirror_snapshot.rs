use crate::domain::value_objects::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Cached copy of a client, session or invoice, keyed by its best-known id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MirrorSnapshot {
    pub kind: EntityKind,
    pub key: String,
    pub data: Map<String, Value>,
    pub is_temporary: bool,
    pub updated_at: DateTime<Utc>,
}

impl MirrorSnapshot {
    pub fn new(
        kind: EntityKind,
        key: impl Into<String>,
        data: Map<String, Value>,
        is_temporary: bool,
    ) -> Self {
        Self {
            kind,
            key: key.into(),
            data,
            is_temporary,
            updated_at: Utc::now(),
        }
    }

    /// Overlays `fields` onto the snapshot, later values winning.
    pub fn merge(&mut self, fields: &Map<String, Value>) {
        for (key, value) in fields {
            self.data.insert(key.clone(), value.clone());
        }
        self.updated_at = Utc::now();
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}
