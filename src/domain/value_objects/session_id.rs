use serde::{Deserialize, Serialize};
use std::fmt;

/// Work session identifier. Negative values are client-minted placeholders
/// (negated creation-time milliseconds) awaiting a server id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(i64);

impl SessionId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn temporary(millis: i64) -> Self {
        Self(-millis.abs().max(1))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_temporary(&self) -> bool {
        self.0 < 0
    }

    pub fn as_key(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SessionId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<SessionId> for i64 {
    fn from(id: SessionId) -> Self {
        id.0
    }
}
