use super::Resolution;
use serde::{Deserialize, Serialize};

/// Engine state machine: `Idle -> Draining -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPhase {
    Idle,
    Draining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyDraining,
    Offline,
    LeaseHeld,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ReplayStatus {
    /// Every action fetched for the pass was confirmed.
    Completed,
    /// The pass stopped at a failing action.
    Blocked,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub status: ReplayStatus,
    pub replayed: u32,
    pub remaining: u32,
    pub resolutions: Vec<Resolution>,
    pub quarantined: Vec<i64>,
    pub error: Option<String>,
}

impl ReplayReport {
    pub fn skipped(reason: SkipReason, remaining: u32) -> Self {
        Self {
            status: ReplayStatus::Skipped(reason),
            replayed: 0,
            remaining,
            resolutions: Vec::new(),
            quarantined: Vec::new(),
            error: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == ReplayStatus::Completed && self.remaining == 0
    }

    pub fn is_blocked(&self) -> bool {
        self.status == ReplayStatus::Blocked
    }
}
