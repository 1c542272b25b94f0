use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const UNSET_TS: u64 = 0;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PassOutcome {
    Completed,
    Blocked,
    Skipped,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplayMetricsSnapshot {
    pub passes_completed: u64,
    pub passes_blocked: u64,
    pub passes_skipped: u64,
    pub actions_replayed: u64,
    pub consecutive_failure: u64,
    pub last_success_ms: Option<u64>,
    pub last_failure_ms: Option<u64>,
    pub last_outcome: Option<PassOutcome>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default, Clone)]
struct LastPass {
    outcome: Option<PassOutcome>,
    error: Option<String>,
}

/// Per-engine replay counters.
#[derive(Debug)]
pub struct ReplayMetrics {
    completed: AtomicU64,
    blocked: AtomicU64,
    skipped: AtomicU64,
    replayed: AtomicU64,
    consecutive_failure: AtomicU64,
    last_success_ms: AtomicU64,
    last_failure_ms: AtomicU64,
    last: Mutex<LastPass>,
}

impl ReplayMetrics {
    pub fn new() -> Self {
        Self {
            completed: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            replayed: AtomicU64::new(0),
            consecutive_failure: AtomicU64::new(0),
            last_success_ms: AtomicU64::new(UNSET_TS),
            last_failure_ms: AtomicU64::new(UNSET_TS),
            last: Mutex::new(LastPass::default()),
        }
    }

    pub fn record(&self, outcome: PassOutcome, replayed: u32, error: Option<&str>) {
        self.replayed.fetch_add(u64::from(replayed), Ordering::Relaxed);
        match outcome {
            PassOutcome::Completed => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                self.last_success_ms
                    .store(current_unix_ms(), Ordering::Relaxed);
                self.consecutive_failure.store(0, Ordering::Relaxed);
            }
            PassOutcome::Blocked => {
                self.blocked.fetch_add(1, Ordering::Relaxed);
                self.last_failure_ms
                    .store(current_unix_ms(), Ordering::Relaxed);
                self.consecutive_failure.fetch_add(1, Ordering::Relaxed);
            }
            PassOutcome::Skipped => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
        }

        if let Ok(mut guard) = self.last.lock() {
            guard.outcome = Some(outcome);
            guard.error = error.map(str::to_string);
        }
    }

    pub fn snapshot(&self) -> ReplayMetricsSnapshot {
        let last = self
            .last
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        ReplayMetricsSnapshot {
            passes_completed: self.completed.load(Ordering::Relaxed),
            passes_blocked: self.blocked.load(Ordering::Relaxed),
            passes_skipped: self.skipped.load(Ordering::Relaxed),
            actions_replayed: self.replayed.load(Ordering::Relaxed),
            consecutive_failure: self.consecutive_failure.load(Ordering::Relaxed),
            last_success_ms: timestamp_to_option(self.last_success_ms.load(Ordering::Relaxed)),
            last_failure_ms: timestamp_to_option(self.last_failure_ms.load(Ordering::Relaxed)),
            last_outcome: last.outcome,
            last_error: last.error,
        }
    }
}

impl Default for ReplayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
pub fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(UNSET_TS)
}

#[inline]
pub fn timestamp_to_option(value: u64) -> Option<u64> {
    if value == UNSET_TS { None } else { Some(value) }
}
