use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

use super::{ClientId, InvoiceId, SessionId};

pub const TEMP_PREFIX: &str = "temp_";

/// Mints placeholder ids and enqueue timestamps from wall-clock milliseconds,
/// never handing out the same millisecond twice or going backwards.
#[derive(Debug, Default)]
pub struct TemporaryIdGenerator {
    last: AtomicI64,
}

impl TemporaryIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(observed) => current = observed,
            }
        }
    }

    /// Ensures later values sort after `millis`, e.g. the newest stored
    /// action after a restart with a clock that stepped back.
    pub fn observe(&self, millis: i64) {
        self.last.fetch_max(millis, Ordering::AcqRel);
    }

    pub fn session(&self) -> SessionId {
        SessionId::temporary(self.next_millis())
    }

    pub fn client(&self) -> ClientId {
        ClientId::temporary(self.next_millis())
    }

    pub fn invoice(&self) -> InvoiceId {
        InvoiceId::temporary(self.next_millis())
    }
}
