use crate::application::ports::SyncNotifier;
use crate::domain::entities::SyncNotice;

/// Writes notices to the log; the default when no UI is attached.
#[derive(Debug, Default)]
pub struct TracingSyncNotifier;

impl SyncNotifier for TracingSyncNotifier {
    fn emit(&self, notice: &SyncNotice) -> Result<(), String> {
        match notice {
            SyncNotice::SyncFailed { .. } | SyncNotice::Quarantined { .. } => {
                tracing::warn!(target: "offline::queue", notice = ?notice, "{}", notice.message());
            }
            _ => {
                tracing::info!(target: "offline::queue", notice = ?notice, "{}", notice.message());
            }
        }
        Ok(())
    }
}
