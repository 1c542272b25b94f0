use crate::application::ports::SyncNotifier;
use crate::domain::entities::SyncNotice;
use tokio::sync::broadcast;

/// Fans notices out to any number of UI subscribers.
pub struct BroadcastSyncNotifier {
    sender: broadcast::Sender<SyncNotice>,
}

impl BroadcastSyncNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncNotice> {
        self.sender.subscribe()
    }
}

impl SyncNotifier for BroadcastSyncNotifier {
    fn emit(&self, notice: &SyncNotice) -> Result<(), String> {
        // no subscribers is not a failure
        let _ = self.sender.send(notice.clone());
        Ok(())
    }
}
