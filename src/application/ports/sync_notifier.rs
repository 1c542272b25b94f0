use crate::domain::entities::SyncNotice;

pub trait SyncNotifier: Send + Sync {
    fn emit(&self, notice: &SyncNotice) -> Result<(), String>;
}
