pub mod mappers;
pub mod rows;
pub mod sqlite_action_log;
pub mod sqlite_lease;
pub mod sqlite_local_mirror;

pub use sqlite_action_log::SqliteActionLog;
pub use sqlite_lease::SqliteReplayLease;
pub use sqlite_local_mirror::SqliteLocalMirror;
