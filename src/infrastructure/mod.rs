pub mod database;
pub mod notify;
pub mod offline;
pub mod remote;
