pub mod activity_log;
pub mod contract;
pub mod cv;
pub mod cv_version;
pub mod sheet_sync;
pub mod user;
