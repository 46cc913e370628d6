pub mod audit_log;
pub mod bans;
pub mod boards;
pub mod posts;
pub mod threads;
