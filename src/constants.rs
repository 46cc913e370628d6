//! Application-wide constants
//!
//! Lifecycle defaults live here; each is overridable per board or through
//! configuration (see app_config).

/// Replies after which a thread stops bumping. 0 means unlimited.
pub const DEFAULT_BUMP_LIMIT: i32 = 300;

/// Alive, non-sticky threads a board may hold before the oldest-bumped
/// thread is retired to make room.
pub const DEFAULT_MAX_ACTIVE_THREADS: i32 = 100;

/// Days a retired thread stays visible before the reaper destroys it.
pub const DEFAULT_RETENTION_DAYS: i64 = 2;

/// Seconds an unreferenced blob is left alone after upload, to cover the
/// gap between the upload finishing and its database row committing.
pub const DEFAULT_ORPHAN_GRACE_SECONDS: i64 = 3600;

/// Days audit-log entries are kept. Independent of thread retention.
pub const DEFAULT_AUDIT_RETENTION_DAYS: i64 = 180;

/// Seconds between janitor runs.
pub const DEFAULT_JANITOR_INTERVAL_SECONDS: u64 = 3600;

/// Maximum length for post content in characters.
pub const MAX_POST_LENGTH: usize = 10_000;

/// Maximum length for a thread subject in characters.
pub const MAX_SUBJECT_LENGTH: usize = 100;

/// Display color assigned to posts that don't pick one.
pub const DEFAULT_NAME_COLOR: &str = "#117743";
