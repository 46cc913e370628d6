//! Append-only audit trail for moderation and lifecycle actions
//!
//! Every state change that affects user-visible content writes exactly one
//! audit row, inside the same transaction as the mutation: if the audit
//! insert fails, the enclosing transaction fails with it. Rows are never
//! updated; the only deletion path is the retention task, which purges
//! entries past a horizon independent of thread retention.

use crate::orm::audit_log;
use chrono::{Duration, Utc};
use sea_orm::{entity::*, query::*, DatabaseTransaction, DbErr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    DeletePost,
    DeleteThread,
    RetireThread,
    ReapThread,
    Ban,
    LiftBan,
    EditPost,
    ColorChange,
    StickyChange,
    AppealAccept,
    AppealReject,
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::DeletePost => "delete_post",
            Self::DeleteThread => "delete_thread",
            Self::RetireThread => "retire_thread",
            Self::ReapThread => "reap_thread",
            Self::Ban => "ban",
            Self::LiftBan => "lift_ban",
            Self::EditPost => "edit_post",
            Self::ColorChange => "color_change",
            Self::StickyChange => "sticky_change",
            Self::AppealAccept => "appeal_accept",
            Self::AppealReject => "appeal_reject",
        }
    }
}

impl Default for AuditAction {
    fn default() -> Self {
        Self::EditPost
    }
}

/// One audit record to be written. Unset references stay NULL; admin_id
/// None marks a system-initiated action.
#[derive(Debug, Clone, Default)]
pub struct AuditEntry {
    pub admin_id: Option<i32>,
    pub action: AuditAction,
    pub ip_address: String,
    pub board_id: Option<i32>,
    pub thread_id: Option<i32>,
    pub post_id: Option<i32>,
    pub ban_id: Option<i32>,
    pub reason: Option<String>,
    pub detail: Option<serde_json::Value>,
}

/// Insert the audit row inside the caller's transaction. A failure here
/// must fail the whole transaction; the trail never silently drops a write.
pub async fn record(txn: &DatabaseTransaction, entry: AuditEntry) -> Result<(), DbErr> {
    audit_log::ActiveModel {
        admin_id: Set(entry.admin_id),
        action: Set(entry.action.as_str().to_string()),
        ip_address: Set(entry.ip_address),
        board_id: Set(entry.board_id),
        thread_id: Set(entry.thread_id),
        post_id: Set(entry.post_id),
        ban_id: Set(entry.ban_id),
        reason: Set(entry.reason),
        detail: Set(entry.detail),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    Ok(())
}

/// Everything that ever happened to an IP address, newest first.
pub async fn entries_for_ip(ip_address: &str) -> Result<Vec<audit_log::Model>, DbErr> {
    audit_log::Entity::find()
        .filter(audit_log::Column::IpAddress.eq(ip_address))
        .order_by_desc(audit_log::Column::Id)
        .all(crate::db::get_db_pool())
        .await
}

/// Purge audit entries older than the retention horizon. Returns the number
/// of rows removed.
pub async fn prune_old_entries(retention_days: i64) -> Result<u64, DbErr> {
    let cutoff = Utc::now().naive_utc() - Duration::days(retention_days);

    let result = audit_log::Entity::delete_many()
        .filter(audit_log::Column::CreatedAt.lt(cutoff))
        .exec(crate::db::get_db_pool())
        .await?;

    if result.rows_affected > 0 {
        log::info!("pruned {} audit entries older than {} days", result.rows_affected, retention_days);
    }

    Ok(result.rows_affected)
}
