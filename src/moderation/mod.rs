//! Moderation services: bans and appeals
//!
//! Ban rows have a lifecycle independent of the content they were issued
//! for; they snapshot the offending post so the evidence survives the
//! post's deletion, and the snapshot's media key keeps the blob referenced
//! for the reconciler.

pub mod audit;

use crate::orm::{bans, posts};
use audit::{AuditAction, AuditEntry};
use chrono::Utc;
use sea_orm::{entity::*, query::*, sea_query::Expr, Condition, DbErr, TransactionTrait};

/// Input for issuing a ban. `post_id`, when set, is snapshotted onto the
/// ban row before anything happens to the post.
#[derive(Debug, Clone, Default)]
pub struct NewBan {
    pub ip_address: String,
    /// None = global ban
    pub board_id: Option<i32>,
    pub reason: String,
    pub expires_at: Option<chrono::NaiveDateTime>,
    pub post_id: Option<i32>,
    pub admin_id: Option<i32>,
}

/// Issue a ban, snapshotting the offending post and writing the audit row
/// in the same transaction.
pub async fn issue_ban(new_ban: NewBan) -> Result<bans::Model, DbErr> {
    let db = crate::db::get_db_pool();
    let txn = db.begin().await?;

    let offending_post = match new_ban.post_id {
        Some(post_id) => posts::Entity::find_by_id(post_id).one(&txn).await?,
        None => None,
    };

    let ban = bans::ActiveModel {
        ip_address: Set(new_ban.ip_address.clone()),
        board_id: Set(new_ban.board_id),
        reason: Set(new_ban.reason.clone()),
        expires_at: Set(new_ban.expires_at),
        is_active: Set(true),
        appeal: Set(None),
        appeal_status: Set(None),
        post_content: Set(offending_post.as_ref().map(|p| p.content.clone())),
        post_media_key: Set(offending_post.as_ref().and_then(|p| p.media_key.clone())),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    audit::record(
        &txn,
        AuditEntry {
            admin_id: new_ban.admin_id,
            action: AuditAction::Ban,
            ip_address: new_ban.ip_address,
            board_id: new_ban.board_id,
            post_id: new_ban.post_id,
            ban_id: Some(ban.id),
            reason: Some(new_ban.reason),
            ..Default::default()
        },
    )
    .await?;

    txn.commit().await?;
    Ok(ban)
}

/// Deactivate a ban. Audited.
pub async fn lift_ban(ban_id: i32, admin_id: Option<i32>, reason: &str) -> Result<(), DbErr> {
    let db = crate::db::get_db_pool();
    let txn = db.begin().await?;

    let ban = match bans::Entity::find_by_id(ban_id).one(&txn).await? {
        Some(ban) => ban,
        None => return Ok(()),
    };

    bans::Entity::update_many()
        .col_expr(bans::Column::IsActive, Expr::value(false))
        .filter(bans::Column::Id.eq(ban_id))
        .exec(&txn)
        .await?;

    audit::record(
        &txn,
        AuditEntry {
            admin_id,
            action: AuditAction::LiftBan,
            ip_address: ban.ip_address,
            board_id: ban.board_id,
            ban_id: Some(ban.id),
            reason: Some(reason.to_string()),
            ..Default::default()
        },
    )
    .await?;

    txn.commit().await
}

/// Is this IP currently banned, either globally or on the given board?
/// Used by the API layer to gate posting.
pub async fn is_ip_banned(ip_address: &str, board_id: Option<i32>) -> Result<bool, DbErr> {
    let now = Utc::now().naive_utc();

    let mut query = bans::Entity::find()
        .filter(bans::Column::IpAddress.eq(ip_address))
        .filter(bans::Column::IsActive.eq(true))
        .filter(
            Condition::any()
                .add(bans::Column::ExpiresAt.is_null())
                .add(bans::Column::ExpiresAt.gt(now)),
        );

    query = match board_id {
        Some(board_id) => query.filter(
            Condition::any()
                .add(bans::Column::BoardId.is_null())
                .add(bans::Column::BoardId.eq(board_id)),
        ),
        None => query.filter(bans::Column::BoardId.is_null()),
    };

    let count = query.count(crate::db::get_db_pool()).await?;
    Ok(count > 0)
}

/// Replace a post's content. Audited with the before/after in the detail
/// blob so the trail can reconstruct the edit.
pub async fn edit_post(post_id: i32, content: &str, admin_id: Option<i32>) -> Result<(), DbErr> {
    let db = crate::db::get_db_pool();
    let txn = db.begin().await?;

    let post = match posts::Entity::find_by_id(post_id).one(&txn).await? {
        Some(post) => post,
        None => return Ok(()),
    };

    posts::Entity::update_many()
        .col_expr(posts::Column::Content, Expr::value(content.to_string()))
        .filter(posts::Column::Id.eq(post.id))
        .exec(&txn)
        .await?;

    audit::record(
        &txn,
        AuditEntry {
            admin_id,
            action: AuditAction::EditPost,
            ip_address: post.ip_address,
            board_id: Some(post.board_id),
            thread_id: Some(post.thread_id),
            post_id: Some(post.id),
            detail: Some(serde_json::json!({
                "before": post.content,
                "after": content,
            })),
            ..Default::default()
        },
    )
    .await?;

    txn.commit().await
}

/// Change a post's display color tag. Audited.
pub async fn change_post_color(
    post_id: i32,
    color: &str,
    admin_id: Option<i32>,
) -> Result<(), DbErr> {
    let db = crate::db::get_db_pool();
    let txn = db.begin().await?;

    let post = match posts::Entity::find_by_id(post_id).one(&txn).await? {
        Some(post) => post,
        None => return Ok(()),
    };

    posts::Entity::update_many()
        .col_expr(posts::Column::NameColor, Expr::value(color.to_string()))
        .filter(posts::Column::Id.eq(post.id))
        .exec(&txn)
        .await?;

    audit::record(
        &txn,
        AuditEntry {
            admin_id,
            action: AuditAction::ColorChange,
            ip_address: post.ip_address,
            board_id: Some(post.board_id),
            thread_id: Some(post.thread_id),
            post_id: Some(post.id),
            detail: Some(serde_json::json!({
                "before": post.name_color,
                "after": color,
            })),
            ..Default::default()
        },
    )
    .await?;

    txn.commit().await
}

/// Attach an appeal to a ban; one appeal per ban, pending until decided.
pub async fn submit_appeal(ban_id: i32, text: &str) -> Result<(), DbErr> {
    bans::Entity::update_many()
        .col_expr(bans::Column::Appeal, Expr::value(Some(text.to_string())))
        .col_expr(
            bans::Column::AppealStatus,
            Expr::value(Some("pending".to_string())),
        )
        .filter(bans::Column::Id.eq(ban_id))
        .filter(bans::Column::AppealStatus.is_null())
        .exec(crate::db::get_db_pool())
        .await?;

    Ok(())
}

/// Decide a pending appeal. Accepting also lifts the ban. Audited.
pub async fn decide_appeal(
    ban_id: i32,
    admin_id: Option<i32>,
    accept: bool,
    reason: &str,
) -> Result<(), DbErr> {
    let db = crate::db::get_db_pool();
    let txn = db.begin().await?;

    let ban = match bans::Entity::find_by_id(ban_id).one(&txn).await? {
        Some(ban) => ban,
        None => return Ok(()),
    };

    let status = if accept { "accepted" } else { "rejected" };
    let mut update = bans::Entity::update_many()
        .col_expr(
            bans::Column::AppealStatus,
            Expr::value(Some(status.to_string())),
        )
        .filter(bans::Column::Id.eq(ban_id));
    if accept {
        update = update.col_expr(bans::Column::IsActive, Expr::value(false));
    }
    update.exec(&txn).await?;

    audit::record(
        &txn,
        AuditEntry {
            admin_id,
            action: if accept {
                AuditAction::AppealAccept
            } else {
                AuditAction::AppealReject
            },
            ip_address: ban.ip_address,
            board_id: ban.board_id,
            ban_id: Some(ban.id),
            reason: Some(reason.to_string()),
            ..Default::default()
        },
    )
    .await?;

    txn.commit().await
}
