//! Dead-thread retention and terminal destruction
//!
//! Threads retired past the retention window lose their rows (posts
//! cascade with the thread) in a single transaction. Their blobs are
//! deleted only after the commit, best-effort: the metadata deletion
//! never waits on the object store, and anything missed is picked up by
//! the reconciler.

use crate::app_config;
use crate::moderation::audit::{self, AuditAction, AuditEntry};
use crate::orm::{posts, threads};
use chrono::{Duration, Utc};
use sea_orm::{entity::*, query::*, DbErr, TransactionTrait};

/// Destroy every thread whose retirement age exceeds the retention window.
/// Returns the number of threads destroyed.
pub async fn reap_dead_threads() -> Result<u64, DbErr> {
    let retention_days = app_config::lifecycle().retention_days;
    let cutoff = Utc::now().naive_utc() - Duration::days(retention_days);

    let db = crate::db::get_db_pool();
    let expired = threads::Entity::find()
        .filter(threads::Column::IsAlive.eq(false))
        .filter(threads::Column::RetiredAt.lt(cutoff))
        .all(db)
        .await?;

    if expired.is_empty() {
        return Ok(0);
    }

    let thread_ids: Vec<i32> = expired.iter().map(|t| t.id).collect();

    let txn = db.begin().await?;

    // Collect blob keys and OP addresses before the rows go away.
    let doomed_posts = posts::Entity::find()
        .filter(posts::Column::ThreadId.is_in(thread_ids.clone()))
        .order_by_asc(posts::Column::Id)
        .all(&txn)
        .await?;

    let media_keys: Vec<String> = doomed_posts
        .iter()
        .filter_map(|p| p.media_key.clone())
        .collect();

    for thread in &expired {
        let op_ip = doomed_posts
            .iter()
            .find(|p| p.thread_id == thread.id)
            .map(|p| p.ip_address.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string());

        audit::record(
            &txn,
            AuditEntry {
                admin_id: None,
                action: AuditAction::ReapThread,
                ip_address: op_ip,
                board_id: Some(thread.board_id),
                thread_id: Some(thread.id),
                reason: Some(format!("retention window of {} days expired", retention_days)),
                ..Default::default()
            },
        )
        .await?;
    }

    // Posts cascade with their threads.
    let result = threads::Entity::delete_many()
        .filter(threads::Column::Id.is_in(thread_ids))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    let reaped = result.rows_affected;
    log::info!(
        "reaper: destroyed {} threads, scheduling {} blobs for deletion",
        reaped,
        media_keys.len()
    );

    // Only after the commit; never block metadata deletion on the store.
    actix_web::rt::spawn(async move {
        crate::lifecycle::delete_blobs_best_effort(media_keys).await;
    });

    Ok(reaped)
}
