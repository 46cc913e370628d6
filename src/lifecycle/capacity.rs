//! Per-board active-thread quota enforcement.
//!
//! The real-time path (`enforce_board_capacity`) runs inside the
//! thread-creation transaction so two concurrent creators cannot both see a
//! free slot. The batch path (`sweep_excess`) is the janitor's convergence
//! backstop for capacity that slipped through a race or crash.

use crate::app_config;
use crate::moderation::audit::{self, AuditAction, AuditEntry};
use crate::notifications::{BoardEvent, PendingEvents};
use crate::orm::{boards, posts, threads};
use chrono::Utc;
use sea_orm::{entity::*, query::*, sea_query::Expr, DatabaseTransaction, DbErr, TransactionTrait};

/// Effective quota for a board: per-board override, or the global default.
/// A non-positive value disables enforcement.
pub fn board_quota(board: &boards::Model) -> i32 {
    board
        .max_active_threads
        .unwrap_or_else(|| app_config::lifecycle().max_active_threads)
}

/// Alive, non-sticky threads on a board. Sticky threads never count toward
/// the quota and are never evicted.
fn eligible_threads(board_id: i32) -> Select<threads::Entity> {
    threads::Entity::find()
        .filter(threads::Column::BoardId.eq(board_id))
        .filter(threads::Column::IsAlive.eq(true))
        .filter(threads::Column::IsSticky.eq(false))
}

/// Mark a thread dead, stamping its retirement time, and write the audit
/// record. `admin_id` is None for system-initiated retirements. The caller
/// owns the transaction; nothing is committed here.
pub(crate) async fn retire_in_txn(
    txn: &DatabaseTransaction,
    thread: &threads::Model,
    admin_id: Option<i32>,
    reason: &str,
) -> Result<(), DbErr> {
    let now = Utc::now().naive_utc();

    threads::Entity::update_many()
        .col_expr(threads::Column::IsAlive, Expr::value(false))
        .col_expr(threads::Column::RetiredAt, Expr::value(Some(now)))
        .filter(threads::Column::Id.eq(thread.id))
        .filter(threads::Column::IsAlive.eq(true))
        .exec(txn)
        .await?;

    // The trail is keyed to the OP's address.
    let op_ip = posts::Entity::find()
        .filter(posts::Column::ThreadId.eq(thread.id))
        .order_by_asc(posts::Column::Id)
        .one(txn)
        .await?
        .map(|p| p.ip_address)
        .unwrap_or_else(|| "0.0.0.0".to_string());

    audit::record(
        txn,
        AuditEntry {
            admin_id,
            action: AuditAction::RetireThread,
            ip_address: op_ip,
            board_id: Some(thread.board_id),
            thread_id: Some(thread.id),
            reason: Some(reason.to_string()),
            ..Default::default()
        },
    )
    .await
}

/// Enforce the quota for one board at thread-creation time.
///
/// Counts the board's alive non-sticky threads; if the count is at or above
/// the quota, retires the one with the oldest bump timestamp. Runs inside
/// the caller's thread-creation transaction. Returns the retired thread id,
/// if any, so the caller can emit the event after commit.
pub async fn enforce_board_capacity(
    txn: &DatabaseTransaction,
    board: &boards::Model,
) -> Result<Option<i32>, DbErr> {
    let quota = board_quota(board);
    if quota <= 0 {
        return Ok(None);
    }

    let alive = eligible_threads(board.id).all(txn).await?.len() as i32;
    if alive < quota {
        return Ok(None);
    }

    let oldest = eligible_threads(board.id)
        .order_by_asc(threads::Column::BumpedAt)
        .lock_exclusive()
        .one(txn)
        .await?;

    match oldest {
        Some(thread) => {
            log::info!(
                "board {}: at capacity ({}/{}), retiring thread {}",
                board.slug,
                alive,
                quota,
                thread.id
            );
            retire_in_txn(txn, &thread, None, "capacity eviction").await?;
            Ok(Some(thread.id))
        }
        None => Ok(None),
    }
}

/// Batch backstop: bring every board back under its quota.
///
/// For each board over capacity, retires exactly `count - quota` threads,
/// oldest bump first, in one transaction per board. Idempotent: a second
/// run with no intervening writes retires nothing.
pub async fn sweep_excess() -> Result<u64, DbErr> {
    let db = crate::db::get_db_pool();
    let mut total: u64 = 0;

    for board in boards::Entity::find().all(db).await? {
        let quota = board_quota(&board);
        if quota <= 0 {
            continue;
        }

        let txn = db.begin().await?;

        // Serialize against the real-time enforcer on the same board.
        if boards::Entity::find_by_id(board.id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .is_none()
        {
            continue;
        }

        let alive = eligible_threads(board.id).all(&txn).await?.len() as i32;
        if alive <= quota {
            continue;
        }

        let excess = (alive - quota) as u64;
        let victims = eligible_threads(board.id)
            .order_by_asc(threads::Column::BumpedAt)
            .limit(excess)
            .lock_exclusive()
            .all(&txn)
            .await?;

        let mut events = PendingEvents::new();
        for thread in &victims {
            retire_in_txn(&txn, thread, None, "capacity backstop").await?;
            events.push(BoardEvent::ThreadRetired {
                board_id: thread.board_id,
                thread_id: thread.id,
            });
        }

        txn.commit().await?;
        events.dispatch();

        log::info!(
            "board {}: backstop retired {} excess threads ({} alive, quota {})",
            board.slug,
            victims.len(),
            alive,
            quota
        );
        total += victims.len() as u64;
    }

    Ok(total)
}
