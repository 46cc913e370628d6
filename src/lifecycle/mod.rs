//! Content lifecycle services
//!
//! Everything that creates, bumps, retires, or destroys boards' content
//! goes through here. Thread and post creation run one transaction per
//! request; the capacity and bump decisions are made inside that
//! transaction so concurrent posters on the same board or thread are
//! linearized by the database's row locks. Notification events are
//! buffered during the transaction and dispatched only after commit.

pub mod bump;
pub mod capacity;

use crate::app_config;
use crate::constants::DEFAULT_NAME_COLOR;
use crate::moderation::audit::{self, AuditAction, AuditEntry};
use crate::notifications::{BoardEvent, PendingEvents};
use crate::orm::posts::MediaKind;
use crate::orm::{bans, boards, posts, threads};
use crate::poster_id;
use chrono::Utc;
use sea_orm::{entity::*, query::*, sea_query::Expr, DbErr, TransactionTrait};

/// Lifecycle operation errors, surfaced to the caller as rejected
/// operations rather than degraded writes.
#[derive(Debug)]
pub enum LifecycleError {
    /// Board does not exist
    BoardNotFound(i32),
    /// Thread does not exist
    ThreadNotFound(i32),
    /// Post does not exist
    PostNotFound(i32),
    /// Thread is retired and no longer accepts posts
    ThreadDead(i32),
    /// Post has neither content nor media
    EmptyPost,
    /// Database error
    Db(DbErr),
}

impl std::fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleError::BoardNotFound(id) => write!(f, "Board {} not found", id),
            LifecycleError::ThreadNotFound(id) => write!(f, "Thread {} not found", id),
            LifecycleError::PostNotFound(id) => write!(f, "Post {} not found", id),
            LifecycleError::ThreadDead(id) => {
                write!(f, "Thread {} is archived and no longer accepts posts", id)
            }
            LifecycleError::EmptyPost => write!(f, "Post must have content or media"),
            LifecycleError::Db(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for LifecycleError {}

impl From<DbErr> for LifecycleError {
    fn from(e: DbErr) -> Self {
        LifecycleError::Db(e)
    }
}

/// Input for one post, whether it opens a thread or replies to one.
#[derive(Debug, Clone, Default)]
pub struct NewPostContent {
    pub content: String,
    pub media_key: Option<String>,
    pub media_kind: Option<MediaKind>,
    pub ip_address: String,
    pub country_code: Option<String>,
    pub name_color: Option<String>,
    pub suppress_bump: bool,
}

impl NewPostContent {
    fn validate(&self) -> Result<(), LifecycleError> {
        if self.content.trim().is_empty() && self.media_key.is_none() {
            return Err(LifecycleError::EmptyPost);
        }
        Ok(())
    }
}

/// Create a thread with its opening post.
///
/// Capacity enforcement, the thread insert, and the OP insert share one
/// transaction: if the board is at its quota the oldest-bumped non-sticky
/// thread is retired before the insert, and a failure anywhere rolls back
/// the whole operation. Events go out after commit.
pub async fn create_thread(
    board_id: i32,
    subject: Option<String>,
    op: NewPostContent,
) -> Result<threads::Model, LifecycleError> {
    op.validate()?;

    let db = crate::db::get_db_pool();
    let txn = db.begin().await?;

    // Lock the board row so concurrent creators on this board serialize
    // through the capacity check.
    let board = boards::Entity::find_by_id(board_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or(LifecycleError::BoardNotFound(board_id))?;

    let mut events = PendingEvents::new();
    if let Some(retired_id) = capacity::enforce_board_capacity(&txn, &board).await? {
        events.push(BoardEvent::ThreadRetired {
            board_id: board.id,
            thread_id: retired_id,
        });
    }

    let now = Utc::now().naive_utc();

    let thread = threads::ActiveModel {
        board_id: Set(board.id),
        subject: Set(subject.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())),
        created_at: Set(now),
        bumped_at: Set(now),
        salt: Set(uuid::Uuid::new_v4().to_string()),
        is_sticky: Set(false),
        is_alive: Set(true),
        retired_at: Set(None),
        post_count: Set(1),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    insert_post(&txn, &thread, &board, &op, now).await?;

    txn.commit().await?;

    events.push(BoardEvent::ThreadCreated {
        board_id: board.id,
        thread_id: thread.id,
    });
    events.dispatch();

    Ok(thread)
}

/// Append a post to an alive thread.
///
/// The thread row is locked for the duration of the transaction, so the
/// bump decision always sees the reply count as of this post and two
/// concurrent replies cannot both read a stale pre-limit count. Posting to
/// a dead thread is an error, checked before anything else.
pub async fn create_post(
    thread_id: i32,
    reply: NewPostContent,
) -> Result<posts::Model, LifecycleError> {
    reply.validate()?;

    let db = crate::db::get_db_pool();
    let txn = db.begin().await?;

    let thread = threads::Entity::find_by_id(thread_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or(LifecycleError::ThreadNotFound(thread_id))?;

    if !thread.is_alive {
        return Err(LifecycleError::ThreadDead(thread_id));
    }

    let board = boards::Entity::find_by_id(thread.board_id)
        .one(&txn)
        .await?
        .ok_or(LifecycleError::BoardNotFound(thread.board_id))?;

    let bump_limit = board
        .bump_limit
        .unwrap_or_else(|| app_config::lifecycle().bump_limit);

    // Reply count before this post; the OP is post_count's first unit.
    let reply_count = thread.post_count - 1;
    let bumps = bump::should_bump(reply_count, bump_limit, reply.suppress_bump);

    let now = Utc::now().naive_utc();
    let post = insert_post(&txn, &thread, &board, &reply, now).await?;

    let mut update = threads::Entity::update_many()
        .col_expr(
            threads::Column::PostCount,
            Expr::value(thread.post_count + 1),
        )
        .filter(threads::Column::Id.eq(thread.id));
    if bumps {
        update = update.col_expr(threads::Column::BumpedAt, Expr::value(now));
    }
    update.exec(&txn).await?;

    txn.commit().await?;

    let mut events = PendingEvents::new();
    events.push(BoardEvent::PostCreated {
        board_id: board.id,
        thread_id: thread.id,
        post_id: post.id,
    });
    events.dispatch();

    Ok(post)
}

/// Shared insert for the OP and replies. Derives the pseudonymous poster
/// ID when the board asks for one, and carries the country code only on
/// flag-enabled boards.
async fn insert_post(
    txn: &sea_orm::DatabaseTransaction,
    thread: &threads::Model,
    board: &boards::Model,
    content: &NewPostContent,
    now: chrono::NaiveDateTime,
) -> Result<posts::Model, DbErr> {
    let derived_id = if board.show_poster_ids {
        Some(poster_id::poster_id_for(
            &content.ip_address,
            thread.id,
            &thread.salt,
        ))
    } else {
        None
    };

    let country = if board.show_flags {
        content.country_code.clone()
    } else {
        None
    };

    posts::ActiveModel {
        thread_id: Set(thread.id),
        board_id: Set(board.id),
        content: Set(content.content.trim().to_owned()),
        media_key: Set(content.media_key.clone()),
        media_kind: Set(content.media_kind.clone()),
        ip_address: Set(content.ip_address.clone()),
        poster_id: Set(derived_id),
        country_code: Set(country),
        name_color: Set(content
            .name_color
            .clone()
            .unwrap_or_else(|| DEFAULT_NAME_COLOR.to_string())),
        suppress_bump: Set(content.suppress_bump),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await
}

/// Moderator retirement: transition a thread to dead ahead of capacity.
/// A no-op when the thread is already dead (the transition is one-way and
/// happens exactly once).
pub async fn retire_thread(
    thread_id: i32,
    admin_id: Option<i32>,
    reason: &str,
) -> Result<(), LifecycleError> {
    let db = crate::db::get_db_pool();
    let txn = db.begin().await?;

    let thread = threads::Entity::find_by_id(thread_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or(LifecycleError::ThreadNotFound(thread_id))?;

    if !thread.is_alive {
        return Ok(());
    }

    capacity::retire_in_txn(&txn, &thread, admin_id, reason).await?;

    txn.commit().await?;

    let mut events = PendingEvents::new();
    events.push(BoardEvent::ThreadRetired {
        board_id: thread.board_id,
        thread_id: thread.id,
    });
    events.dispatch();

    Ok(())
}

/// Destroy a thread immediately, in any state. Posts cascade with the row;
/// their blobs are deleted best-effort after the transaction commits.
pub async fn delete_thread(
    thread_id: i32,
    admin_id: Option<i32>,
    reason: &str,
) -> Result<(), LifecycleError> {
    let db = crate::db::get_db_pool();
    let txn = db.begin().await?;

    let thread = threads::Entity::find_by_id(thread_id)
        .one(&txn)
        .await?
        .ok_or(LifecycleError::ThreadNotFound(thread_id))?;

    let thread_posts = posts::Entity::find()
        .filter(posts::Column::ThreadId.eq(thread.id))
        .order_by_asc(posts::Column::Id)
        .all(&txn)
        .await?;

    let op_ip = thread_posts
        .first()
        .map(|p| p.ip_address.clone())
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let media_keys: Vec<String> = thread_posts
        .iter()
        .filter_map(|p| p.media_key.clone())
        .collect();

    audit::record(
        &txn,
        AuditEntry {
            admin_id,
            action: AuditAction::DeleteThread,
            ip_address: op_ip,
            board_id: Some(thread.board_id),
            thread_id: Some(thread.id),
            reason: Some(reason.to_string()),
            ..Default::default()
        },
    )
    .await?;

    threads::Entity::delete_by_id(thread.id).exec(&txn).await?;

    txn.commit().await?;

    delete_blobs_best_effort(media_keys).await;

    let mut events = PendingEvents::new();
    events.push(BoardEvent::ThreadDeleted {
        board_id: thread.board_id,
        thread_id: thread.id,
    });
    events.dispatch();

    Ok(())
}

/// Destroy a single post. The thread's cached count is corrected in the
/// same transaction; the blob is deleted best-effort after commit.
pub async fn delete_post(
    post_id: i32,
    admin_id: Option<i32>,
    reason: &str,
) -> Result<(), LifecycleError> {
    let db = crate::db::get_db_pool();
    let txn = db.begin().await?;

    let post = posts::Entity::find_by_id(post_id)
        .one(&txn)
        .await?
        .ok_or(LifecycleError::PostNotFound(post_id))?;

    audit::record(
        &txn,
        AuditEntry {
            admin_id,
            action: AuditAction::DeletePost,
            ip_address: post.ip_address.clone(),
            board_id: Some(post.board_id),
            thread_id: Some(post.thread_id),
            post_id: Some(post.id),
            reason: Some(reason.to_string()),
            ..Default::default()
        },
    )
    .await?;

    posts::Entity::delete_by_id(post.id).exec(&txn).await?;

    threads::Entity::update_many()
        .col_expr(
            threads::Column::PostCount,
            Expr::col(threads::Column::PostCount).sub(1),
        )
        .filter(threads::Column::Id.eq(post.thread_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    if let Some(key) = post.media_key.clone() {
        delete_blobs_best_effort(vec![key]).await;
    }

    let mut events = PendingEvents::new();
    events.push(BoardEvent::PostDeleted {
        board_id: post.board_id,
        thread_id: post.thread_id,
        post_id: post.id,
    });
    events.dispatch();

    Ok(())
}

/// Best-effort blob cleanup after a commit. Keys still referenced by a ban
/// snapshot are left for the ban's lifetime; failures are logged and left
/// to the reconciler.
pub(crate) async fn delete_blobs_best_effort(keys: Vec<String>) {
    let storage = match crate::storage::try_get_storage() {
        Some(s) => s,
        None => {
            log::warn!("storage not initialized, leaving {} blobs for the reconciler", keys.len());
            return;
        }
    };

    let db = crate::db::get_db_pool();
    for key in keys {
        let still_referenced = bans::Entity::find()
            .filter(bans::Column::PostMediaKey.eq(key.clone()))
            .count(db)
            .await
            .unwrap_or(0)
            > 0;
        if still_referenced {
            log::debug!("blob {} retained: referenced by a ban snapshot", key);
            continue;
        }

        if let Err(e) = storage.delete_object(&key).await {
            log::warn!("best-effort blob delete failed for {}: {}", key, e);
        }
    }
}

/// Toggle sticky status. Only alive threads may change: a dead thread
/// never becomes sticky-exempted retroactively.
pub async fn set_sticky(
    thread_id: i32,
    sticky: bool,
    admin_id: Option<i32>,
) -> Result<(), LifecycleError> {
    let db = crate::db::get_db_pool();
    let txn = db.begin().await?;

    let thread = threads::Entity::find_by_id(thread_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or(LifecycleError::ThreadNotFound(thread_id))?;

    if !thread.is_alive {
        return Err(LifecycleError::ThreadDead(thread_id));
    }

    threads::Entity::update_many()
        .col_expr(threads::Column::IsSticky, Expr::value(sticky))
        .filter(threads::Column::Id.eq(thread.id))
        .exec(&txn)
        .await?;

    let op_ip = posts::Entity::find()
        .filter(posts::Column::ThreadId.eq(thread.id))
        .order_by_asc(posts::Column::Id)
        .one(&txn)
        .await?
        .map(|p| p.ip_address)
        .unwrap_or_else(|| "0.0.0.0".to_string());

    audit::record(
        &txn,
        AuditEntry {
            admin_id,
            action: AuditAction::StickyChange,
            ip_address: op_ip,
            board_id: Some(thread.board_id),
            thread_id: Some(thread.id),
            detail: Some(serde_json::json!({ "sticky": sticky })),
            ..Default::default()
        },
    )
    .await?;

    txn.commit().await?;
    Ok(())
}

// Queries exposed to the moderation/API layer.

/// Is this thread accepting posts?
pub async fn is_thread_alive(thread_id: i32) -> Result<bool, LifecycleError> {
    let thread = threads::Entity::find_by_id(thread_id)
        .one(crate::db::get_db_pool())
        .await?
        .ok_or(LifecycleError::ThreadNotFound(thread_id))?;
    Ok(thread.is_alive)
}

/// Cached post count, OP included.
pub async fn thread_post_count(thread_id: i32) -> Result<i32, LifecycleError> {
    let thread = threads::Entity::find_by_id(thread_id)
        .one(crate::db::get_db_pool())
        .await?
        .ok_or(LifecycleError::ThreadNotFound(thread_id))?;
    Ok(thread.post_count)
}

/// Alive non-sticky threads on a board right now.
pub async fn active_thread_count(board_id: i32) -> Result<u64, DbErr> {
    let count = threads::Entity::find()
        .filter(threads::Column::BoardId.eq(board_id))
        .filter(threads::Column::IsAlive.eq(true))
        .filter(threads::Column::IsSticky.eq(false))
        .count(crate::db::get_db_pool())
        .await?;
    Ok(count as u64)
}
