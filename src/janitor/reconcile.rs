//! Orphan-blob reconciliation between the object store and the database
//!
//! There is no shared transaction across the two stores, so they drift:
//! an upload whose request died before its row committed leaves a blob
//! with no reference. The reconciler converges them in one direction only:
//! rows are the truth, and a blob nothing references gets reclaimed. A
//! blob is never trusted the other way around, and no row is ever touched
//! because its blob went missing.
//!
//! The grace window covers the gap between an upload finishing and its
//! owning row committing; a fresh unreferenced blob is left alone until
//! the window passes.

use crate::orm::{bans, posts};
use crate::storage::{self, ObjectInfo, StorageBackend};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{entity::*, query::*, DbErr};
use serde::Serialize;
use std::collections::HashSet;

/// Outcome of one reconciliation pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReconcileReport {
    /// Blobs physically present in the object store
    pub present: usize,
    /// Distinct keys referenced by live rows
    pub referenced: usize,
    /// Unreferenced blobs found (including those inside the grace window)
    pub orphans: usize,
    /// Orphans actually deleted this pass
    pub deleted: usize,
    /// Per-item deletion failures, logged and skipped
    pub errors: usize,
}

/// Every media key a live row still points at: post attachments plus the
/// snapshots that ban records keep after the originating post is gone.
pub async fn referenced_media_keys() -> Result<HashSet<String>, DbErr> {
    let db = crate::db::get_db_pool();
    let mut keys = HashSet::new();

    let post_keys = posts::Entity::find()
        .filter(posts::Column::MediaKey.is_not_null())
        .all(db)
        .await?;
    keys.extend(post_keys.into_iter().filter_map(|p| p.media_key));

    let ban_keys = bans::Entity::find()
        .filter(bans::Column::PostMediaKey.is_not_null())
        .all(db)
        .await?;
    keys.extend(ban_keys.into_iter().filter_map(|b| b.post_media_key));

    Ok(keys)
}

/// Pure orphan selection: present minus referenced, minus anything still
/// inside the grace window. A blob with no last-modified time is treated
/// as fresh and spared; the next pass will see it with a timestamp.
pub fn find_orphans(
    present: &[ObjectInfo],
    referenced: &HashSet<String>,
    grace: Duration,
    now: DateTime<Utc>,
) -> Vec<String> {
    present
        .iter()
        .filter(|obj| !referenced.contains(&obj.key))
        .filter(|obj| match obj.last_modified {
            Some(modified) => now - modified > grace,
            None => false,
        })
        .map(|obj| obj.key.clone())
        .collect()
}

/// One full reconciliation pass. Individual deletion failures are counted
/// and skipped; the pass is idempotent and whatever is missed heals on the
/// next run.
pub async fn reconcile_blobs(
    store: &dyn StorageBackend,
    grace_seconds: i64,
) -> Result<ReconcileReport, Box<dyn std::error::Error + Send + Sync>> {
    let present = storage::list_all_objects(store).await?;
    let referenced = referenced_media_keys().await?;

    let orphan_candidates: usize = present
        .iter()
        .filter(|obj| !referenced.contains(&obj.key))
        .count();

    let to_delete = find_orphans(
        &present,
        &referenced,
        Duration::seconds(grace_seconds),
        Utc::now(),
    );

    let mut report = ReconcileReport {
        present: present.len(),
        referenced: referenced.len(),
        orphans: orphan_candidates,
        deleted: 0,
        errors: 0,
    };

    for key in to_delete {
        match store.delete_object(&key).await {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                log::warn!("reconciler: failed to delete orphan {}: {}", key, e);
                report.errors += 1;
            }
        }
    }

    log::info!(
        "reconciler: {} present, {} referenced, {} orphans, {} deleted, {} errors",
        report.present,
        report.referenced,
        report.orphans,
        report.deleted,
        report.errors
    );

    Ok(report)
}
