//! Periodic maintenance tasks
//!
//! Four tasks converge the system toward a consistent state: the reaper
//! (dead-thread retention), the capacity backstop, the blob reconciler,
//! and audit-log retention. They run together on one schedule; an
//! "already running" guard skips a tick rather than queueing behind a
//! slow run. Each task's error is caught and recorded so its siblings
//! still execute.

pub mod reaper;
pub mod reconcile;

use crate::app_config;
use crate::lifecycle::capacity;
use crate::moderation::audit;
use reconcile::ReconcileReport;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static JANITOR_RUNNING: AtomicBool = AtomicBool::new(false);

/// Outcome of one janitor run.
#[derive(Debug, Default, Serialize)]
pub struct JanitorReport {
    /// Threads destroyed by the reaper
    pub reaped: u64,
    /// Threads retired by the capacity backstop
    pub retired: u64,
    /// Blob reconciliation outcome, if the pass ran
    pub reconcile: Option<ReconcileReport>,
    /// Audit entries purged by log retention
    pub audit_pruned: u64,
    /// Per-task failures; a failed task never stops its siblings
    pub errors: Vec<String>,
}

/// Run every maintenance task once. Returns None if a previous run is
/// still in flight (the overlapping tick is skipped, not queued).
pub async fn run_all() -> Option<JanitorReport> {
    if JANITOR_RUNNING.swap(true, Ordering::SeqCst) {
        log::warn!("janitor: previous run still in progress, skipping this tick");
        return None;
    }

    let report = run_all_inner().await;
    JANITOR_RUNNING.store(false, Ordering::SeqCst);
    Some(report)
}

async fn run_all_inner() -> JanitorReport {
    let mut report = JanitorReport::default();
    let lifecycle_conf = app_config::lifecycle();

    match reaper::reap_dead_threads().await {
        Ok(reaped) => report.reaped = reaped,
        Err(e) => report.errors.push(format!("reaper: {}", e)),
    }

    match capacity::sweep_excess().await {
        Ok(retired) => report.retired = retired,
        Err(e) => report.errors.push(format!("backstop: {}", e)),
    }

    match crate::storage::try_get_storage() {
        Some(store) => {
            match reconcile::reconcile_blobs(store.as_ref(), lifecycle_conf.orphan_grace_seconds)
                .await
            {
                Ok(r) => report.reconcile = Some(r),
                Err(e) => report.errors.push(format!("reconciler: {}", e)),
            }
        }
        None => report
            .errors
            .push("reconciler: storage not initialized".to_string()),
    }

    match audit::prune_old_entries(lifecycle_conf.audit_retention_days).await {
        Ok(pruned) => report.audit_pruned = pruned,
        Err(e) => report.errors.push(format!("audit retention: {}", e)),
    }

    if report.errors.is_empty() {
        log::info!(
            "janitor: reaped {}, retired {}, pruned {} audit entries",
            report.reaped,
            report.retired,
            report.audit_pruned
        );
    } else {
        log::warn!("janitor: completed with errors: {:?}", report.errors);
    }

    report
}

/// Spawn the interval loop on the actix runtime. Called once from main.
pub fn spawn_scheduler() {
    let interval_seconds = app_config::janitor().interval_seconds;

    actix_web::rt::spawn(async move {
        let mut interval =
            actix_web::rt::time::interval(Duration::from_secs(interval_seconds.max(1)));
        // The first tick fires immediately; skip it so startup isn't
        // competing with a full maintenance pass.
        interval.tick().await;
        loop {
            interval.tick().await;
            run_all().await;
        }
    });

    log::info!("janitor scheduled every {} seconds", interval_seconds);
}
