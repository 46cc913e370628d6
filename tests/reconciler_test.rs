/// Integration tests for blob reconciliation across the two stores
/// Rows are the source of truth; blobs with no referencing row are
/// reclaimed once they age out of the grace window, and never before.
mod common;
use serial_test::serial;

use ashcan::janitor::reconcile;
use ashcan::moderation::{self, NewBan};
use common::{database::*, fixtures::*};

const GRACE_SECONDS: i64 = 3600;

#[actix_rt::test]
#[serial]
async fn test_orphan_outside_grace_window_is_deleted() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");
    let store = memory_storage();
    store.clear();

    // Two hours old, referenced by nothing.
    store.insert_with_age("orphan.jpg", vec![1, 2, 3], 120);
    // Ten minutes old: inside the upload-to-commit grace window.
    store.insert_with_age("fresh.jpg", vec![4, 5, 6], 10);

    let report = reconcile::reconcile_blobs(store.as_ref(), GRACE_SECONDS)
        .await
        .expect("Reconciler failed");

    assert_eq!(report.present, 2);
    assert_eq!(report.orphans, 2);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.errors, 0);
    assert!(!store.contains("orphan.jpg"), "stale orphan must be reclaimed");
    assert!(store.contains("fresh.jpg"), "grace window must spare fresh uploads");

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_post_referenced_blob_survives() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");
    let store = memory_storage();
    store.clear();

    let board = create_test_board(&db, "recon", None, None)
        .await
        .expect("Failed to create board");
    let thread = create_test_thread(&db, board.id, "media thread")
        .await
        .expect("Failed to create thread");
    create_test_post(
        &db,
        thread.id,
        board.id,
        "",
        "10.3.0.1",
        Some("attached.png".to_string()),
    )
    .await
    .expect("Failed to create post");

    // Ancient, but referenced: must survive any grace value.
    store.insert_with_age("attached.png", vec![7, 7, 7], 60 * 24 * 30);

    for grace in [0, GRACE_SECONDS] {
        let report = reconcile::reconcile_blobs(store.as_ref(), grace)
            .await
            .expect("Reconciler failed");
        assert_eq!(report.deleted, 0);
        assert!(store.contains("attached.png"));
    }

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_ban_snapshot_keeps_blob_after_post_is_gone() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");
    let store = memory_storage();
    store.clear();

    let board = create_test_board(&db, "bansnap", None, None)
        .await
        .expect("Failed to create board");
    let thread = create_test_thread(&db, board.id, "evidence")
        .await
        .expect("Failed to create thread");
    let post = create_test_post(
        &db,
        thread.id,
        board.id,
        "offending content",
        "198.51.100.9",
        Some("evidence.webm".to_string()),
    )
    .await
    .expect("Failed to create post");

    store.insert_with_age("evidence.webm", vec![9; 64], 600);

    // Ban snapshots the post, then the thread (and post) are destroyed.
    moderation::issue_ban(NewBan {
        ip_address: "198.51.100.9".to_string(),
        board_id: Some(board.id),
        reason: "rule 1".to_string(),
        post_id: Some(post.id),
        ..Default::default()
    })
    .await
    .expect("Failed to issue ban");

    ashcan::lifecycle::delete_thread(thread.id, Some(1), "cleanup")
        .await
        .expect("Failed to delete thread");

    // The originating row is gone, but the ban's archived media reference
    // must keep the blob alive.
    let report = reconcile::reconcile_blobs(store.as_ref(), 0)
        .await
        .expect("Reconciler failed");
    assert_eq!(report.deleted, 0);
    assert!(
        store.contains("evidence.webm"),
        "ban-archived blobs must never be reclaimed"
    );

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_reconciler_is_idempotent() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");
    let store = memory_storage();
    store.clear();

    store.insert_with_age("stale-a.jpg", vec![1], 180);
    store.insert_with_age("stale-b.jpg", vec![2], 240);

    let first = reconcile::reconcile_blobs(store.as_ref(), GRACE_SECONDS)
        .await
        .expect("Reconciler failed");
    assert_eq!(first.deleted, 2);

    // Nothing uploaded since: a second pass finds nothing to delete.
    let second = reconcile::reconcile_blobs(store.as_ref(), GRACE_SECONDS)
        .await
        .expect("Reconciler failed");
    assert_eq!(second.present, 0);
    assert_eq!(second.deleted, 0);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}
