/// Integration tests for bans and appeals
/// Ban rows outlive the content they were issued for and carry snapshots
/// of the offending post.
mod common;
use serial_test::serial;

use ashcan::moderation::{self, NewBan};
use ashcan::orm::bans;
use chrono::{Duration, Utc};
use common::{database::*, fixtures::*};
use sea_orm::entity::*;

#[actix_rt::test]
#[serial]
async fn test_ban_scoping_and_expiry() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let board_a = create_test_board(&db, "bana", None, None)
        .await
        .expect("Failed to create board");
    let board_b = create_test_board(&db, "banb", None, None)
        .await
        .expect("Failed to create board");

    // Board-scoped ban only bites on its own board.
    moderation::issue_ban(NewBan {
        ip_address: "192.0.2.10".to_string(),
        board_id: Some(board_a.id),
        reason: "spam".to_string(),
        ..Default::default()
    })
    .await
    .expect("Failed to issue ban");

    assert!(moderation::is_ip_banned("192.0.2.10", Some(board_a.id))
        .await
        .unwrap());
    assert!(!moderation::is_ip_banned("192.0.2.10", Some(board_b.id))
        .await
        .unwrap());

    // Global ban bites everywhere.
    moderation::issue_ban(NewBan {
        ip_address: "192.0.2.11".to_string(),
        board_id: None,
        reason: "ban evasion".to_string(),
        ..Default::default()
    })
    .await
    .expect("Failed to issue ban");

    assert!(moderation::is_ip_banned("192.0.2.11", Some(board_a.id))
        .await
        .unwrap());
    assert!(moderation::is_ip_banned("192.0.2.11", Some(board_b.id))
        .await
        .unwrap());
    assert!(moderation::is_ip_banned("192.0.2.11", None).await.unwrap());

    // An expired ban no longer bites.
    moderation::issue_ban(NewBan {
        ip_address: "192.0.2.12".to_string(),
        board_id: None,
        reason: "old news".to_string(),
        expires_at: Some(Utc::now().naive_utc() - Duration::hours(1)),
        ..Default::default()
    })
    .await
    .expect("Failed to issue ban");

    assert!(!moderation::is_ip_banned("192.0.2.12", None).await.unwrap());

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_ban_snapshots_offending_post() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let board = create_test_board(&db, "snap", None, None)
        .await
        .expect("Failed to create board");
    let thread = create_test_thread(&db, board.id, "thread")
        .await
        .expect("Failed to create thread");
    let post = create_test_post(
        &db,
        thread.id,
        board.id,
        "rule-breaking text",
        "192.0.2.20",
        Some("exhibit.png".to_string()),
    )
    .await
    .expect("Failed to create post");

    let ban = moderation::issue_ban(NewBan {
        ip_address: "192.0.2.20".to_string(),
        board_id: Some(board.id),
        reason: "rule 2".to_string(),
        post_id: Some(post.id),
        admin_id: Some(7),
        ..Default::default()
    })
    .await
    .expect("Failed to issue ban");

    assert_eq!(ban.post_content.as_deref(), Some("rule-breaking text"));
    assert_eq!(ban.post_media_key.as_deref(), Some("exhibit.png"));

    // Destroy the thread; the ban row and its snapshot survive.
    ashcan::lifecycle::delete_thread(thread.id, Some(7), "removed")
        .await
        .expect("Failed to delete thread");

    let surviving = bans::Entity::find_by_id(ban.id)
        .one(&db)
        .await
        .unwrap()
        .expect("ban must outlive the content it was issued for");
    assert_eq!(surviving.post_content.as_deref(), Some("rule-breaking text"));
    assert_eq!(surviving.post_media_key.as_deref(), Some("exhibit.png"));

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_appeal_lifecycle() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let ban = moderation::issue_ban(NewBan {
        ip_address: "192.0.2.30".to_string(),
        board_id: None,
        reason: "misunderstanding".to_string(),
        ..Default::default()
    })
    .await
    .expect("Failed to issue ban");

    moderation::submit_appeal(ban.id, "it wasn't me")
        .await
        .expect("Failed to submit appeal");

    let pending = bans::Entity::find_by_id(ban.id).one(&db).await.unwrap().unwrap();
    assert_eq!(pending.appeal.as_deref(), Some("it wasn't me"));
    assert_eq!(pending.appeal_status.as_deref(), Some("pending"));

    // Accepting the appeal lifts the ban.
    moderation::decide_appeal(ban.id, Some(3), true, "checks out")
        .await
        .expect("Failed to decide appeal");

    let decided = bans::Entity::find_by_id(ban.id).one(&db).await.unwrap().unwrap();
    assert_eq!(decided.appeal_status.as_deref(), Some("accepted"));
    assert!(!decided.is_active);
    assert!(!moderation::is_ip_banned("192.0.2.30", None).await.unwrap());

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_lift_ban() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let ban = moderation::issue_ban(NewBan {
        ip_address: "192.0.2.40".to_string(),
        board_id: None,
        reason: "temporary".to_string(),
        ..Default::default()
    })
    .await
    .expect("Failed to issue ban");

    assert!(moderation::is_ip_banned("192.0.2.40", None).await.unwrap());

    moderation::lift_ban(ban.id, Some(2), "served their time")
        .await
        .expect("Failed to lift ban");

    assert!(!moderation::is_ip_banned("192.0.2.40", None).await.unwrap());

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}
