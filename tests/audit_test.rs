/// Integration tests for the audit trail
/// Every lifecycle-affecting action leaves exactly one record keyed to the
/// affected address; the trail is append-only except for its own
/// retention horizon.
mod common;
use serial_test::serial;

use ashcan::lifecycle::{self, NewPostContent};
use ashcan::moderation::{self, audit, NewBan};
use ashcan::orm::audit_log;
use chrono::{Duration, Utc};
use common::{database::*, fixtures::*};
use sea_orm::{entity::*, query::*, sea_query::Expr};

#[actix_rt::test]
#[serial]
async fn test_moderation_actions_are_audited() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let board = create_test_board(&db, "trail", None, None)
        .await
        .expect("Failed to create board");
    let thread = create_test_thread(&db, board.id, "watched")
        .await
        .expect("Failed to create thread");
    let post = create_test_post(&db, thread.id, board.id, "text", "203.0.113.99", None)
        .await
        .expect("Failed to create post");

    moderation::edit_post(post.id, "edited text", Some(5))
        .await
        .expect("Failed to edit post");
    moderation::change_post_color(post.id, "#ff0000", Some(5))
        .await
        .expect("Failed to change color");
    let ban = moderation::issue_ban(NewBan {
        ip_address: "203.0.113.99".to_string(),
        board_id: Some(board.id),
        reason: "enough".to_string(),
        post_id: Some(post.id),
        admin_id: Some(5),
        ..Default::default()
    })
    .await
    .expect("Failed to issue ban");
    lifecycle::delete_post(post.id, Some(5), "removed")
        .await
        .expect("Failed to delete post");

    // The whole history of the address, newest first.
    let history = audit::entries_for_ip("203.0.113.99")
        .await
        .expect("Failed to read audit trail");
    let actions: Vec<&str> = history.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["delete_post", "ban", "color_change", "edit_post"]);

    // Each entry names its acting admin and its targets.
    for entry in &history {
        assert_eq!(entry.admin_id, Some(5));
    }
    let ban_entry = history.iter().find(|e| e.action == "ban").unwrap();
    assert_eq!(ban_entry.ban_id, Some(ban.id));

    // The edit keeps the before/after in its detail blob.
    let edit_entry = history.iter().find(|e| e.action == "edit_post").unwrap();
    let detail = edit_entry.detail.as_ref().expect("edit must carry detail");
    assert_eq!(detail["before"], "text");
    assert_eq!(detail["after"], "edited text");

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_capacity_eviction_is_audited_as_system_action() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let board = create_test_board(&db, "sysaudit", Some(1), None)
        .await
        .expect("Failed to create board");

    let op = |ip: &str| NewPostContent {
        content: "OP".to_string(),
        ip_address: ip.to_string(),
        ..Default::default()
    };

    let first = lifecycle::create_thread(board.id, None, op("203.0.113.10"))
        .await
        .expect("Failed to create thread");
    lifecycle::create_thread(board.id, None, op("203.0.113.11"))
        .await
        .expect("Failed to create thread");

    let entry = audit_log::Entity::find()
        .filter(audit_log::Column::Action.eq("retire_thread"))
        .one(&db)
        .await
        .unwrap()
        .expect("capacity eviction must be audited");
    assert_eq!(entry.admin_id, None, "automatic retirement has no acting admin");
    assert_eq!(entry.thread_id, Some(first.id));
    assert_eq!(entry.ip_address, "203.0.113.10");

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_audit_retention_prunes_only_old_entries() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let ban = moderation::issue_ban(NewBan {
        ip_address: "203.0.113.200".to_string(),
        board_id: None,
        reason: "old".to_string(),
        ..Default::default()
    })
    .await
    .expect("Failed to issue ban");
    moderation::lift_ban(ban.id, None, "recent")
        .await
        .expect("Failed to lift ban");

    // Age the ban entry past the horizon; the lift entry stays recent.
    audit_log::Entity::update_many()
        .col_expr(
            audit_log::Column::CreatedAt,
            Expr::value(Utc::now().naive_utc() - Duration::days(365)),
        )
        .filter(audit_log::Column::Action.eq("ban"))
        .exec(&db)
        .await
        .unwrap();

    let pruned = audit::prune_old_entries(180)
        .await
        .expect("Failed to prune audit log");
    assert_eq!(pruned, 1);

    let remaining = audit_log::Entity::find().all(&db).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].action, "lift_ban");

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}
