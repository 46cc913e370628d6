//! Moderation and maintenance endpoints
//!
//! Guarded by a shared moderator key header; real identity and session
//! management live upstream. The optional x-admin-id header attributes
//! actions in the audit trail.

use super::lifecycle_error;
use crate::moderation::{self, audit, NewBan};
use crate::orm::boards;
use crate::{app_config, janitor, lifecycle};
use actix_web::{delete, error, get, post, web, Error, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use sea_orm::{entity::*, ActiveValue::Set};
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(create_board)
        .service(retire_thread)
        .service(delete_thread)
        .service(set_sticky)
        .service(delete_post)
        .service(edit_post)
        .service(change_post_color)
        .service(issue_ban)
        .service(lift_ban)
        .service(decide_appeal)
        .service(audit_for_ip)
        .service(run_janitor)
        .service(submit_appeal);
}

/// Reject the request unless it carries the configured moderator key.
/// With no key configured, the whole surface is disabled.
fn require_mod_key(req: &HttpRequest) -> Result<(), Error> {
    let expected = app_config::moderation().mod_key;
    if expected.is_empty() {
        return Err(error::ErrorForbidden("Moderation endpoints are disabled."));
    }

    let provided = req
        .headers()
        .get("x-mod-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided != expected {
        return Err(error::ErrorForbidden("Invalid moderator key."));
    }

    Ok(())
}

/// Acting admin from the upstream auth layer, if it passed one along.
fn admin_id(req: &HttpRequest) -> Option<i32> {
    req.headers()
        .get("x-admin-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

#[derive(Deserialize, Validate)]
pub struct CreateBoardForm {
    #[validate(length(min = 1, max = 16))]
    pub slug: String,
    #[validate(length(min = 1, max = 64))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_nsfw: bool,
    #[serde(default)]
    pub show_poster_ids: bool,
    #[serde(default)]
    pub show_flags: bool,
    pub max_active_threads: Option<i32>,
    pub bump_limit: Option<i32>,
}

#[post("/admin/boards")]
pub async fn create_board(
    req: HttpRequest,
    form: web::Json<CreateBoardForm>,
) -> Result<impl Responder, Error> {
    require_mod_key(&req)?;
    form.validate().map_err(error::ErrorBadRequest)?;

    let form = form.into_inner();
    let board = boards::ActiveModel {
        slug: Set(form.slug),
        title: Set(form.title),
        description: Set(form.description),
        is_nsfw: Set(form.is_nsfw),
        show_poster_ids: Set(form.show_poster_ids),
        show_flags: Set(form.show_flags),
        max_active_threads: Set(form.max_active_threads),
        bump_limit: Set(form.bump_limit),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(crate::db::get_db_pool())
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "id": board.id, "slug": board.slug })))
}

#[derive(Deserialize)]
pub struct ReasonForm {
    #[serde(default)]
    pub reason: String,
}

#[post("/admin/threads/{thread_id}/retire")]
pub async fn retire_thread(
    req: HttpRequest,
    path: web::Path<i32>,
    form: web::Json<ReasonForm>,
) -> Result<impl Responder, Error> {
    require_mod_key(&req)?;

    lifecycle::retire_thread(path.into_inner(), admin_id(&req), &form.reason)
        .await
        .map_err(lifecycle_error)?;
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/admin/threads/{thread_id}")]
pub async fn delete_thread(
    req: HttpRequest,
    path: web::Path<i32>,
    form: web::Json<ReasonForm>,
) -> Result<impl Responder, Error> {
    require_mod_key(&req)?;

    lifecycle::delete_thread(path.into_inner(), admin_id(&req), &form.reason)
        .await
        .map_err(lifecycle_error)?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Deserialize)]
pub struct StickyForm {
    pub sticky: bool,
}

#[post("/admin/threads/{thread_id}/sticky")]
pub async fn set_sticky(
    req: HttpRequest,
    path: web::Path<i32>,
    form: web::Json<StickyForm>,
) -> Result<impl Responder, Error> {
    require_mod_key(&req)?;

    lifecycle::set_sticky(path.into_inner(), form.sticky, admin_id(&req))
        .await
        .map_err(lifecycle_error)?;
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/admin/posts/{post_id}")]
pub async fn delete_post(
    req: HttpRequest,
    path: web::Path<i32>,
    form: web::Json<ReasonForm>,
) -> Result<impl Responder, Error> {
    require_mod_key(&req)?;

    lifecycle::delete_post(path.into_inner(), admin_id(&req), &form.reason)
        .await
        .map_err(lifecycle_error)?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Deserialize, Validate)]
pub struct EditPostForm {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

#[post("/admin/posts/{post_id}/edit")]
pub async fn edit_post(
    req: HttpRequest,
    path: web::Path<i32>,
    form: web::Json<EditPostForm>,
) -> Result<impl Responder, Error> {
    require_mod_key(&req)?;
    form.validate().map_err(error::ErrorBadRequest)?;

    moderation::edit_post(path.into_inner(), &form.content, admin_id(&req))
        .await
        .map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Deserialize, Validate)]
pub struct ColorForm {
    #[validate(length(min = 1, max = 16))]
    pub color: String,
}

#[post("/admin/posts/{post_id}/color")]
pub async fn change_post_color(
    req: HttpRequest,
    path: web::Path<i32>,
    form: web::Json<ColorForm>,
) -> Result<impl Responder, Error> {
    require_mod_key(&req)?;
    form.validate().map_err(error::ErrorBadRequest)?;

    moderation::change_post_color(path.into_inner(), &form.color, admin_id(&req))
        .await
        .map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Deserialize, Validate)]
pub struct BanForm {
    pub ip_address: String,
    pub board_id: Option<i32>,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    pub expires_at: Option<chrono::NaiveDateTime>,
    pub post_id: Option<i32>,
}

#[post("/admin/bans")]
pub async fn issue_ban(
    req: HttpRequest,
    form: web::Json<BanForm>,
) -> Result<impl Responder, Error> {
    require_mod_key(&req)?;
    form.validate().map_err(error::ErrorBadRequest)?;

    let form = form.into_inner();
    let ban = moderation::issue_ban(NewBan {
        ip_address: form.ip_address,
        board_id: form.board_id,
        reason: form.reason,
        expires_at: form.expires_at,
        post_id: form.post_id,
        admin_id: admin_id(&req),
    })
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "id": ban.id })))
}

#[post("/admin/bans/{ban_id}/lift")]
pub async fn lift_ban(
    req: HttpRequest,
    path: web::Path<i32>,
    form: web::Json<ReasonForm>,
) -> Result<impl Responder, Error> {
    require_mod_key(&req)?;

    moderation::lift_ban(path.into_inner(), admin_id(&req), &form.reason)
        .await
        .map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Deserialize)]
pub struct AppealDecisionForm {
    pub accept: bool,
    #[serde(default)]
    pub reason: String,
}

#[post("/admin/bans/{ban_id}/appeal/decide")]
pub async fn decide_appeal(
    req: HttpRequest,
    path: web::Path<i32>,
    form: web::Json<AppealDecisionForm>,
) -> Result<impl Responder, Error> {
    require_mod_key(&req)?;

    moderation::decide_appeal(path.into_inner(), admin_id(&req), form.accept, &form.reason)
        .await
        .map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Deserialize)]
pub struct AuditQuery {
    pub ip: String,
}

/// Reconstruct what happened to one address.
#[get("/admin/audit")]
pub async fn audit_for_ip(
    req: HttpRequest,
    query: web::Query<AuditQuery>,
) -> Result<impl Responder, Error> {
    require_mod_key(&req)?;

    let entries = audit::entries_for_ip(&query.ip)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let views: Vec<serde_json::Value> = entries
        .into_iter()
        .map(|e| {
            serde_json::json!({
                "id": e.id,
                "admin_id": e.admin_id,
                "action": e.action,
                "board_id": e.board_id,
                "thread_id": e.thread_id,
                "post_id": e.post_id,
                "ban_id": e.ban_id,
                "reason": e.reason,
                "detail": e.detail,
                "created_at": e.created_at,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(views))
}

/// Kick off a maintenance pass outside the schedule.
#[post("/admin/janitor/run")]
pub async fn run_janitor(req: HttpRequest) -> Result<impl Responder, Error> {
    require_mod_key(&req)?;

    match janitor::run_all().await {
        Some(report) => Ok(HttpResponse::Ok().json(report)),
        None => Ok(HttpResponse::Conflict()
            .json(serde_json::json!({ "error": "janitor already running" }))),
    }
}

#[derive(Deserialize, Validate)]
pub struct AppealForm {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

/// The one unguarded route here: a banned user pleading their case.
#[post("/bans/{ban_id}/appeal")]
pub async fn submit_appeal(
    path: web::Path<i32>,
    form: web::Json<AppealForm>,
) -> Result<impl Responder, Error> {
    form.validate().map_err(error::ErrorBadRequest)?;

    moderation::submit_appeal(path.into_inner(), &form.text)
        .await
        .map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::NoContent().finish())
}
