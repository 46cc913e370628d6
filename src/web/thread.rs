use super::lifecycle_error;
use crate::constants::{MAX_POST_LENGTH, MAX_SUBJECT_LENGTH};
use crate::db::get_db_pool;
use crate::lifecycle::{self, NewPostContent};
use crate::moderation;
use crate::orm::posts::MediaKind;
use crate::orm::{boards, posts, threads};
use crate::{ip, storage};
use actix_multipart::Multipart;
use actix_web::{error, get, post, web, Error, HttpRequest, HttpResponse, Responder};
use futures_util::TryStreamExt;
use sea_orm::{entity::*, query::*};
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(create_thread)
        .service(create_reply)
        .service(view_thread);
}

/// Post as rendered to readers. The origin address never leaves the
/// moderation layer.
#[derive(Serialize)]
pub struct PostView {
    pub id: i32,
    pub content: String,
    pub media_url: Option<String>,
    pub media_kind: Option<MediaKind>,
    pub poster_id: Option<String>,
    pub country_code: Option<String>,
    pub name_color: String,
    pub created_at: chrono::NaiveDateTime,
}

impl From<posts::Model> for PostView {
    fn from(post: posts::Model) -> Self {
        Self {
            id: post.id,
            content: post.content,
            media_url: post.media_key.map(|key| format!("/media/{}", key)),
            media_kind: post.media_kind,
            poster_id: post.poster_id,
            country_code: post.country_code,
            name_color: post.name_color,
            created_at: post.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ThreadView {
    pub id: i32,
    pub board_id: i32,
    pub subject: Option<String>,
    pub is_sticky: bool,
    pub is_alive: bool,
    pub post_count: i32,
    pub posts: Vec<PostView>,
}

/// Fields accepted from the posting form, multipart because of the file.
#[derive(Default)]
struct PostForm {
    subject: Option<String>,
    content: String,
    name_color: Option<String>,
    suppress_bump: bool,
    file: Option<(Vec<u8>, mime::Mime)>,
}

async fn read_post_form(mut payload: Multipart) -> Result<PostForm, Error> {
    let mut form = PostForm::default();

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().to_string();
        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            data.extend_from_slice(&chunk);
            if name != "file" && data.len() > MAX_POST_LENGTH * 4 {
                return Err(error::ErrorBadRequest("Field too long"));
            }
        }

        match name.as_str() {
            "subject" => {
                let text = String::from_utf8_lossy(&data).trim().to_string();
                if text.chars().count() > MAX_SUBJECT_LENGTH {
                    return Err(error::ErrorBadRequest("Subject too long"));
                }
                form.subject = Some(text).filter(|s| !s.is_empty());
            }
            "content" => {
                let text = String::from_utf8_lossy(&data).to_string();
                if text.chars().count() > MAX_POST_LENGTH {
                    return Err(error::ErrorBadRequest("Post too long"));
                }
                form.content = text;
            }
            "name_color" => {
                form.name_color =
                    Some(String::from_utf8_lossy(&data).trim().to_string()).filter(|s| !s.is_empty());
            }
            "sage" => {
                let value = String::from_utf8_lossy(&data);
                form.suppress_bump = matches!(value.trim(), "1" | "true" | "on");
            }
            "file" => {
                let mime = field
                    .content_type()
                    .cloned()
                    .unwrap_or(mime::APPLICATION_OCTET_STREAM);
                if !data.is_empty() {
                    form.file = Some((data, mime));
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Store an upload under its content hash. Runs before the database
/// transaction; if the transaction later fails the blob sits unreferenced
/// until the reconciler's grace window expires.
async fn store_upload(
    data: Vec<u8>,
    mime: &mime::Mime,
) -> Result<(String, MediaKind), Error> {
    let kind = MediaKind::from_mime(mime)
        .ok_or_else(|| error::ErrorBadRequest("Unsupported media type"))?;

    let ext = match mime.subtype().as_str() {
        "jpeg" => "jpg",
        "quicktime" => "mov",
        "mpeg" => "mp3",
        other => other,
    };
    let key = format!("{}.{}", blake3::hash(&data).to_hex(), ext);

    storage::get_storage()
        .put_object(data, &key)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok((key, kind))
}

async fn build_content(req: &HttpRequest, form: PostForm) -> Result<NewPostContent, Error> {
    let ip_address = ip::extract_client_ip(req)
        .ok_or_else(|| error::ErrorBadRequest("Could not determine client address"))?;

    let (media_key, media_kind) = match form.file {
        Some((data, mime)) => {
            let (key, kind) = store_upload(data, &mime).await?;
            (Some(key), Some(kind))
        }
        None => (None, None),
    };

    Ok(NewPostContent {
        content: form.content,
        media_key,
        media_kind,
        ip_address,
        country_code: ip::extract_country_code(req),
        name_color: form.name_color,
        suppress_bump: form.suppress_bump,
    })
}

#[get("/threads/{thread_id}")]
pub async fn view_thread(path: web::Path<i32>) -> Result<impl Responder, Error> {
    let thread_id = path.into_inner();

    let thread = threads::Entity::find_by_id(thread_id)
        .one(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Thread not found"))?;

    let thread_posts = posts::Entity::find()
        .filter(posts::Column::ThreadId.eq(thread.id))
        .order_by_asc(posts::Column::Id)
        .all(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(ThreadView {
        id: thread.id,
        board_id: thread.board_id,
        subject: thread.subject,
        is_sticky: thread.is_sticky,
        is_alive: thread.is_alive,
        post_count: thread.post_count,
        posts: thread_posts.into_iter().map(PostView::from).collect(),
    }))
}

#[post("/boards/{slug}/threads")]
pub async fn create_thread(
    req: HttpRequest,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<impl Responder, Error> {
    let slug = path.into_inner();

    let board = boards::Entity::find()
        .filter(boards::Column::Slug.eq(slug))
        .one(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Board not found"))?;

    let form = read_post_form(payload).await?;
    let subject = form.subject.clone();
    let content = build_content(&req, form).await?;

    if moderation::is_ip_banned(&content.ip_address, Some(board.id))
        .await
        .map_err(error::ErrorInternalServerError)?
    {
        return Err(error::ErrorForbidden("You are banned from this board."));
    }

    let thread = lifecycle::create_thread(board.id, subject, content)
        .await
        .map_err(lifecycle_error)?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "id": thread.id,
        "board_id": thread.board_id,
    })))
}

#[post("/threads/{thread_id}/posts")]
pub async fn create_reply(
    req: HttpRequest,
    path: web::Path<i32>,
    payload: Multipart,
) -> Result<impl Responder, Error> {
    let thread_id = path.into_inner();

    let thread = threads::Entity::find_by_id(thread_id)
        .one(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Thread not found"))?;

    let form = read_post_form(payload).await?;
    let content = build_content(&req, form).await?;

    if moderation::is_ip_banned(&content.ip_address, Some(thread.board_id))
        .await
        .map_err(error::ErrorInternalServerError)?
    {
        return Err(error::ErrorForbidden("You are banned from this board."));
    }

    let post = lifecycle::create_post(thread.id, content)
        .await
        .map_err(lifecycle_error)?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "id": post.id,
        "thread_id": post.thread_id,
    })))
}
