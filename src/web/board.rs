use crate::db::get_db_pool;
use crate::orm::{boards, threads};
use actix_web::{error, get, web, Error, HttpResponse, Responder};
use sea_orm::{entity::*, query::*};
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_boards).service(view_board);
}

#[derive(Serialize)]
pub struct BoardView {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub is_nsfw: bool,
    pub show_poster_ids: bool,
    pub show_flags: bool,
}

impl From<boards::Model> for BoardView {
    fn from(board: boards::Model) -> Self {
        Self {
            id: board.id,
            slug: board.slug,
            title: board.title,
            description: board.description,
            is_nsfw: board.is_nsfw,
            show_poster_ids: board.show_poster_ids,
            show_flags: board.show_flags,
        }
    }
}

/// Thread summary in the board catalog. Dead threads stay listed until the
/// reaper removes them; the client renders them as archived.
#[derive(Serialize)]
pub struct ThreadSummary {
    pub id: i32,
    pub subject: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub bumped_at: chrono::NaiveDateTime,
    pub is_sticky: bool,
    pub is_alive: bool,
    pub post_count: i32,
}

impl From<threads::Model> for ThreadSummary {
    fn from(thread: threads::Model) -> Self {
        Self {
            id: thread.id,
            subject: thread.subject,
            created_at: thread.created_at,
            bumped_at: thread.bumped_at,
            is_sticky: thread.is_sticky,
            is_alive: thread.is_alive,
            post_count: thread.post_count,
        }
    }
}

#[derive(Serialize)]
pub struct BoardCatalog {
    pub board: BoardView,
    pub threads: Vec<ThreadSummary>,
}

#[get("/boards")]
pub async fn list_boards() -> Result<impl Responder, Error> {
    let all = boards::Entity::find()
        .order_by_asc(boards::Column::Slug)
        .all(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;

    let views: Vec<BoardView> = all.into_iter().map(BoardView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

/// Catalog for one board: sticky threads first, then by bump order.
#[get("/boards/{slug}")]
pub async fn view_board(path: web::Path<String>) -> Result<impl Responder, Error> {
    let slug = path.into_inner();

    let board = boards::Entity::find()
        .filter(boards::Column::Slug.eq(slug))
        .one(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Board not found"))?;

    let board_threads = threads::Entity::find()
        .filter(threads::Column::BoardId.eq(board.id))
        .order_by_desc(threads::Column::IsSticky)
        .order_by_desc(threads::Column::BumpedAt)
        .all(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(BoardCatalog {
        board: BoardView::from(board),
        threads: board_threads.into_iter().map(ThreadSummary::from).collect(),
    }))
}
