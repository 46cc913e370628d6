use crate::storage::{self, StorageError};
use actix_web::http::header;
use actix_web::{error, get, web, Error, HttpRequest, HttpResponse, Responder};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(serve_media);
}

/// Stream a blob out of the object store, honoring Range requests.
#[get("/media/{key}")]
pub async fn serve_media(req: HttpRequest, path: web::Path<String>) -> Result<impl Responder, Error> {
    let key = path.into_inner();
    if key.contains('/') || key.contains("..") {
        return Err(error::ErrorBadRequest("Invalid media key"));
    }

    let range = req
        .headers()
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let is_partial = range.is_some();

    let object = storage::get_storage()
        .get_object(&key, range)
        .await
        .map_err(|e| match e {
            StorageError::NotFound(_) => error::ErrorNotFound("Media not found"),
            StorageError::InvalidRange(msg) => error::ErrorRangeNotSatisfiable(msg),
            other => error::ErrorInternalServerError(other),
        })?;

    let mut response = if is_partial && object.content_range.is_some() {
        HttpResponse::PartialContent()
    } else {
        HttpResponse::Ok()
    };

    if let Some(content_type) = &object.content_type {
        response.insert_header((header::CONTENT_TYPE, content_type.clone()));
    }
    if let Some(content_range) = &object.content_range {
        response.insert_header((header::CONTENT_RANGE, content_range.clone()));
    }
    response.insert_header((header::ACCEPT_RANGES, "bytes"));
    // Blobs are content-addressed and immutable.
    response.insert_header((header::CACHE_CONTROL, "public, max-age=31536000, immutable"));

    Ok(response.streaming(object.body))
}
