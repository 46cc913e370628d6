pub mod admin;
pub mod board;
pub mod media;
pub mod thread;

use crate::lifecycle::LifecycleError;
use actix_web::error;

/// Configures the web app by adding services from each web file.
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Descending order. Route resolution will stop at the first match.
    admin::configure(conf);
    board::configure(conf);
    media::configure(conf);
    thread::configure(conf);
}

/// Map lifecycle rejections to HTTP errors. A dead thread is a Gone, not a
/// generic server error.
pub(crate) fn lifecycle_error(e: LifecycleError) -> actix_web::Error {
    match e {
        LifecycleError::BoardNotFound(_)
        | LifecycleError::ThreadNotFound(_)
        | LifecycleError::PostNotFound(_) => error::ErrorNotFound(e.to_string()),
        LifecycleError::ThreadDead(_) => error::ErrorGone(e.to_string()),
        LifecycleError::EmptyPost => error::ErrorBadRequest(e.to_string()),
        LifecycleError::Db(inner) => error::ErrorInternalServerError(inner),
    }
}
