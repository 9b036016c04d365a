//! Route definitions for the `/documents` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::document;
use crate::state::AppState;

/// Routes mounted at `/documents`.
///
/// ```text
/// GET    /                -> list
/// POST   /upload          -> upload (multipart)
/// GET    /{id}            -> get_by_id
/// PUT    /{id}            -> update
/// DELETE /{id}            -> delete
/// GET    /{id}/download   -> download
/// POST   /{id}/archive    -> archive
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(document::list))
        .route("/upload", post(document::upload))
        .route(
            "/{id}",
            get(document::get_by_id)
                .put(document::update)
                .delete(document::delete),
        )
        .route("/{id}/download", get(document::download))
        .route("/{id}/archive", post(document::archive))
}
