//! Route definitions for the `/knowledge` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::knowledge;
use crate::state::AppState;

/// Routes mounted at `/knowledge`.
///
/// ```text
/// GET    /                   -> list
/// GET    /hot                -> hot
/// POST   /upload             -> upload (multipart)
/// GET    /categories         -> list_categories
/// POST   /categories         -> create_category
/// PUT    /categories/{id}    -> update_category
/// DELETE /categories/{id}    -> delete_category
/// GET    /{id}               -> get_by_id (counts a view)
/// PUT    /{id}               -> update
/// DELETE /{id}               -> delete
/// GET    /{id}/download      -> download
/// GET    /{id}/versions      -> list_versions
/// POST   /{id}/versions      -> new_version (multipart)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(knowledge::list))
        .route("/hot", get(knowledge::hot))
        .route("/upload", post(knowledge::upload))
        .route(
            "/categories",
            get(knowledge::list_categories).post(knowledge::create_category),
        )
        .route(
            "/categories/{id}",
            put(knowledge::update_category).delete(knowledge::delete_category),
        )
        .route(
            "/{id}",
            get(knowledge::get_by_id)
                .put(knowledge::update)
                .delete(knowledge::delete),
        )
        .route("/{id}/download", get(knowledge::download))
        .route(
            "/{id}/versions",
            get(knowledge::list_versions).post(knowledge::new_version),
        )
}
