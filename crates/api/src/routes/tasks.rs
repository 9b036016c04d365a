//! Route definitions for the `/tasks` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::task;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /                -> list
/// POST   /                -> create
/// POST   /batch           -> batch_create
/// GET    /my              -> my_tasks
/// GET    /statistics      -> statistics
/// GET    /{id}            -> get_by_id
/// PUT    /{id}            -> update
/// DELETE /{id}            -> delete
/// PUT    /{id}/status     -> update_status
/// POST   /{id}/review     -> review
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(task::list).post(task::create))
        .route("/batch", post(task::batch_create))
        .route("/my", get(task::my_tasks))
        .route("/statistics", get(task::statistics))
        .route(
            "/{id}",
            get(task::get_by_id).put(task::update).delete(task::delete),
        )
        .route("/{id}/status", put(task::update_status))
        .route("/{id}/review", post(task::review))
}
