//! Route definitions for the `/projects` resource, including the phase and
//! member sub-resources.

use axum::routing::{delete, get, put};
use axum::Router;

use crate::handlers::project;
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                               -> list
/// POST   /                               -> create
/// GET    /statistics                     -> statistics
/// GET    /{id}                           -> get_by_id
/// PUT    /{id}                           -> update
/// DELETE /{id}                           -> delete
///
/// GET    /{id}/phases                    -> list_phases
/// POST   /{id}/phases                    -> add_phase
/// PUT    /{id}/phases/{phase_id}         -> update_phase_status
/// DELETE /{id}/phases/{phase_id}         -> delete_phase
///
/// GET    /{id}/members                   -> list_members
/// POST   /{id}/members                   -> add_member
/// DELETE /{id}/members/{member_id}       -> remove_member
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list).post(project::create))
        .route("/statistics", get(project::statistics))
        .route(
            "/{id}",
            get(project::get_by_id)
                .put(project::update)
                .delete(project::delete),
        )
        .route(
            "/{id}/phases",
            get(project::list_phases).post(project::add_phase),
        )
        .route(
            "/{id}/phases/{phase_id}",
            put(project::update_phase_status).delete(project::delete_phase),
        )
        .route(
            "/{id}/members",
            get(project::list_members).post(project::add_member),
        )
        .route("/{id}/members/{member_id}", delete(project::remove_member))
}
