//! Route definitions for the `/logs` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::log;
use crate::state::AppState;

/// Routes mounted at `/logs` (admin or department manager).
///
/// ```text
/// GET /             -> list
/// GET /actions      -> actions
/// GET /modules      -> modules
/// GET /statistics   -> statistics
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(log::list))
        .route("/actions", get(log::actions))
        .route("/modules", get(log::modules))
        .route("/statistics", get(log::statistics))
}
