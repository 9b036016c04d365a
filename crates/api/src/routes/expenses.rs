//! Route definitions for the `/expenses` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::expense;
use crate::state::AppState;

/// Routes mounted at `/expenses`.
///
/// ```text
/// GET    /                        -> list
/// POST   /                        -> create
/// POST   /import                  -> import (multipart xlsx)
/// GET    /statistics              -> statistics
/// GET    /comparison              -> comparison
/// GET    /{id}                    -> get_by_id
/// PUT    /{id}                    -> update
/// DELETE /{id}                    -> delete
/// POST   /{id}/vouchers           -> upload_vouchers (multipart)
/// GET    /{id}/vouchers?index=    -> download_voucher
/// DELETE /{id}/vouchers?index=    -> delete_voucher
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(expense::list).post(expense::create))
        .route("/import", post(expense::import))
        .route("/statistics", get(expense::statistics))
        .route("/comparison", get(expense::comparison))
        .route(
            "/{id}",
            get(expense::get_by_id)
                .put(expense::update)
                .delete(expense::delete),
        )
        .route(
            "/{id}/vouchers",
            post(expense::upload_vouchers)
                .get(expense::download_voucher)
                .delete(expense::delete_voucher),
        )
}
