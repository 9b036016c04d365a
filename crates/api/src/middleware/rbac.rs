//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does not
//! meet the minimum requirement. Resource-level rules (ownership, membership,
//! task state) are decided by `projectflow_core::policy` inside the handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use projectflow_core::policy::{authorize, Action};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Gate for the audit log endpoints: the caller must pass
/// [`Action::ViewAllLogs`]. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn manage(RequireManagement(user): RequireManagement) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireManagement(pub AuthUser);

impl FromRequestParts<AppState> for RequireManagement {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        authorize(&user.actor(), &Action::ViewAllLogs)?;
        Ok(RequireManagement(user))
    }
}
