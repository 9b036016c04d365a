//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use projectflow_core::error::CoreError;
use projectflow_core::policy::Actor;
use projectflow_core::roles::Role;
use projectflow_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT.
///
/// The token is read from the `Authorization: Bearer <token>` header, or from
/// a `?token=` query parameter so that plain download links work.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, role = %user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    /// The caller as seen by the authorization policy.
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match parts.headers.get("authorization") {
            Some(value) => {
                let value = value.to_str().map_err(|_| unauthorized("Invalid Authorization header"))?;
                value.strip_prefix("Bearer ").ok_or_else(|| {
                    unauthorized("Invalid Authorization format. Expected: Bearer <token>")
                })?
            }
            None => query_token(parts.uri.query())
                .ok_or_else(|| unauthorized("Missing Authorization header"))?,
        };

        let claims = validate_token(token, &state.config.jwt)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        // A token naming a role we no longer know is as good as invalid.
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        Ok(AuthUser {
            user_id: claims.sub,
            username: claims.username,
            role,
        })
    }
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}

/// Pull `token=<jwt>` out of a raw query string. JWTs are URL-safe, so no
/// decoding is needed.
fn query_token(query: Option<&str>) -> Option<&str> {
    query?
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_found_among_other_params() {
        assert_eq!(query_token(Some("a=1&token=abc.def.ghi&b=2")), Some("abc.def.ghi"));
        assert_eq!(query_token(Some("token=")), None);
        assert_eq!(query_token(Some("mytoken=x")), None);
        assert_eq!(query_token(None), None);
    }
}
