//! Handlers for the `/auth` resource (login, current user, password, logout).

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use projectflow_core::audit::{
    ACTION_CHANGE_PASSWORD, ACTION_LOGIN, ACTION_LOGOUT, MODULE_AUTH,
};
use projectflow_core::error::CoreError;
use projectflow_core::lockout;
use projectflow_core::validation::validate_password_complexity;
use projectflow_db::models::user::UserProfile;
use projectflow_db::repositories::{RoleRepo, UserRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::audit::{Audit, RequestMeta};
use crate::auth::jwt::generate_token;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Successful login response containing the access token and user info.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Request body for `POST /auth/change-password`.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

fn invalid_credentials() -> AppError {
    AppError::Core(CoreError::Unauthorized(
        "Invalid username or password".into(),
    ))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// A locked or deactivated account is rejected with 403 before the password
/// is checked. A wrong password bumps the failure counter and may lock the
/// account; both unknown users and wrong passwords get the same 401.
pub async fn login(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    input.validate()?;

    let user = UserRepo::find_by_username(&state.pool, input.username.trim())
        .await?
        .ok_or_else(invalid_credentials)?;

    let now = Utc::now();
    if lockout::is_locked(user.locked_until, now) {
        Audit::new(&meta, Some(user.id), ACTION_LOGIN, MODULE_AUTH)
            .target("user", user.id, &user.username)
            .describe("Login rejected: account locked")
            .failed()
            .record(&state.pool);
        return Err(AppError::Core(CoreError::forbidden(
            "Account is temporarily locked. Please try again later",
        )));
    }

    if !user.is_active {
        return Err(AppError::Core(CoreError::forbidden("Account is disabled")));
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        let (failures, locked_until) = UserRepo::record_failed_login(
            &state.pool,
            user.id,
            lockout::MAX_FAILED_ATTEMPTS,
            lockout::lock_expiry(now),
        )
        .await?;
        if lockout::is_locked(locked_until, now) {
            tracing::warn!(user_id = user.id, failures, "Account locked after repeated login failures");
        }
        Audit::new(&meta, Some(user.id), ACTION_LOGIN, MODULE_AUTH)
            .target("user", user.id, &user.username)
            .describe(format!("Login failed ({failures} consecutive)"))
            .failed()
            .record(&state.pool);
        return Err(invalid_credentials());
    }

    let role = RoleRepo::find_by_id(&state.pool, user.role_id)
        .await?
        .ok_or_else(|| AppError::InternalError(format!("User {} has no role", user.id)))?;

    let token = generate_token(user.id, &user.username, &role.code, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    UserRepo::record_successful_login(&state.pool, user.id).await?;

    let profile = UserRepo::find_profile(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User", user.id))?;

    tracing::info!(user_id = user.id, role = %role.code, "User logged in");
    Audit::new(&meta, Some(user.id), ACTION_LOGIN, MODULE_AUTH)
        .target("user", user.id, &user.username)
        .describe("Logged in")
        .record(&state.pool);

    Ok(Json(ApiResponse::with_message(
        "Login successful",
        LoginResponse {
            token,
            user: profile,
        },
    )))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = UserRepo::find_profile(&state.pool, user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", user.user_id))?;
    Ok(Json(ApiResponse::ok(profile)))
}

/// POST /api/v1/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let account = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", user.user_id))?;

    let old_valid = verify_password(&input.old_password, &account.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !old_valid {
        return Err(AppError::Core(CoreError::validation(
            "Old password is incorrect",
        )));
    }

    validate_password_complexity(&input.new_password)?;

    let hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    UserRepo::update_password(&state.pool, user.user_id, &hash).await?;

    Audit::new(&meta, Some(user.user_id), ACTION_CHANGE_PASSWORD, MODULE_AUTH)
        .target("user", user.user_id, &user.username)
        .describe("Changed password")
        .record(&state.pool);

    Ok(Json(ApiResponse::message("Password changed")))
}

/// POST /api/v1/auth/logout
///
/// Tokens are stateless; logout is recorded for the audit trail only.
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
) -> AppResult<Json<ApiResponse<()>>> {
    Audit::new(&meta, Some(user.user_id), ACTION_LOGOUT, MODULE_AUTH)
        .target("user", user.user_id, &user.username)
        .describe("Logged out")
        .record(&state.pool);
    Ok(Json(ApiResponse::message("Logged out")))
}
