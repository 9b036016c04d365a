//! Handlers for the `/users` and `/roles` resources.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use projectflow_core::audit::{
    ACTION_CREATE, ACTION_DELETE, ACTION_RESET_PASSWORD, ACTION_UPDATE, MODULE_USER,
};
use projectflow_core::error::CoreError;
use projectflow_core::policy::{authorize, Action};
use projectflow_core::types::DbId;
use projectflow_core::validation::{
    validate_department, validate_optional_email, validate_optional_phone,
    validate_password_complexity,
};
use projectflow_db::models::role::Role;
use projectflow_db::models::user::{CreateUser, UpdateUser, UserProfile, UserQuery};
use projectflow_db::repositories::{RoleRepo, UserRepo};
use serde::Deserialize;
use validator::Validate;

use crate::audit::{Audit, RequestMeta};
use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PageParams;
use crate::response::{ApiResponse, PageResponse};
use crate::state::AppState;

/// Request body for `POST /users`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    pub username: String,
    pub password: String,
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub role_id: DbId,
}

fn validate_contact(
    email: Option<&str>,
    phone: Option<&str>,
    department: Option<&str>,
) -> Result<(), CoreError> {
    validate_optional_email(email)?;
    validate_optional_phone(phone)?;
    if let Some(department) = department.map(str::trim).filter(|d| !d.is_empty()) {
        validate_department(department)?;
    }
    Ok(())
}

async fn ensure_role_exists(state: &AppState, role_id: DbId) -> AppResult<()> {
    if RoleRepo::find_by_id(&state.pool, role_id).await?.is_none() {
        return Err(AppError::Core(CoreError::validation(format!(
            "Role {role_id} does not exist"
        ))));
    }
    Ok(())
}

/// GET /api/v1/users
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(page): Query<PageParams>,
    Query(params): Query<UserQuery>,
) -> AppResult<Json<PageResponse<UserProfile>>> {
    let page = page.request();
    let users = UserRepo::list(&state.pool, &params, &page).await?;
    let total = UserRepo::count(&state.pool, &params).await?;
    Ok(Json(PageResponse::new(users, total, &page)))
}

/// GET /api/v1/users/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = UserRepo::find_profile(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;
    Ok(Json(ApiResponse::ok(profile)))
}

/// POST /api/v1/users
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserProfile>>)> {
    authorize(&user.actor(), &Action::ManageUsers)?;
    input.validate()?;

    let username = input.username.trim().to_string();
    validate_password_complexity(&input.password)?;
    validate_contact(
        input.email.as_deref(),
        input.phone.as_deref(),
        input.department.as_deref(),
    )?;
    ensure_role_exists(&state, input.role_id).await?;

    if UserRepo::find_by_username(&state.pool, &username)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Username '{username}' is already taken"
        ))));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let created = UserRepo::create(
        &state.pool,
        &CreateUser {
            username,
            password_hash,
            name: input.name.trim().to_string(),
            email: input.email,
            phone: input.phone,
            department: input.department,
            role_id: input.role_id,
        },
    )
    .await?;

    Audit::new(&meta, Some(user.user_id), ACTION_CREATE, MODULE_USER)
        .target("user", created.id, &created.name)
        .describe(format!("Created user {}", created.username))
        .record(&state.pool);

    let profile = UserRepo::find_profile(&state.pool, created.id)
        .await?
        .ok_or_else(|| AppError::not_found("User", created.id))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(profile))))
}

/// PUT /api/v1/users/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUser>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    authorize(&user.actor(), &Action::ManageUsers)?;

    validate_contact(
        input.email.as_deref(),
        input.phone.as_deref(),
        input.department.as_deref(),
    )?;
    if let Some(role_id) = input.role_id {
        ensure_role_exists(&state, role_id).await?;
    }

    let updated = UserRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;

    Audit::new(&meta, Some(user.user_id), ACTION_UPDATE, MODULE_USER)
        .target("user", updated.id, &updated.name)
        .describe(format!("Updated user {}", updated.username))
        .record(&state.pool);

    let profile = UserRepo::find_profile(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;
    Ok(Json(ApiResponse::ok(profile)))
}

/// DELETE /api/v1/users/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<()>>> {
    authorize(&user.actor(), &Action::ManageUsers)?;
    if id == user.user_id {
        return Err(AppError::Core(CoreError::validation(
            "You cannot delete your own account",
        )));
    }

    let target = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;
    if !UserRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("User", id));
    }

    Audit::new(&meta, Some(user.user_id), ACTION_DELETE, MODULE_USER)
        .target("user", id, &target.name)
        .describe(format!("Deleted user {}", target.username))
        .record(&state.pool);

    Ok(Json(ApiResponse::message("User deleted")))
}

/// POST /api/v1/users/{id}/reset-password
///
/// Resets to the configured default password and clears any lockout.
pub async fn reset_password(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<()>>> {
    authorize(&user.actor(), &Action::ManageUsers)?;

    let target = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;

    let hash = hash_password(&state.config.reset_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    UserRepo::reset_password(&state.pool, id, &hash).await?;

    Audit::new(&meta, Some(user.user_id), ACTION_RESET_PASSWORD, MODULE_USER)
        .target("user", id, &target.name)
        .describe(format!("Reset password of {}", target.username))
        .record(&state.pool);

    Ok(Json(ApiResponse::message("Password reset to the default")))
}

/// GET /api/v1/roles
pub async fn list_roles(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Role>>>> {
    let roles = RoleRepo::list(&state.pool).await?;
    Ok(Json(ApiResponse::ok(roles)))
}
