//! Repository for the `users` table.

use sqlx::PgPool;
use projectflow_core::pagination::PageRequest;
use projectflow_core::types::{DbId, Timestamp};

use crate::filter::{bind_values, bind_values_scalar, BindValue, Filter};
use crate::models::user::{CreateUser, UpdateUser, User, UserProfile, UserQuery};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, username, password_hash, name, email, phone, department, role_id, \
                       is_active, failed_login_count, locked_until, last_login_at, \
                       created_at, updated_at";

/// Profile columns, selected from `users u JOIN roles r`.
const PROFILE_COLUMNS: &str = "u.id, u.username, u.name, u.email, u.phone, u.department, \
                               u.role_id, r.code AS role_code, r.name AS role_name, \
                               u.is_active, u.last_login_at, u.created_at";

/// Provides CRUD and login bookkeeping for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, password_hash, name, email, phone, department, role_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.password_hash)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.department)
            .bind(input.role_id)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by username (case-sensitive). Excludes soft-deleted rows.
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM users WHERE username = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Find a user's profile (joined with its role).
    pub async fn find_profile(pool: &PgPool, id: DbId) -> Result<Option<UserProfile>, sqlx::Error> {
        let query = format!(
            "SELECT {PROFILE_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id \
             WHERE u.id = $1 AND u.deleted_at IS NULL"
        );
        sqlx::query_as::<_, UserProfile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List user profiles matching the filter, newest first.
    pub async fn list(
        pool: &PgPool,
        params: &UserQuery,
        page: &PageRequest,
    ) -> Result<Vec<UserProfile>, sqlx::Error> {
        let filter = build_user_filter(params);
        let idx = filter.next_index();
        let query = format!(
            "SELECT {PROFILE_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id \
             {} ORDER BY u.created_at DESC LIMIT ${idx} OFFSET ${}",
            filter.where_clause(),
            idx + 1
        );
        bind_values(sqlx::query_as::<_, UserProfile>(&query), filter.values())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    /// Count users matching the filter (for pagination metadata).
    pub async fn count(pool: &PgPool, params: &UserQuery) -> Result<i64, sqlx::Error> {
        let filter = build_user_filter(params);
        let query = format!("SELECT COUNT(*) FROM users u {}", filter.where_clause());
        bind_values_scalar(sqlx::query_scalar::<_, i64>(&query), filter.values())
            .fetch_one(pool)
            .await
    }

    /// Update a user. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                department = COALESCE($5, department),
                role_id = COALESCE($6, role_id),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.department)
            .bind(input.role_id)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a user. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW(), is_active = false \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a failed login in one statement: increment the counter and,
    /// once it reaches `max_attempts`, set `locked_until`.
    ///
    /// The counter is only reset by a successful login, so a failure after an
    /// expired lock re-locks immediately.
    ///
    /// Returns the new failure count and lock expiry.
    pub async fn record_failed_login(
        pool: &PgPool,
        id: DbId,
        max_attempts: i32,
        lock_until: Timestamp,
    ) -> Result<(i32, Option<Timestamp>), sqlx::Error> {
        sqlx::query_as::<_, (i32, Option<Timestamp>)>(
            "UPDATE users SET
                failed_login_count = failed_login_count + 1,
                locked_until = CASE
                    WHEN failed_login_count + 1 >= $2 THEN $3
                    ELSE locked_until
                END
             WHERE id = $1
             RETURNING failed_login_count, locked_until",
        )
        .bind(id)
        .bind(max_attempts)
        .bind(lock_until)
        .fetch_one(pool)
        .await
    }

    /// Record a successful login: reset `failed_login_count` to 0, clear `locked_until`,
    /// and set `last_login_at` to now.
    pub async fn record_successful_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET
                failed_login_count = 0,
                locked_until = NULL,
                last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Update a user's password hash. Returns `true` if the row was updated.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Reset a password and clear any lockout. Returns `true` if the row was updated.
    pub async fn reset_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET
                password_hash = $2,
                failed_login_count = 0,
                locked_until = NULL,
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn build_user_filter(params: &UserQuery) -> Filter {
    let mut filter = Filter::new();
    filter.raw("u.deleted_at IS NULL");
    if let Some(keyword) = params.keyword.as_deref().filter(|k| !k.is_empty()) {
        filter.search(&["u.username", "u.name"], keyword);
    }
    if let Some(role_id) = params.role_id {
        filter.eq("u.role_id", BindValue::BigInt(role_id));
    }
    if let Some(is_active) = params.is_active {
        filter.eq("u.is_active", BindValue::Bool(is_active));
    }
    filter
}
