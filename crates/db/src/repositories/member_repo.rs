//! Repository for the `project_members` table.

use sqlx::PgPool;
use projectflow_core::types::DbId;

use crate::models::project::ProjectMember;

/// Columns selected from `project_members m JOIN users u`.
const COLUMNS: &str = "m.id, m.project_id, m.user_id, u.username, u.name, m.role_type, m.join_date";

pub struct MemberRepo;

impl MemberRepo {
    /// List members of a project in join order.
    pub async fn list(pool: &PgPool, project_id: DbId) -> Result<Vec<ProjectMember>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_members m JOIN users u ON u.id = m.user_id \
             WHERE m.project_id = $1 ORDER BY m.join_date ASC, m.id ASC"
        );
        sqlx::query_as::<_, ProjectMember>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Add a member. A duplicate membership violates `uq_project_members_user`.
    pub async fn add(
        pool: &PgPool,
        project_id: DbId,
        user_id: DbId,
        role_type: &str,
    ) -> Result<ProjectMember, sqlx::Error> {
        let id: DbId = sqlx::query_scalar(
            "INSERT INTO project_members (project_id, user_id, role_type) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role_type)
        .fetch_one(pool)
        .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM project_members m JOIN users u ON u.id = m.user_id \
             WHERE m.id = $1"
        );
        sqlx::query_as::<_, ProjectMember>(&query)
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Remove a membership row. Returns `true` if a row was deleted.
    pub async fn remove(pool: &PgPool, project_id: DbId, member_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_members WHERE id = $1 AND project_id = $2")
            .bind(member_id)
            .bind(project_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn is_member(pool: &PgPool, project_id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM project_members WHERE project_id = $1 AND user_id = $2)",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
