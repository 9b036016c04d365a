//! Repository for the `tasks` table.

use sqlx::PgPool;
use projectflow_core::lifecycle::STATUS_NOT_STARTED;
use projectflow_core::pagination::PageRequest;
use projectflow_core::task::{ReviewDecision, TaskStatus};
use projectflow_core::types::DbId;

use crate::filter::{bind_values, bind_values_scalar, BindValue, Filter};
use crate::models::project::GroupCount;
use crate::models::task::{CreateTask, Task, TaskQuery, UpdateTask};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, phase_id, task_name, description, task_type, \
                       assignee_id, assignee_type, deadline, status, priority, deliverables, \
                       review_status, review_comment, reviewed_by, reviewed_at, completed_at, \
                       created_by, created_at, updated_at";

/// Ordering for a user's own task list: nearest deadline first, then priority.
const MY_TASKS_ORDER: &str = "deadline ASC NULLS LAST, priority ASC, created_at DESC";

/// Provides CRUD, status and review operations for tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a task with an already-resolved priority.
    pub async fn create(
        pool: &PgPool,
        input: &CreateTask,
        priority: i32,
        created_by: DbId,
    ) -> Result<Task, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::insert(&mut conn, input, priority, created_by).await
    }

    /// Insert several tasks in one transaction. Either all rows are created or none.
    ///
    /// `tasks` pairs each input with its resolved priority.
    pub async fn batch_create(
        pool: &PgPool,
        tasks: &[(CreateTask, i32)],
        created_by: DbId,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut created = Vec::with_capacity(tasks.len());
        for (input, priority) in tasks {
            created.push(Self::insert(&mut tx, input, *priority, created_by).await?);
        }
        tx.commit().await?;
        Ok(created)
    }

    /// Find a task by ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List tasks matching the filter, newest first.
    pub async fn list(
        pool: &PgPool,
        params: &TaskQuery,
        page: &PageRequest,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let filter = build_task_filter(params);
        let idx = filter.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM tasks {} ORDER BY created_at DESC LIMIT ${idx} OFFSET ${}",
            filter.where_clause(),
            idx + 1
        );
        bind_values(sqlx::query_as::<_, Task>(&query), filter.values())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    /// Count tasks matching the filter.
    pub async fn count(pool: &PgPool, params: &TaskQuery) -> Result<i64, sqlx::Error> {
        let filter = build_task_filter(params);
        let query = format!("SELECT COUNT(*) FROM tasks {}", filter.where_clause());
        bind_values_scalar(sqlx::query_scalar::<_, i64>(&query), filter.values())
            .fetch_one(pool)
            .await
    }

    /// Tasks assigned to `assignee_id`, optionally limited to `statuses`.
    ///
    /// Returns the page and the total count.
    pub async fn my_tasks(
        pool: &PgPool,
        assignee_id: DbId,
        statuses: &[TaskStatus],
        page: &PageRequest,
    ) -> Result<(Vec<Task>, i64), sqlx::Error> {
        let filter = build_my_tasks_filter(assignee_id, statuses);

        let count_query = format!("SELECT COUNT(*) FROM tasks {}", filter.where_clause());
        let total = bind_values_scalar(sqlx::query_scalar::<_, i64>(&count_query), filter.values())
            .fetch_one(pool)
            .await?;

        let idx = filter.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM tasks {} ORDER BY {MY_TASKS_ORDER} LIMIT ${idx} OFFSET ${}",
            filter.where_clause(),
            idx + 1
        );
        let tasks = bind_values(sqlx::query_as::<_, Task>(&query), filter.values())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok((tasks, total))
    }

    /// Update descriptive fields. Status is not touched.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTask,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET
                phase_id = COALESCE($2, phase_id),
                task_name = COALESCE($3, task_name),
                description = COALESCE($4, description),
                task_type = COALESCE($5, task_type),
                assignee_id = COALESCE($6, assignee_id),
                assignee_type = COALESCE($7, assignee_type),
                deadline = COALESCE($8, deadline),
                priority = COALESCE($9, priority),
                deliverables = COALESCE($10, deliverables),
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(input.phase_id)
            .bind(&input.task_name)
            .bind(&input.description)
            .bind(&input.task_type)
            .bind(input.assignee_id)
            .bind(&input.assignee_type)
            .bind(input.deadline)
            .bind(input.priority)
            .bind(&input.deliverables)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a task. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE tasks SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the status; `completed` stamps `completed_at`.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: TaskStatus,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET
                status = $2,
                completed_at = CASE WHEN $3 THEN NOW() ELSE completed_at END,
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(projectflow_core::task::stamps_completion(status))
            .fetch_optional(pool)
            .await
    }

    /// Record a review and force the status the decision implies.
    pub async fn review(
        pool: &PgPool,
        id: DbId,
        decision: ReviewDecision,
        comment: Option<&str>,
        reviewer_id: DbId,
    ) -> Result<Option<Task>, sqlx::Error> {
        let status = decision.resulting_status();
        let query = format!(
            "UPDATE tasks SET
                review_status = $2,
                review_comment = $3,
                reviewed_by = $4,
                reviewed_at = NOW(),
                status = $5,
                completed_at = CASE WHEN $6 THEN NOW() ELSE completed_at END,
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(decision.as_str())
            .bind(comment)
            .bind(reviewer_id)
            .bind(status.as_str())
            .bind(projectflow_core::task::stamps_completion(status))
            .fetch_optional(pool)
            .await
    }

    /// Number of live tasks grouped by status.
    pub async fn status_counts(pool: &PgPool) -> Result<Vec<GroupCount>, sqlx::Error> {
        sqlx::query_as::<_, GroupCount>(
            "SELECT status AS key, COUNT(*)::BIGINT AS count FROM tasks \
             WHERE deleted_at IS NULL GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    async fn insert(
        conn: &mut sqlx::PgConnection,
        input: &CreateTask,
        priority: i32,
        created_by: DbId,
    ) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks
                (project_id, phase_id, task_name, description, task_type, assignee_id,
                 assignee_type, deadline, status, priority, deliverables, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(input.project_id)
            .bind(input.phase_id)
            .bind(&input.task_name)
            .bind(&input.description)
            .bind(&input.task_type)
            .bind(input.assignee_id)
            .bind(&input.assignee_type)
            .bind(input.deadline)
            .bind(STATUS_NOT_STARTED)
            .bind(priority)
            .bind(&input.deliverables)
            .bind(created_by)
            .fetch_one(conn)
            .await
    }
}

fn build_task_filter(params: &TaskQuery) -> Filter {
    let mut filter = Filter::new();
    filter.raw("deleted_at IS NULL");
    if let Some(project_id) = params.project_id {
        filter.eq("project_id", BindValue::BigInt(project_id));
    }
    if let Some(phase_id) = params.phase_id {
        filter.eq("phase_id", BindValue::BigInt(phase_id));
    }
    if let Some(status) = params.status.as_deref().filter(|s| !s.is_empty()) {
        filter.eq("status", BindValue::Text(status.to_string()));
    }
    if let Some(assignee_id) = params.assignee_id {
        filter.eq("assignee_id", BindValue::BigInt(assignee_id));
    }
    if let Some(keyword) = params.keyword.as_deref().filter(|k| !k.is_empty()) {
        filter.search(&["task_name", "description"], keyword);
    }
    filter
}

fn build_my_tasks_filter(assignee_id: DbId, statuses: &[TaskStatus]) -> Filter {
    let mut filter = Filter::new();
    filter
        .raw("deleted_at IS NULL")
        .eq("assignee_id", BindValue::BigInt(assignee_id));
    if !statuses.is_empty() {
        let values = statuses.iter().map(|s| s.as_str().to_string()).collect();
        filter.any_of("status", values);
    }
    filter
}
