//! Repository for the `projects` table.

use sqlx::PgPool;
use projectflow_core::lifecycle::{FIXED_PHASES, STATUS_IN_PROGRESS};
use projectflow_core::pagination::PageRequest;
use projectflow_core::types::DbId;

use crate::filter::{bind_values, bind_values_scalar, BindValue, Filter};
use crate::models::project::{CreateProject, GroupCount, Project, ProjectQuery, UpdateProject};

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, project_no, name, project_type, manager_id, created_by, \
                                  contract_no, budget_code, innovation_code, initiation_date, \
                                  closing_date, labor_cost, direct_cost, outsourcing_cost, \
                                  other_cost, current_phase, status, created_at, updated_at";

/// Membership role recorded for the project manager.
pub const MANAGER_ROLE_TYPE: &str = "manager";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Create a project with its five fixed phases and the manager as a member.
    ///
    /// The project starts `in_progress` in the `initiation` phase.
    pub async fn create_with_phases(
        pool: &PgPool,
        input: &CreateProject,
    ) -> Result<Project, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO projects
                (project_no, name, project_type, manager_id, created_by, contract_no,
                 budget_code, innovation_code, initiation_date, closing_date,
                 labor_cost, direct_cost, outsourcing_cost, other_cost,
                 current_phase, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             RETURNING {COLUMNS}"
        );
        let project = sqlx::query_as::<_, Project>(&query)
            .bind(&input.project_no)
            .bind(&input.name)
            .bind(&input.project_type)
            .bind(input.manager_id)
            .bind(input.created_by)
            .bind(&input.contract_no)
            .bind(&input.budget_code)
            .bind(&input.innovation_code)
            .bind(input.initiation_date)
            .bind(input.closing_date)
            .bind(input.labor_cost)
            .bind(input.direct_cost)
            .bind(input.outsourcing_cost)
            .bind(input.other_cost)
            .bind(FIXED_PHASES[0].name)
            .bind(STATUS_IN_PROGRESS)
            .fetch_one(&mut *tx)
            .await?;

        for phase in FIXED_PHASES.iter() {
            let status = phase.initial_status();
            sqlx::query(
                "INSERT INTO project_phases
                    (project_id, phase_name, phase_order, is_fixed, status, start_date)
                 VALUES ($1, $2, $3, true, $4,
                         CASE WHEN $4 = 'in_progress' THEN NOW() ELSE NULL END)",
            )
            .bind(project.id)
            .bind(phase.name)
            .bind(phase.order)
            .bind(status)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO project_members (project_id, user_id, role_type) VALUES ($1, $2, $3)",
        )
        .bind(project.id)
        .bind(project.manager_id)
        .bind(MANAGER_ROLE_TYPE)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(project)
    }

    /// Find a project by ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM projects WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a project by its number. Excludes soft-deleted rows.
    pub async fn find_by_no(pool: &PgPool, project_no: &str) -> Result<Option<Project>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM projects WHERE project_no = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Project>(&query)
            .bind(project_no)
            .fetch_optional(pool)
            .await
    }

    /// Map project numbers to IDs for the given set. Unknown numbers are absent.
    pub async fn ids_by_no(
        pool: &PgPool,
        project_nos: &[String],
    ) -> Result<Vec<(String, DbId)>, sqlx::Error> {
        sqlx::query_as::<_, (String, DbId)>(
            "SELECT project_no, id FROM projects \
             WHERE project_no = ANY($1) AND deleted_at IS NULL",
        )
        .bind(project_nos)
        .fetch_all(pool)
        .await
    }

    /// List projects matching the filter, newest first.
    pub async fn list(
        pool: &PgPool,
        params: &ProjectQuery,
        page: &PageRequest,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let filter = build_project_filter(params);
        let idx = filter.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM projects {} ORDER BY created_at DESC LIMIT ${idx} OFFSET ${}",
            filter.where_clause(),
            idx + 1
        );
        bind_values(sqlx::query_as::<_, Project>(&query), filter.values())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    /// Count projects matching the filter.
    pub async fn count(pool: &PgPool, params: &ProjectQuery) -> Result<i64, sqlx::Error> {
        let filter = build_project_filter(params);
        let query = format!("SELECT COUNT(*) FROM projects {}", filter.where_clause());
        bind_values_scalar(sqlx::query_scalar::<_, i64>(&query), filter.values())
            .fetch_one(pool)
            .await
    }

    /// All live projects, for budget comparison.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects WHERE deleted_at IS NULL ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Project>(&query).fetch_all(pool).await
    }

    /// Update a project. Only non-`None` fields in `input` are applied.
    ///
    /// Status and current phase are owned by the phase lifecycle and are
    /// never written here.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                name = COALESCE($2, name),
                project_type = COALESCE($3, project_type),
                manager_id = COALESCE($4, manager_id),
                contract_no = COALESCE($5, contract_no),
                budget_code = COALESCE($6, budget_code),
                innovation_code = COALESCE($7, innovation_code),
                initiation_date = COALESCE($8, initiation_date),
                closing_date = COALESCE($9, closing_date),
                labor_cost = COALESCE($10, labor_cost),
                direct_cost = COALESCE($11, direct_cost),
                outsourcing_cost = COALESCE($12, outsourcing_cost),
                other_cost = COALESCE($13, other_cost),
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.project_type)
            .bind(input.manager_id)
            .bind(&input.contract_no)
            .bind(&input.budget_code)
            .bind(&input.innovation_code)
            .bind(input.initiation_date)
            .bind(input.closing_date)
            .bind(input.labor_cost)
            .bind(input.direct_cost)
            .bind(input.outsourcing_cost)
            .bind(input.other_cost)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a project. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of live projects grouped by status.
    pub async fn status_counts(pool: &PgPool) -> Result<Vec<GroupCount>, sqlx::Error> {
        sqlx::query_as::<_, GroupCount>(
            "SELECT status AS key, COUNT(*)::BIGINT AS count FROM projects \
             WHERE deleted_at IS NULL GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await
    }

    /// Number of live projects grouped by current phase.
    pub async fn phase_counts(pool: &PgPool) -> Result<Vec<GroupCount>, sqlx::Error> {
        sqlx::query_as::<_, GroupCount>(
            "SELECT current_phase AS key, COUNT(*)::BIGINT AS count FROM projects \
             WHERE deleted_at IS NULL GROUP BY current_phase ORDER BY current_phase",
        )
        .fetch_all(pool)
        .await
    }
}

fn build_project_filter(params: &ProjectQuery) -> Filter {
    let mut filter = Filter::new();
    filter.raw("deleted_at IS NULL");
    if let Some(keyword) = params.keyword.as_deref().filter(|k| !k.is_empty()) {
        filter.search(&["name", "project_no"], keyword);
    }
    if let Some(status) = params.status.as_deref().filter(|s| !s.is_empty()) {
        filter.eq("status", BindValue::Text(status.to_string()));
    }
    if let Some(phase) = params.current_phase.as_deref().filter(|s| !s.is_empty()) {
        filter.eq("current_phase", BindValue::Text(phase.to_string()));
    }
    if let Some(manager_id) = params.manager_id {
        filter.eq("manager_id", BindValue::BigInt(manager_id));
    }
    filter
}
