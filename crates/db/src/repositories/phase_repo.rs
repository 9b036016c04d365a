//! Repository for the `project_phases` table, including the status cascade.

use sqlx::PgPool;
use projectflow_core::lifecycle::{
    self, Cascade, PhaseState, CUSTOM_ORDER_END, CUSTOM_ORDER_START, STATUS_COMPLETED,
    STATUS_IN_PROGRESS,
};
use projectflow_core::types::DbId;

use crate::error::RepoError;
use crate::models::project::{PhaseChangeOutcome, Project, ProjectPhase};
use crate::repositories::project_repo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, phase_name, phase_order, is_fixed, status, start_date, \
                       completed_at, remark, created_at, updated_at";

/// Provides phase queries and lifecycle mutations.
pub struct PhaseRepo;

impl PhaseRepo {
    /// List a project's phases ordered by `phase_order`.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<ProjectPhase>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_phases WHERE project_id = $1 ORDER BY phase_order ASC"
        );
        sqlx::query_as::<_, ProjectPhase>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Find a phase belonging to the given project.
    pub async fn find(
        pool: &PgPool,
        project_id: DbId,
        phase_id: DbId,
    ) -> Result<Option<ProjectPhase>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM project_phases WHERE id = $1 AND project_id = $2");
        sqlx::query_as::<_, ProjectPhase>(&query)
            .bind(phase_id)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    /// Append a custom phase after the existing custom phases.
    ///
    /// The project row is locked while the next order is computed, so two
    /// concurrent inserts cannot pick the same order.
    pub async fn add_custom(
        pool: &PgPool,
        project_id: DbId,
        phase_name: &str,
        remark: Option<&str>,
    ) -> Result<ProjectPhase, RepoError> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        let max_custom: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(phase_order) FROM project_phases \
             WHERE project_id = $1 AND phase_order >= $2 AND phase_order < $3",
        )
        .bind(project_id)
        .bind(CUSTOM_ORDER_START)
        .bind(CUSTOM_ORDER_END)
        .fetch_one(&mut *tx)
        .await?;

        let order = lifecycle::next_custom_order(max_custom)?;

        let query = format!(
            "INSERT INTO project_phases (project_id, phase_name, phase_order, is_fixed, remark)
             VALUES ($1, $2, $3, false, $4)
             RETURNING {COLUMNS}"
        );
        let phase = sqlx::query_as::<_, ProjectPhase>(&query)
            .bind(project_id)
            .bind(phase_name)
            .bind(order)
            .bind(remark)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(phase)
    }

    /// Change a phase's status and apply the cascade in one transaction.
    ///
    /// Returns `Ok(None)` when the phase does not belong to the project.
    pub async fn apply_status_change(
        pool: &PgPool,
        project_id: DbId,
        phase_id: DbId,
        new_status: &str,
        remark: Option<&str>,
    ) -> Result<Option<PhaseChangeOutcome>, RepoError> {
        let mut tx = pool.begin().await?;

        // Serialises concurrent completions within one project.
        let locked = sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM projects WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(project_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let query = format!(
            "SELECT {COLUMNS} FROM project_phases WHERE project_id = $1 ORDER BY phase_order ASC"
        );
        let phases = sqlx::query_as::<_, ProjectPhase>(&query)
            .bind(project_id)
            .fetch_all(&mut *tx)
            .await?;

        let Some(target) = phases.iter().find(|p| p.id == phase_id) else {
            return Ok(None);
        };
        let states: Vec<PhaseState> = phases.iter().map(to_state).collect();
        let plan = lifecycle::plan_phase_transition(&to_state(target), new_status, &states)?;

        let query = format!(
            "UPDATE project_phases SET
                status = $2,
                completed_at = CASE WHEN $3 THEN NOW() ELSE completed_at END,
                start_date = CASE WHEN $4 THEN NOW() ELSE start_date END,
                remark = COALESCE($5, remark),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let phase = sqlx::query_as::<_, ProjectPhase>(&query)
            .bind(phase_id)
            .bind(&plan.status)
            .bind(plan.stamp_completed_at)
            .bind(plan.stamp_start_date)
            .bind(remark)
            .fetch_one(&mut *tx)
            .await?;

        let mut activated = None;
        match &plan.cascade {
            Cascade::None => {}
            Cascade::ActivateSuccessor {
                phase_id: next_id,
                phase_name,
            } => {
                let query = format!(
                    "UPDATE project_phases SET
                        status = $2,
                        start_date = COALESCE(start_date, NOW()),
                        updated_at = NOW()
                     WHERE id = $1
                     RETURNING {COLUMNS}"
                );
                let next = sqlx::query_as::<_, ProjectPhase>(&query)
                    .bind(next_id)
                    .bind(STATUS_IN_PROGRESS)
                    .fetch_one(&mut *tx)
                    .await?;
                activated = Some(next);

                sqlx::query(
                    "UPDATE projects SET current_phase = $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(project_id)
                .bind(phase_name)
                .execute(&mut *tx)
                .await?;
            }
            Cascade::CompleteProject => {
                sqlx::query("UPDATE projects SET status = $2, updated_at = NOW() WHERE id = $1")
                    .bind(project_id)
                    .bind(STATUS_COMPLETED)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let query = format!(
            "SELECT {} FROM projects WHERE id = $1",
            project_repo::COLUMNS
        );
        let project = sqlx::query_as::<_, Project>(&query)
            .bind(project_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(PhaseChangeOutcome {
            phase,
            activated,
            project,
        }))
    }

    /// Number of live tasks referencing a phase.
    pub async fn count_tasks(pool: &PgPool, phase_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tasks WHERE phase_id = $1 AND deleted_at IS NULL",
        )
        .bind(phase_id)
        .fetch_one(pool)
        .await
    }

    /// Delete a custom phase that no task references.
    ///
    /// Returns `Ok(false)` when the phase does not belong to the project.
    pub async fn delete(pool: &PgPool, project_id: DbId, phase_id: DbId) -> Result<bool, RepoError> {
        let Some(phase) = Self::find(pool, project_id, phase_id).await? else {
            return Ok(false);
        };
        let referencing = Self::count_tasks(pool, phase_id).await?;
        lifecycle::ensure_phase_deletable(phase.is_fixed, referencing)?;

        let result = sqlx::query(
            "DELETE FROM project_phases WHERE id = $1 AND project_id = $2 AND is_fixed = false",
        )
        .bind(phase_id)
        .bind(project_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn to_state(phase: &ProjectPhase) -> PhaseState {
    PhaseState {
        id: phase.id,
        name: phase.phase_name.clone(),
        order: phase.phase_order,
        start_date: phase.start_date,
    }
}
