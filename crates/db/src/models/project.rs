//! Project, phase and membership models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use projectflow_core::types::{DbId, Timestamp};

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub project_no: String,
    pub name: String,
    pub project_type: String,
    pub manager_id: DbId,
    pub created_by: DbId,
    pub contract_no: Option<String>,
    pub budget_code: Option<String>,
    pub innovation_code: Option<String>,
    pub initiation_date: Option<NaiveDate>,
    pub closing_date: Option<NaiveDate>,
    pub labor_cost: f64,
    pub direct_cost: f64,
    pub outsourcing_cost: f64,
    pub other_cost: f64,
    pub current_phase: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Fully resolved input for creating a project with its fixed phases.
#[derive(Debug)]
pub struct CreateProject {
    pub project_no: String,
    pub name: String,
    pub project_type: String,
    pub manager_id: DbId,
    pub created_by: DbId,
    pub contract_no: Option<String>,
    pub budget_code: Option<String>,
    pub innovation_code: Option<String>,
    pub initiation_date: Option<NaiveDate>,
    pub closing_date: Option<NaiveDate>,
    pub labor_cost: f64,
    pub direct_cost: f64,
    pub outsourcing_cost: f64,
    pub other_cost: f64,
}

/// DTO for updating a project. Only non-`None` fields are applied.
///
/// Status and current phase are driven by the phase lifecycle and cannot be
/// set here.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub project_type: Option<String>,
    pub manager_id: Option<DbId>,
    pub contract_no: Option<String>,
    pub budget_code: Option<String>,
    pub innovation_code: Option<String>,
    pub initiation_date: Option<NaiveDate>,
    pub closing_date: Option<NaiveDate>,
    pub labor_cost: Option<f64>,
    pub direct_cost: Option<f64>,
    pub outsourcing_cost: Option<f64>,
    pub other_cost: Option<f64>,
}

/// Filters for listing projects.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    /// Matches project name or number.
    pub keyword: Option<String>,
    pub status: Option<String>,
    pub current_phase: Option<String>,
    pub manager_id: Option<DbId>,
}

/// A `(key, count)` pair from a `GROUP BY` aggregate.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}

/// A row from the `project_phases` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectPhase {
    pub id: DbId,
    pub project_id: DbId,
    pub phase_name: String,
    pub phase_order: i32,
    pub is_fixed: bool,
    pub status: String,
    pub start_date: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub remark: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Result of a phase status change, including any cascaded writes.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseChangeOutcome {
    pub phase: ProjectPhase,
    /// The successor phase activated by a completion, if any.
    pub activated: Option<ProjectPhase>,
    pub project: Project,
}

/// A row from the `project_members` table joined with the user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectMember {
    pub id: DbId,
    pub project_id: DbId,
    pub user_id: DbId,
    pub username: String,
    pub name: String,
    pub role_type: String,
    pub join_date: Timestamp,
}
