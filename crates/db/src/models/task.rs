//! Task entity model and DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use projectflow_core::types::{DbId, Timestamp};

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub project_id: DbId,
    pub phase_id: Option<DbId>,
    pub task_name: String,
    pub description: Option<String>,
    pub task_type: Option<String>,
    pub assignee_id: Option<DbId>,
    pub assignee_type: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: String,
    pub priority: i32,
    pub deliverables: Option<String>,
    pub review_status: Option<String>,
    pub review_comment: Option<String>,
    pub reviewed_by: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Request body for creating a task (also one element of a batch).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub project_id: DbId,
    pub phase_id: Option<DbId>,
    pub task_name: String,
    pub description: Option<String>,
    pub task_type: Option<String>,
    pub assignee_id: Option<DbId>,
    pub assignee_type: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub priority: Option<i32>,
    pub deliverables: Option<String>,
}

/// DTO for editing a task's descriptive fields. Status is not editable here.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTask {
    pub phase_id: Option<DbId>,
    pub task_name: Option<String>,
    pub description: Option<String>,
    pub task_type: Option<String>,
    pub assignee_id: Option<DbId>,
    pub assignee_type: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub priority: Option<i32>,
    pub deliverables: Option<String>,
}

/// Filters for listing tasks.
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub project_id: Option<DbId>,
    pub phase_id: Option<DbId>,
    pub status: Option<String>,
    pub assignee_id: Option<DbId>,
    /// Matches task name or description.
    pub keyword: Option<String>,
}
