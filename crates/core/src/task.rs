//! Task status, priority and review rules.
//!
//! Assignees move a task between any two statuses. A review supersedes
//! whatever status the assignee set: approval completes the task and
//! rejection marks it rejected.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::lifecycle::{STATUS_COMPLETED, STATUS_IN_PROGRESS, STATUS_NOT_STARTED, STATUS_REJECTED};

pub const PRIORITY_HIGH: i32 = 1;
pub const PRIORITY_MEDIUM: i32 = 2;
pub const PRIORITY_LOW: i32 = 3;

pub const DEFAULT_PRIORITY: i32 = PRIORITY_MEDIUM;

pub const DECISION_APPROVED: &str = "approved";
pub const DECISION_REJECTED: &str = "rejected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
    Rejected,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => STATUS_NOT_STARTED,
            TaskStatus::InProgress => STATUS_IN_PROGRESS,
            TaskStatus::Completed => STATUS_COMPLETED,
            TaskStatus::Rejected => STATUS_REJECTED,
        }
    }
}

impl FromStr for TaskStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            STATUS_NOT_STARTED => Ok(TaskStatus::NotStarted),
            STATUS_IN_PROGRESS => Ok(TaskStatus::InProgress),
            STATUS_COMPLETED => Ok(TaskStatus::Completed),
            STATUS_REJECTED => Ok(TaskStatus::Rejected),
            other => Err(CoreError::Validation(format!(
                "Invalid task status '{other}'. Must be one of: not_started, in_progress, completed, rejected"
            ))),
        }
    }
}

/// Outcome of reviewing a delivered task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewDecision::Approved => DECISION_APPROVED,
            ReviewDecision::Rejected => DECISION_REJECTED,
        }
    }

    /// The task status a review forces.
    pub fn resulting_status(self) -> TaskStatus {
        match self {
            ReviewDecision::Approved => TaskStatus::Completed,
            ReviewDecision::Rejected => TaskStatus::Rejected,
        }
    }
}

impl FromStr for ReviewDecision {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            DECISION_APPROVED => Ok(ReviewDecision::Approved),
            DECISION_REJECTED => Ok(ReviewDecision::Rejected),
            other => Err(CoreError::Validation(format!(
                "Invalid review decision '{other}'. Must be one of: approved, rejected"
            ))),
        }
    }
}

/// Resolve an optional priority to a valid value, defaulting to medium.
pub fn resolve_priority(priority: Option<i32>) -> Result<i32, CoreError> {
    match priority {
        None => Ok(DEFAULT_PRIORITY),
        Some(p) if (PRIORITY_HIGH..=PRIORITY_LOW).contains(&p) => Ok(p),
        Some(p) => Err(CoreError::Validation(format!(
            "Invalid priority {p}. Must be 1 (high), 2 (medium) or 3 (low)"
        ))),
    }
}

/// Parse a comma-separated status filter such as `"not_started,in_progress"`.
///
/// Blank entries are ignored; unknown statuses are rejected.
pub fn parse_status_filter(raw: &str) -> Result<Vec<TaskStatus>, CoreError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(TaskStatus::from_str)
        .collect()
}

/// Whether a status change should stamp `completed_at`.
pub fn stamps_completion(status: TaskStatus) -> bool {
    status == TaskStatus::Completed
}
