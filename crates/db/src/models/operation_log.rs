//! Operation-log (audit trail) model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use projectflow_core::types::{DbId, Timestamp};

/// A row from the `operation_logs` table joined with the acting username.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OperationLog {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub username: Option<String>,
    pub action: String,
    pub module: String,
    pub target_type: Option<String>,
    pub target_id: Option<DbId>,
    pub target_name: Option<String>,
    pub description: Option<String>,
    pub result: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for appending a log entry.
#[derive(Debug, Clone, Default)]
pub struct CreateOperationLog {
    pub user_id: Option<DbId>,
    pub action: String,
    pub module: String,
    pub target_type: Option<String>,
    pub target_id: Option<DbId>,
    pub target_name: Option<String>,
    pub description: Option<String>,
    pub result: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Filters for listing log entries.
#[derive(Debug, Default)]
pub struct LogQuery {
    pub user_id: Option<DbId>,
    pub action: Option<String>,
    pub module: Option<String>,
    pub target_type: Option<String>,
    /// Inclusive lower bound (`created_at >= from`).
    pub from: Option<Timestamp>,
    /// Exclusive upper bound (`created_at < to`).
    pub to: Option<Timestamp>,
    /// Matches description or target name.
    pub keyword: Option<String>,
}

/// Aggregate counts for the log dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct LogStatistics {
    pub today_count: i64,
    pub week_count: i64,
    pub module_counts: Vec<crate::models::project::GroupCount>,
    pub action_counts: Vec<crate::models::project::GroupCount>,
}
