//! Document entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use projectflow_core::types::{DbId, Timestamp};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_ARCHIVED: &str = "archived";

/// A row from the `documents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: DbId,
    pub project_id: DbId,
    pub phase_id: Option<DbId>,
    pub task_id: Option<DbId>,
    pub doc_name: String,
    pub doc_type: Option<String>,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub version: String,
    pub status: String,
    pub uploaded_by: DbId,
    pub remark: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for recording an uploaded document.
#[derive(Debug)]
pub struct CreateDocument {
    pub project_id: DbId,
    pub phase_id: Option<DbId>,
    pub task_id: Option<DbId>,
    pub doc_name: String,
    pub doc_type: Option<String>,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub uploaded_by: DbId,
    pub remark: Option<String>,
}

/// DTO for editing document metadata.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDocument {
    pub doc_name: Option<String>,
    pub doc_type: Option<String>,
    pub phase_id: Option<DbId>,
    pub remark: Option<String>,
}

/// Filters for listing documents.
#[derive(Debug, Default, Deserialize)]
pub struct DocumentQuery {
    pub project_id: Option<DbId>,
    pub phase_id: Option<DbId>,
    pub task_id: Option<DbId>,
    pub status: Option<String>,
    /// Matches document name.
    pub keyword: Option<String>,
}
