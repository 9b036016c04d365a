//! Knowledge-base models: items, categories and version history.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use projectflow_core::types::{DbId, Timestamp};

/// A row from the `kb_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct KnowledgeItem {
    pub id: DbId,
    pub title: String,
    pub category_id: DbId,
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub version: String,
    pub status: String,
    pub view_count: i64,
    pub download_count: i64,
    pub uploaded_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for recording an uploaded knowledge item.
#[derive(Debug)]
pub struct CreateKnowledgeItem {
    pub title: String,
    pub category_id: DbId,
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub status: String,
    pub uploaded_by: DbId,
}

/// DTO for editing item metadata.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateKnowledgeItem {
    pub title: Option<String>,
    pub category_id: Option<DbId>,
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// A replacement file for an existing item.
#[derive(Debug)]
pub struct NewKnowledgeVersion {
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub change_note: Option<String>,
    pub uploaded_by: DbId,
}

/// Filters for listing items.
#[derive(Debug, Default, Deserialize)]
pub struct KnowledgeQuery {
    /// Matches title, keywords or description.
    pub keyword: Option<String>,
    pub category_id: Option<DbId>,
    pub uploaded_by: Option<DbId>,
    /// Defaults to `published` when absent.
    pub status: Option<String>,
}

/// A row from the `kb_categories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct KnowledgeCategory {
    pub id: DbId,
    pub name: String,
    pub parent_id: Option<DbId>,
    pub description: Option<String>,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct CreateKnowledgeCategory {
    pub name: String,
    pub parent_id: Option<DbId>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateKnowledgeCategory {
    pub name: Option<String>,
    pub parent_id: Option<DbId>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

/// A row from the `kb_versions` table: a superseded file of an item.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct KnowledgeVersion {
    pub id: DbId,
    pub knowledge_id: DbId,
    pub version: String,
    pub file_path: String,
    pub change_note: Option<String>,
    pub uploaded_by: DbId,
    pub created_at: Timestamp,
}
