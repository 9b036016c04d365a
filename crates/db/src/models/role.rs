//! Role entity model.

use serde::Serialize;
use sqlx::FromRow;
use projectflow_core::types::{DbId, Timestamp};

/// A row from the `roles` table.
///
/// `permissions` is advisory JSON metadata for clients; enforcement compares
/// role codes.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Role {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub description: String,
    pub permissions: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
