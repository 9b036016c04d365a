//! Contract entity model and DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use projectflow_core::types::{DbId, Timestamp};

pub const STATUS_DRAFT: &str = "draft";

/// A row from the `contracts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Contract {
    pub id: DbId,
    pub project_id: Option<DbId>,
    pub contract_no: String,
    pub contract_name: String,
    pub party_a: Option<String>,
    pub party_b: Option<String>,
    pub amount: f64,
    pub sign_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub status: String,
    pub file_path: Option<String>,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Request body for creating a contract.
#[derive(Debug, Deserialize)]
pub struct CreateContract {
    pub project_id: Option<DbId>,
    /// Generated when absent.
    pub contract_no: Option<String>,
    pub contract_name: String,
    pub party_a: Option<String>,
    pub party_b: Option<String>,
    pub amount: Option<f64>,
    pub sign_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
}

/// DTO for updating a contract. Only non-`None` fields are applied.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateContract {
    pub project_id: Option<DbId>,
    pub contract_name: Option<String>,
    pub party_a: Option<String>,
    pub party_b: Option<String>,
    pub amount: Option<f64>,
    pub sign_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub status: Option<String>,
}

/// Filters for listing contracts.
#[derive(Debug, Default, Deserialize)]
pub struct ContractQuery {
    pub project_id: Option<DbId>,
    pub status: Option<String>,
    /// Matches contract name, number or either party.
    pub keyword: Option<String>,
}
