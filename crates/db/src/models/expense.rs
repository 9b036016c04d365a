//! Expense entity model, DTOs and aggregates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use projectflow_core::types::{DbId, Timestamp};

/// A row from the `expenses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Expense {
    pub id: DbId,
    pub project_id: Option<DbId>,
    pub is_classified: bool,
    pub expense_type: String,
    pub amount: f64,
    pub expense_date: NaiveDate,
    pub description: Option<String>,
    pub reimbursed_by: DbId,
    pub voucher_paths: Vec<String>,
    pub remark: Option<String>,
    pub document_no: Option<String>,
    pub source: String,
    pub import_file: Option<String>,
    pub imported_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Request body for creating or replacing an expense.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseInput {
    pub project_id: Option<DbId>,
    pub expense_type: String,
    pub amount: f64,
    pub expense_date: NaiveDate,
    pub description: Option<String>,
    pub remark: Option<String>,
    pub document_no: Option<String>,
}

/// Filters for listing expenses.
#[derive(Debug, Default, Deserialize)]
pub struct ExpenseQuery {
    pub project_id: Option<DbId>,
    pub expense_type: Option<String>,
    pub reimbursed_by: Option<DbId>,
    #[serde(alias = "classified")]
    pub is_classified: Option<bool>,
}

/// Sum of amounts for one expense type.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TypeTotal {
    pub expense_type: String,
    pub total: f64,
}

/// Sum of amounts per project and expense type.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectTypeTotal {
    pub project_id: DbId,
    pub expense_type: String,
    pub total: f64,
}

/// One reconciled spreadsheet row, ready to write.
#[derive(Debug, Clone)]
pub struct ImportedExpense {
    pub document_no: String,
    pub project_id: Option<DbId>,
    pub expense_type: String,
    pub amount: f64,
    pub expense_date: NaiveDate,
    pub description: Option<String>,
    pub remark: Option<String>,
}

/// Counts of rows inserted and updated by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportCounts {
    pub inserted: usize,
    pub updated: usize,
}
