//! Repository for the `contracts` table.

use sqlx::PgPool;
use projectflow_core::pagination::PageRequest;
use projectflow_core::types::DbId;

use crate::filter::{bind_values, bind_values_scalar, BindValue, Filter};
use crate::models::contract::{Contract, ContractQuery, CreateContract, UpdateContract, STATUS_DRAFT};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, contract_no, contract_name, party_a, party_b, amount, \
                       sign_date, start_date, end_date, payment_method, status, file_path, \
                       created_by, created_at, updated_at";

pub struct ContractRepo;

impl ContractRepo {
    /// Insert a contract in `draft` status under an already-allocated number.
    pub async fn create(
        pool: &PgPool,
        contract_no: &str,
        input: &CreateContract,
        created_by: DbId,
    ) -> Result<Contract, sqlx::Error> {
        let query = format!(
            "INSERT INTO contracts
                (project_id, contract_no, contract_name, party_a, party_b, amount, sign_date,
                 start_date, end_date, payment_method, status, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Contract>(&query)
            .bind(input.project_id)
            .bind(contract_no)
            .bind(&input.contract_name)
            .bind(&input.party_a)
            .bind(&input.party_b)
            .bind(input.amount.unwrap_or(0.0))
            .bind(input.sign_date)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(&input.payment_method)
            .bind(STATUS_DRAFT)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Contract>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM contracts WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Contract>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        params: &ContractQuery,
        page: &PageRequest,
    ) -> Result<Vec<Contract>, sqlx::Error> {
        let filter = build_contract_filter(params);
        let idx = filter.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM contracts {} ORDER BY created_at DESC LIMIT ${idx} OFFSET ${}",
            filter.where_clause(),
            idx + 1
        );
        bind_values(sqlx::query_as::<_, Contract>(&query), filter.values())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, params: &ContractQuery) -> Result<i64, sqlx::Error> {
        let filter = build_contract_filter(params);
        let query = format!("SELECT COUNT(*) FROM contracts {}", filter.where_clause());
        bind_values_scalar(sqlx::query_scalar::<_, i64>(&query), filter.values())
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateContract,
    ) -> Result<Option<Contract>, sqlx::Error> {
        let query = format!(
            "UPDATE contracts SET
                project_id = COALESCE($2, project_id),
                contract_name = COALESCE($3, contract_name),
                party_a = COALESCE($4, party_a),
                party_b = COALESCE($5, party_b),
                amount = COALESCE($6, amount),
                sign_date = COALESCE($7, sign_date),
                start_date = COALESCE($8, start_date),
                end_date = COALESCE($9, end_date),
                payment_method = COALESCE($10, payment_method),
                status = COALESCE($11, status),
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Contract>(&query)
            .bind(id)
            .bind(input.project_id)
            .bind(&input.contract_name)
            .bind(&input.party_a)
            .bind(&input.party_b)
            .bind(input.amount)
            .bind(input.sign_date)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(&input.payment_method)
            .bind(&input.status)
            .fetch_optional(pool)
            .await
    }

    /// Replace the stored contract file path.
    pub async fn set_file_path(
        pool: &PgPool,
        id: DbId,
        file_path: &str,
    ) -> Result<Option<Contract>, sqlx::Error> {
        let query = format!(
            "UPDATE contracts SET file_path = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Contract>(&query)
            .bind(id)
            .bind(file_path)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a contract. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE contracts SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn build_contract_filter(params: &ContractQuery) -> Filter {
    let mut filter = Filter::new();
    filter.raw("deleted_at IS NULL");
    if let Some(project_id) = params.project_id {
        filter.eq("project_id", BindValue::BigInt(project_id));
    }
    if let Some(status) = params.status.as_deref().filter(|s| !s.is_empty()) {
        filter.eq("status", BindValue::Text(status.to_string()));
    }
    if let Some(keyword) = params.keyword.as_deref().filter(|k| !k.is_empty()) {
        filter.search(&["contract_name", "contract_no", "party_a", "party_b"], keyword);
    }
    filter
}
