//! Repository for the `expenses` table, including spreadsheet reconciliation.

use sqlx::PgPool;
use projectflow_core::expense::{SOURCE_IMPORT, SOURCE_MANUAL};
use projectflow_core::pagination::PageRequest;
use projectflow_core::types::DbId;

use crate::filter::{bind_values, bind_values_scalar, BindValue, Filter};
use crate::models::expense::{
    Expense, ExpenseInput, ExpenseQuery, ImportCounts, ImportedExpense, ProjectTypeTotal,
    TypeTotal,
};

const COLUMNS: &str = "id, project_id, is_classified, expense_type, amount, expense_date, \
                       description, reimbursed_by, voucher_paths, remark, document_no, source, \
                       import_file, imported_at, created_at, updated_at";

pub struct ExpenseRepo;

impl ExpenseRepo {
    /// Insert a manually entered expense. It is classified iff it has a project.
    pub async fn create(
        pool: &PgPool,
        input: &ExpenseInput,
        reimbursed_by: DbId,
    ) -> Result<Expense, sqlx::Error> {
        let query = format!(
            "INSERT INTO expenses
                (project_id, is_classified, expense_type, amount, expense_date, description,
                 reimbursed_by, remark, document_no, source)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Expense>(&query)
            .bind(input.project_id)
            .bind(input.project_id.is_some())
            .bind(&input.expense_type)
            .bind(input.amount)
            .bind(input.expense_date)
            .bind(&input.description)
            .bind(reimbursed_by)
            .bind(&input.remark)
            .bind(&input.document_no)
            .bind(SOURCE_MANUAL)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Expense>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM expenses WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Expense>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        params: &ExpenseQuery,
        page: &PageRequest,
    ) -> Result<Vec<Expense>, sqlx::Error> {
        let filter = build_expense_filter(params);
        let idx = filter.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM expenses {} \
             ORDER BY expense_date DESC, id DESC LIMIT ${idx} OFFSET ${}",
            filter.where_clause(),
            idx + 1
        );
        bind_values(sqlx::query_as::<_, Expense>(&query), filter.values())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, params: &ExpenseQuery) -> Result<i64, sqlx::Error> {
        let filter = build_expense_filter(params);
        let query = format!("SELECT COUNT(*) FROM expenses {}", filter.where_clause());
        bind_values_scalar(sqlx::query_scalar::<_, i64>(&query), filter.values())
            .fetch_one(pool)
            .await
    }

    /// Replace every editable field. `is_classified` follows `project_id`.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &ExpenseInput,
    ) -> Result<Option<Expense>, sqlx::Error> {
        let query = format!(
            "UPDATE expenses SET
                project_id = $2,
                is_classified = $3,
                expense_type = $4,
                amount = $5,
                expense_date = $6,
                description = $7,
                remark = $8,
                document_no = COALESCE($9, document_no),
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Expense>(&query)
            .bind(id)
            .bind(input.project_id)
            .bind(input.project_id.is_some())
            .bind(&input.expense_type)
            .bind(input.amount)
            .bind(input.expense_date)
            .bind(&input.description)
            .bind(&input.remark)
            .bind(&input.document_no)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite the voucher path list.
    pub async fn set_vouchers(
        pool: &PgPool,
        id: DbId,
        paths: &[String],
    ) -> Result<Option<Expense>, sqlx::Error> {
        let query = format!(
            "UPDATE expenses SET voucher_paths = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Expense>(&query)
            .bind(id)
            .bind(paths)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete an expense. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE expenses SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Total amount per expense type, optionally for one project.
    pub async fn totals_by_type(
        pool: &PgPool,
        project_id: Option<DbId>,
    ) -> Result<Vec<TypeTotal>, sqlx::Error> {
        sqlx::query_as::<_, TypeTotal>(
            "SELECT expense_type, COALESCE(SUM(amount), 0)::DOUBLE PRECISION AS total
             FROM expenses
             WHERE deleted_at IS NULL AND ($1::BIGINT IS NULL OR project_id = $1)
             GROUP BY expense_type
             ORDER BY expense_type",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Total amount per (project, type) over classified expenses.
    pub async fn project_type_totals(pool: &PgPool) -> Result<Vec<ProjectTypeTotal>, sqlx::Error> {
        sqlx::query_as::<_, ProjectTypeTotal>(
            "SELECT project_id, expense_type, COALESCE(SUM(amount), 0)::DOUBLE PRECISION AS total
             FROM expenses
             WHERE deleted_at IS NULL AND project_id IS NOT NULL
             GROUP BY project_id, expense_type",
        )
        .fetch_all(pool)
        .await
    }

    /// Reconcile imported rows against live expenses by document number.
    ///
    /// Matching rows are updated in place, the rest inserted. Runs in one
    /// transaction; any failure leaves the table untouched.
    pub async fn import_rows(
        pool: &PgPool,
        rows: &[ImportedExpense],
        imported_by: DbId,
        import_file: &str,
    ) -> Result<ImportCounts, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut counts = ImportCounts::default();

        for row in rows {
            let existing = sqlx::query_scalar::<_, DbId>(
                "SELECT id FROM expenses \
                 WHERE document_no = $1 AND deleted_at IS NULL FOR UPDATE",
            )
            .bind(&row.document_no)
            .fetch_optional(&mut *tx)
            .await?;

            match existing {
                Some(id) => {
                    sqlx::query(
                        "UPDATE expenses SET
                            project_id = $2,
                            is_classified = $3,
                            expense_type = $4,
                            amount = $5,
                            expense_date = $6,
                            description = $7,
                            remark = $8,
                            import_file = $9,
                            imported_at = NOW(),
                            updated_at = NOW()
                         WHERE id = $1",
                    )
                    .bind(id)
                    .bind(row.project_id)
                    .bind(row.project_id.is_some())
                    .bind(&row.expense_type)
                    .bind(row.amount)
                    .bind(row.expense_date)
                    .bind(&row.description)
                    .bind(&row.remark)
                    .bind(import_file)
                    .execute(&mut *tx)
                    .await?;
                    counts.updated += 1;
                }
                None => {
                    sqlx::query(
                        "INSERT INTO expenses
                            (project_id, is_classified, expense_type, amount, expense_date,
                             description, reimbursed_by, remark, document_no, source,
                             import_file, imported_at)
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())",
                    )
                    .bind(row.project_id)
                    .bind(row.project_id.is_some())
                    .bind(&row.expense_type)
                    .bind(row.amount)
                    .bind(row.expense_date)
                    .bind(&row.description)
                    .bind(imported_by)
                    .bind(&row.remark)
                    .bind(&row.document_no)
                    .bind(SOURCE_IMPORT)
                    .bind(import_file)
                    .execute(&mut *tx)
                    .await?;
                    counts.inserted += 1;
                }
            }
        }

        tx.commit().await?;
        Ok(counts)
    }
}

fn build_expense_filter(params: &ExpenseQuery) -> Filter {
    let mut filter = Filter::new();
    filter.raw("deleted_at IS NULL");
    if let Some(project_id) = params.project_id {
        filter.eq("project_id", BindValue::BigInt(project_id));
    }
    if let Some(expense_type) = params.expense_type.as_deref().filter(|s| !s.is_empty()) {
        filter.eq("expense_type", BindValue::Text(expense_type.to_string()));
    }
    if let Some(reimbursed_by) = params.reimbursed_by {
        filter.eq("reimbursed_by", BindValue::BigInt(reimbursed_by));
    }
    if let Some(is_classified) = params.is_classified {
        filter.eq("is_classified", BindValue::Bool(is_classified));
    }
    filter
}
