//! Repository for the `documents` table.

use sqlx::PgPool;
use projectflow_core::pagination::PageRequest;
use projectflow_core::types::DbId;

use crate::filter::{bind_values, bind_values_scalar, BindValue, Filter};
use crate::models::document::{CreateDocument, Document, DocumentQuery, UpdateDocument};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, phase_id, task_id, doc_name, doc_type, file_path, \
                       file_size, mime_type, version, status, uploaded_by, remark, \
                       created_at, updated_at";

pub struct DocumentRepo;

impl DocumentRepo {
    pub async fn create(pool: &PgPool, input: &CreateDocument) -> Result<Document, sqlx::Error> {
        let query = format!(
            "INSERT INTO documents
                (project_id, phase_id, task_id, doc_name, doc_type, file_path, file_size,
                 mime_type, uploaded_by, remark)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(input.project_id)
            .bind(input.phase_id)
            .bind(input.task_id)
            .bind(&input.doc_name)
            .bind(&input.doc_type)
            .bind(&input.file_path)
            .bind(input.file_size)
            .bind(&input.mime_type)
            .bind(input.uploaded_by)
            .bind(&input.remark)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Document>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM documents WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        params: &DocumentQuery,
        page: &PageRequest,
    ) -> Result<Vec<Document>, sqlx::Error> {
        let filter = build_document_filter(params);
        let idx = filter.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM documents {} ORDER BY created_at DESC LIMIT ${idx} OFFSET ${}",
            filter.where_clause(),
            idx + 1
        );
        bind_values(sqlx::query_as::<_, Document>(&query), filter.values())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, params: &DocumentQuery) -> Result<i64, sqlx::Error> {
        let filter = build_document_filter(params);
        let query = format!("SELECT COUNT(*) FROM documents {}", filter.where_clause());
        bind_values_scalar(sqlx::query_scalar::<_, i64>(&query), filter.values())
            .fetch_one(pool)
            .await
    }

    /// Update descriptive metadata. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateDocument,
    ) -> Result<Option<Document>, sqlx::Error> {
        let query = format!(
            "UPDATE documents SET
                doc_name = COALESCE($2, doc_name),
                doc_type = COALESCE($3, doc_type),
                phase_id = COALESCE($4, phase_id),
                remark = COALESCE($5, remark),
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .bind(&input.doc_name)
            .bind(&input.doc_type)
            .bind(input.phase_id)
            .bind(&input.remark)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: &str,
    ) -> Result<Option<Document>, sqlx::Error> {
        let query = format!(
            "UPDATE documents SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a document. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE documents SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn build_document_filter(params: &DocumentQuery) -> Filter {
    let mut filter = Filter::new();
    filter.raw("deleted_at IS NULL");
    if let Some(project_id) = params.project_id {
        filter.eq("project_id", BindValue::BigInt(project_id));
    }
    if let Some(phase_id) = params.phase_id {
        filter.eq("phase_id", BindValue::BigInt(phase_id));
    }
    if let Some(task_id) = params.task_id {
        filter.eq("task_id", BindValue::BigInt(task_id));
    }
    if let Some(status) = params.status.as_deref().filter(|s| !s.is_empty()) {
        filter.eq("status", BindValue::Text(status.to_string()));
    }
    if let Some(keyword) = params.keyword.as_deref().filter(|k| !k.is_empty()) {
        filter.search(&["doc_name"], keyword);
    }
    filter
}
