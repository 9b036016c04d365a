//! Repositories for the knowledge base: `kb_items`, `kb_versions` and
//! `kb_categories`.

use sqlx::PgPool;
use projectflow_core::knowledge;
use projectflow_core::pagination::PageRequest;
use projectflow_core::types::DbId;

use crate::filter::{bind_values, bind_values_scalar, BindValue, Filter};
use crate::models::knowledge::{
    CreateKnowledgeCategory, CreateKnowledgeItem, KnowledgeCategory, KnowledgeItem,
    KnowledgeQuery, KnowledgeVersion, NewKnowledgeVersion, UpdateKnowledgeCategory,
    UpdateKnowledgeItem,
};

const COLUMNS: &str = "id, title, category_id, keywords, description, file_path, file_size, \
                       mime_type, version, status, view_count, download_count, uploaded_by, \
                       created_at, updated_at";

const VERSION_COLUMNS: &str =
    "id, knowledge_id, version, file_path, change_note, uploaded_by, created_at";

const CATEGORY_COLUMNS: &str =
    "id, name, parent_id, description, sort_order, created_at, updated_at";

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

pub struct KnowledgeRepo;

impl KnowledgeRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateKnowledgeItem,
    ) -> Result<KnowledgeItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO kb_items
                (title, category_id, keywords, description, file_path, file_size, mime_type,
                 version, status, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, KnowledgeItem>(&query)
            .bind(&input.title)
            .bind(input.category_id)
            .bind(&input.keywords)
            .bind(&input.description)
            .bind(&input.file_path)
            .bind(input.file_size)
            .bind(&input.mime_type)
            .bind(knowledge::INITIAL_VERSION)
            .bind(&input.status)
            .bind(input.uploaded_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<KnowledgeItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM kb_items WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, KnowledgeItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        params: &KnowledgeQuery,
        page: &PageRequest,
    ) -> Result<Vec<KnowledgeItem>, sqlx::Error> {
        let filter = build_knowledge_filter(params);
        let idx = filter.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM kb_items {} ORDER BY created_at DESC LIMIT ${idx} OFFSET ${}",
            filter.where_clause(),
            idx + 1
        );
        bind_values(sqlx::query_as::<_, KnowledgeItem>(&query), filter.values())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, params: &KnowledgeQuery) -> Result<i64, sqlx::Error> {
        let filter = build_knowledge_filter(params);
        let query = format!("SELECT COUNT(*) FROM kb_items {}", filter.where_clause());
        bind_values_scalar(sqlx::query_scalar::<_, i64>(&query), filter.values())
            .fetch_one(pool)
            .await
    }

    /// Most viewed published items, ties broken by downloads.
    pub async fn hot(pool: &PgPool, limit: i64) -> Result<Vec<KnowledgeItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM kb_items \
             WHERE deleted_at IS NULL AND status = $1 \
             ORDER BY view_count DESC, download_count DESC, id DESC LIMIT $2"
        );
        sqlx::query_as::<_, KnowledgeItem>(&query)
            .bind(knowledge::STATUS_PUBLISHED)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Increment `view_count` and return the updated row.
    pub async fn record_view(pool: &PgPool, id: DbId) -> Result<Option<KnowledgeItem>, sqlx::Error> {
        let query = format!(
            "UPDATE kb_items SET view_count = view_count + 1 \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, KnowledgeItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Increment `download_count` and return the updated row.
    pub async fn record_download(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<KnowledgeItem>, sqlx::Error> {
        let query = format!(
            "UPDATE kb_items SET download_count = download_count + 1 \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, KnowledgeItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateKnowledgeItem,
    ) -> Result<Option<KnowledgeItem>, sqlx::Error> {
        let query = format!(
            "UPDATE kb_items SET
                title = COALESCE($2, title),
                category_id = COALESCE($3, category_id),
                keywords = COALESCE($4, keywords),
                description = COALESCE($5, description),
                status = COALESCE($6, status),
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, KnowledgeItem>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(input.category_id)
            .bind(&input.keywords)
            .bind(&input.description)
            .bind(&input.status)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete an item. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE kb_items SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Archive the current file as a version row, then point the item at the
    /// new file with a bumped version number.
    pub async fn new_version(
        pool: &PgPool,
        id: DbId,
        input: &NewKnowledgeVersion,
    ) -> Result<Option<KnowledgeItem>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "SELECT {COLUMNS} FROM kb_items WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        );
        let Some(current) = sqlx::query_as::<_, KnowledgeItem>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        sqlx::query(
            "INSERT INTO kb_versions (knowledge_id, version, file_path, change_note, uploaded_by)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&current.version)
        .bind(&current.file_path)
        .bind(&input.change_note)
        .bind(input.uploaded_by)
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "UPDATE kb_items SET
                file_path = $2,
                file_size = $3,
                mime_type = $4,
                version = $5,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, KnowledgeItem>(&query)
            .bind(id)
            .bind(&input.file_path)
            .bind(input.file_size)
            .bind(&input.mime_type)
            .bind(knowledge::next_version(&current.version))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    /// Archived versions of an item, newest first.
    pub async fn list_versions(
        pool: &PgPool,
        knowledge_id: DbId,
    ) -> Result<Vec<KnowledgeVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {VERSION_COLUMNS} FROM kb_versions WHERE knowledge_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, KnowledgeVersion>(&query)
            .bind(knowledge_id)
            .fetch_all(pool)
            .await
    }
}

fn build_knowledge_filter(params: &KnowledgeQuery) -> Filter {
    let mut filter = Filter::new();
    filter.raw("deleted_at IS NULL");
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(knowledge::STATUS_PUBLISHED);
    filter.eq("status", BindValue::Text(status.to_string()));
    if let Some(keyword) = params.keyword.as_deref().filter(|k| !k.is_empty()) {
        filter.search(&["title", "keywords", "description"], keyword);
    }
    if let Some(category_id) = params.category_id {
        filter.eq("category_id", BindValue::BigInt(category_id));
    }
    if let Some(uploaded_by) = params.uploaded_by {
        filter.eq("uploaded_by", BindValue::BigInt(uploaded_by));
    }
    filter
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub struct KnowledgeCategoryRepo;

impl KnowledgeCategoryRepo {
    /// List categories by `sort_order`.
    pub async fn list(pool: &PgPool) -> Result<Vec<KnowledgeCategory>, sqlx::Error> {
        let query = format!(
            "SELECT {CATEGORY_COLUMNS} FROM kb_categories WHERE deleted_at IS NULL \
             ORDER BY sort_order ASC, id ASC"
        );
        sqlx::query_as::<_, KnowledgeCategory>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<KnowledgeCategory>, sqlx::Error> {
        let query = format!(
            "SELECT {CATEGORY_COLUMNS} FROM kb_categories WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, KnowledgeCategory>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &PgPool,
        input: &CreateKnowledgeCategory,
    ) -> Result<KnowledgeCategory, sqlx::Error> {
        let query = format!(
            "INSERT INTO kb_categories (name, parent_id, description, sort_order)
             VALUES ($1, $2, $3, $4)
             RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, KnowledgeCategory>(&query)
            .bind(&input.name)
            .bind(input.parent_id)
            .bind(&input.description)
            .bind(input.sort_order.unwrap_or(0))
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateKnowledgeCategory,
    ) -> Result<Option<KnowledgeCategory>, sqlx::Error> {
        let query = format!(
            "UPDATE kb_categories SET
                name = COALESCE($2, name),
                parent_id = COALESCE($3, parent_id),
                description = COALESCE($4, description),
                sort_order = COALESCE($5, sort_order),
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, KnowledgeCategory>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.parent_id)
            .bind(&input.description)
            .bind(input.sort_order)
            .fetch_optional(pool)
            .await
    }

    /// Number of live items filed under a category.
    pub async fn count_items(pool: &PgPool, id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM kb_items WHERE category_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Soft-delete a category. The caller checks [`Self::count_items`] first.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE kb_categories SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
