//! Handlers for the `/knowledge` resource: items, versions and categories.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use projectflow_core::audit::{
    ACTION_CREATE, ACTION_DELETE, ACTION_DOWNLOAD, ACTION_NEW_VERSION, ACTION_UPDATE,
    ACTION_UPLOAD, MODULE_KNOWLEDGE,
};
use projectflow_core::error::CoreError;
use projectflow_core::knowledge::{self, STATUS_PUBLISHED};
use projectflow_core::policy::{authorize, Action};
use projectflow_core::types::DbId;
use projectflow_core::validation::required;
use projectflow_db::models::knowledge::{
    CreateKnowledgeCategory, CreateKnowledgeItem, KnowledgeCategory, KnowledgeItem,
    KnowledgeQuery, KnowledgeVersion, NewKnowledgeVersion, UpdateKnowledgeCategory,
    UpdateKnowledgeItem,
};
use projectflow_db::repositories::{KnowledgeCategoryRepo, KnowledgeRepo};
use serde::Deserialize;

use crate::audit::{Audit, RequestMeta};
use crate::download;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PageParams;
use crate::response::{ApiResponse, PageResponse};
use crate::state::AppState;
use crate::storage::{mime_for, AREA_KNOWLEDGE};
use crate::upload::UploadForm;

/// Default and maximum number of hot items.
const DEFAULT_HOT_LIMIT: i64 = 10;
const MAX_HOT_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct HotParams {
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_item(state: &AppState, id: DbId) -> AppResult<KnowledgeItem> {
    KnowledgeRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Knowledge item", id))
}

async fn ensure_category(state: &AppState, category_id: DbId) -> AppResult<()> {
    if KnowledgeCategoryRepo::find_by_id(&state.pool, category_id)
        .await?
        .is_none()
    {
        return Err(AppError::Core(CoreError::validation(format!(
            "Category {category_id} does not exist"
        ))));
    }
    Ok(())
}

/// Download name: the title plus the stored file's extension.
fn download_name(title: &str, file_path: &str) -> String {
    match std::path::Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
    {
        Some(ext) if !title.ends_with(&format!(".{ext}")) => format!("{title}.{ext}"),
        _ => title.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// GET /api/v1/knowledge
///
/// Lists published items unless `status` is given.
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(page): Query<PageParams>,
    Query(params): Query<KnowledgeQuery>,
) -> AppResult<Json<PageResponse<KnowledgeItem>>> {
    if let Some(status) = params.status.as_deref() {
        knowledge::validate_status(status)?;
    }
    let page = page.request();
    let items = KnowledgeRepo::list(&state.pool, &params, &page).await?;
    let total = KnowledgeRepo::count(&state.pool, &params).await?;
    Ok(Json(PageResponse::new(items, total, &page)))
}

/// GET /api/v1/knowledge/hot
pub async fn hot(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<HotParams>,
) -> AppResult<Json<ApiResponse<Vec<KnowledgeItem>>>> {
    let limit = params.limit.unwrap_or(DEFAULT_HOT_LIMIT).clamp(1, MAX_HOT_LIMIT);
    let items = KnowledgeRepo::hot(&state.pool, limit).await?;
    Ok(Json(ApiResponse::ok(items)))
}

/// GET /api/v1/knowledge/{id}
///
/// Counts as a view.
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<KnowledgeItem>>> {
    let item = KnowledgeRepo::record_view(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Knowledge item", id))?;
    Ok(Json(ApiResponse::ok(item)))
}

/// GET /api/v1/knowledge/{id}/download
pub async fn download(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<Response> {
    let item = load_item(&state, id).await?;
    let response = download::attachment(
        &state.storage,
        &item.file_path,
        &download_name(&item.title, &item.file_path),
        item.mime_type.as_deref(),
    )
    .await?;
    KnowledgeRepo::record_download(&state.pool, id).await?;

    Audit::new(&meta, Some(user.user_id), ACTION_DOWNLOAD, MODULE_KNOWLEDGE)
        .target("knowledge", id, &item.title)
        .describe(format!("Downloaded {}", item.title))
        .record(&state.pool);

    Ok(response)
}

/// POST /api/v1/knowledge/upload
///
/// Multipart fields: `file` (required), `title`, `category_id` (required),
/// `keywords`, `description`, `status` (`published` by default).
pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<KnowledgeItem>>)> {
    authorize(&user.actor(), &Action::UploadKnowledge)?;

    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;
    let category_id = form.required_id("category_id")?;
    ensure_category(&state, category_id).await?;

    let status = form
        .text("status")
        .unwrap_or_else(|| STATUS_PUBLISHED.to_string());
    knowledge::validate_status(&status)?;

    let title = form.text("title").unwrap_or_else(|| file.file_name.clone());
    let mime_type = file
        .content_type
        .clone()
        .unwrap_or_else(|| mime_for(&file.file_name).to_string());

    let stored = state
        .storage
        .save(AREA_KNOWLEDGE, &file.file_name, &file.data)
        .await?;

    let input = CreateKnowledgeItem {
        title,
        category_id,
        keywords: form.text("keywords"),
        description: form.text("description"),
        file_path: stored.relative_path.clone(),
        file_size: stored.size,
        mime_type: Some(mime_type),
        status,
        uploaded_by: user.user_id,
    };
    let item = match KnowledgeRepo::create(&state.pool, &input).await {
        Ok(item) => item,
        Err(e) => {
            state.storage.remove(&stored.relative_path).await;
            return Err(e.into());
        }
    };

    Audit::new(&meta, Some(user.user_id), ACTION_UPLOAD, MODULE_KNOWLEDGE)
        .target("knowledge", item.id, &item.title)
        .describe(format!("Uploaded {}", item.title))
        .record(&state.pool);

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(item))))
}

/// PUT /api/v1/knowledge/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateKnowledgeItem>,
) -> AppResult<Json<ApiResponse<KnowledgeItem>>> {
    authorize(&user.actor(), &Action::EditKnowledge)?;

    input.title = input
        .title
        .as_deref()
        .map(|title| required("title", title))
        .transpose()?;
    if let Some(status) = input.status.as_deref() {
        knowledge::validate_status(status)?;
    }
    if let Some(category_id) = input.category_id {
        ensure_category(&state, category_id).await?;
    }

    let item = KnowledgeRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Knowledge item", id))?;

    Audit::new(&meta, Some(user.user_id), ACTION_UPDATE, MODULE_KNOWLEDGE)
        .target("knowledge", id, &item.title)
        .describe(format!("Updated {}", item.title))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(item)))
}

/// DELETE /api/v1/knowledge/{id}
///
/// Files are kept; version history still points at them.
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<()>>> {
    let item = load_item(&state, id).await?;
    authorize(
        &user.actor(),
        &Action::DeleteKnowledge {
            uploaded_by: item.uploaded_by,
        },
    )?;

    if !KnowledgeRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Knowledge item", id));
    }

    Audit::new(&meta, Some(user.user_id), ACTION_DELETE, MODULE_KNOWLEDGE)
        .target("knowledge", id, &item.title)
        .describe(format!("Deleted {}", item.title))
        .record(&state.pool);

    Ok(Json(ApiResponse::message("Knowledge item deleted")))
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// GET /api/v1/knowledge/{id}/versions
pub async fn list_versions(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Vec<KnowledgeVersion>>>> {
    load_item(&state, id).await?;
    let versions = KnowledgeRepo::list_versions(&state.pool, id).await?;
    Ok(Json(ApiResponse::ok(versions)))
}

/// POST /api/v1/knowledge/{id}/versions
///
/// Multipart fields: `file` (required), `change_note`. The current file is
/// archived as a version row and the item's version is bumped.
pub async fn new_version(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<KnowledgeItem>>> {
    authorize(&user.actor(), &Action::UploadKnowledge)?;
    load_item(&state, id).await?;

    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;
    let mime_type = file
        .content_type
        .clone()
        .unwrap_or_else(|| mime_for(&file.file_name).to_string());

    let stored = state
        .storage
        .save(AREA_KNOWLEDGE, &file.file_name, &file.data)
        .await?;

    let input = NewKnowledgeVersion {
        file_path: stored.relative_path.clone(),
        file_size: stored.size,
        mime_type: Some(mime_type),
        change_note: form.text("change_note"),
        uploaded_by: user.user_id,
    };
    let item = match KnowledgeRepo::new_version(&state.pool, id, &input).await {
        Ok(Some(item)) => item,
        Ok(None) => {
            state.storage.remove(&stored.relative_path).await;
            return Err(AppError::not_found("Knowledge item", id));
        }
        Err(e) => {
            state.storage.remove(&stored.relative_path).await;
            return Err(e.into());
        }
    };

    Audit::new(&meta, Some(user.user_id), ACTION_NEW_VERSION, MODULE_KNOWLEDGE)
        .target("knowledge", id, &item.title)
        .describe(format!("Uploaded version {} of {}", item.version, item.title))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(item)))
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// GET /api/v1/knowledge/categories
pub async fn list_categories(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<KnowledgeCategory>>>> {
    let categories = KnowledgeCategoryRepo::list(&state.pool).await?;
    Ok(Json(ApiResponse::ok(categories)))
}

/// POST /api/v1/knowledge/categories
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Json(mut input): Json<CreateKnowledgeCategory>,
) -> AppResult<(StatusCode, Json<ApiResponse<KnowledgeCategory>>)> {
    authorize(&user.actor(), &Action::ManageKnowledgeCategories)?;
    input.name = required("name", &input.name)?;
    if let Some(parent_id) = input.parent_id {
        ensure_category(&state, parent_id).await?;
    }

    let category = KnowledgeCategoryRepo::create(&state.pool, &input).await?;

    Audit::new(&meta, Some(user.user_id), ACTION_CREATE, MODULE_KNOWLEDGE)
        .target("kb_category", category.id, &category.name)
        .describe(format!("Created category {}", category.name))
        .record(&state.pool);

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(category))))
}

/// PUT /api/v1/knowledge/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateKnowledgeCategory>,
) -> AppResult<Json<ApiResponse<KnowledgeCategory>>> {
    authorize(&user.actor(), &Action::ManageKnowledgeCategories)?;
    input.name = input
        .name
        .as_deref()
        .map(|name| required("name", name))
        .transpose()?;
    if let Some(parent_id) = input.parent_id {
        if parent_id == id {
            return Err(AppError::Core(CoreError::validation(
                "A category cannot be its own parent",
            )));
        }
        ensure_category(&state, parent_id).await?;
    }

    let category = KnowledgeCategoryRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Category", id))?;

    Audit::new(&meta, Some(user.user_id), ACTION_UPDATE, MODULE_KNOWLEDGE)
        .target("kb_category", id, &category.name)
        .describe(format!("Updated category {}", category.name))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(category)))
}

/// DELETE /api/v1/knowledge/categories/{id}
///
/// Rejected while any item still uses the category.
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<()>>> {
    authorize(&user.actor(), &Action::ManageKnowledgeCategories)?;
    let category = KnowledgeCategoryRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Category", id))?;

    let items = KnowledgeCategoryRepo::count_items(&state.pool, id).await?;
    if items > 0 {
        return Err(AppError::Core(CoreError::validation(format!(
            "Category is used by {items} item(s) and cannot be deleted"
        ))));
    }

    if !KnowledgeCategoryRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Category", id));
    }

    Audit::new(&meta, Some(user.user_id), ACTION_DELETE, MODULE_KNOWLEDGE)
        .target("kb_category", id, &category.name)
        .describe(format!("Deleted category {}", category.name))
        .record(&state.pool);

    Ok(Json(ApiResponse::message("Category deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_name_appends_extension_once() {
        assert_eq!(download_name("Template", "knowledge/202401/a.docx"), "Template.docx");
        assert_eq!(download_name("Template.docx", "knowledge/202401/a.docx"), "Template.docx");
    }
}
