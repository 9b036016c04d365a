//! Handlers for the `/documents` resource.
//!
//! Deliverables attached to a task follow the task's state: the assignee
//! owns them while the task is open, the project manager once it is
//! completed. See `projectflow_core::policy`.

use std::path::Path as FsPath;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use projectflow_core::audit::{
    ACTION_ARCHIVE, ACTION_DELETE, ACTION_DOWNLOAD, ACTION_UPDATE, ACTION_UPLOAD, MODULE_DOCUMENT,
};
use projectflow_core::error::CoreError;
use projectflow_core::lifecycle::STATUS_COMPLETED;
use projectflow_core::policy::{authorize, Action, TaskGate};
use projectflow_core::types::DbId;
use projectflow_core::validation::required;
use projectflow_db::models::document::{
    CreateDocument, Document, DocumentQuery, UpdateDocument, STATUS_ARCHIVED,
};
use projectflow_db::models::project::Project;
use projectflow_db::repositories::{DocumentRepo, MemberRepo, PhaseRepo, ProjectRepo, TaskRepo};

use crate::audit::{Audit, RequestMeta};
use crate::download;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PageParams;
use crate::response::{ApiResponse, PageResponse};
use crate::state::AppState;
use crate::storage::{mime_for, AREA_DOCUMENTS};
use crate::upload::UploadForm;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_document(state: &AppState, id: DbId) -> AppResult<Document> {
    DocumentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Document", id))
}

async fn load_project(state: &AppState, id: DbId) -> AppResult<Project> {
    ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Project", id))
}

/// Completion gate of the task a document is (or will be) attached to.
async fn task_gate(
    state: &AppState,
    project_id: DbId,
    task_id: Option<DbId>,
) -> AppResult<Option<TaskGate>> {
    let Some(task_id) = task_id else {
        return Ok(None);
    };
    let task = TaskRepo::find_by_id(&state.pool, task_id)
        .await?
        .ok_or_else(|| AppError::not_found("Task", task_id))?;
    if task.project_id != project_id {
        return Err(AppError::Core(CoreError::validation(format!(
            "Task {task_id} does not belong to project {project_id}"
        ))));
    }
    Ok(Some(TaskGate {
        assignee_id: task.assignee_id,
        completed: task.status == STATUS_COMPLETED,
    }))
}

/// Download name: the document name, borrowing the stored file's extension
/// when the name has none.
fn download_name(doc_name: &str, file_path: &str) -> String {
    if FsPath::new(doc_name).extension().is_some() {
        return doc_name.to_string();
    }
    match FsPath::new(file_path).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{doc_name}.{ext}"),
        None => doc_name.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/documents
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(page): Query<PageParams>,
    Query(params): Query<DocumentQuery>,
) -> AppResult<Json<PageResponse<Document>>> {
    let page = page.request();
    let documents = DocumentRepo::list(&state.pool, &params, &page).await?;
    let total = DocumentRepo::count(&state.pool, &params).await?;
    Ok(Json(PageResponse::new(documents, total, &page)))
}

/// GET /api/v1/documents/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Document>>> {
    let document = load_document(&state, id).await?;
    Ok(Json(ApiResponse::ok(document)))
}

/// POST /api/v1/documents/upload
///
/// Multipart fields: `file` (required), `project_id` (required), `phase_id`,
/// `task_id`, `doc_name`, `doc_type`, `remark`.
pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<Document>>)> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;
    let project_id = form.required_id("project_id")?;
    let phase_id = form.id("phase_id")?;
    let task_id = form.id("task_id")?;

    let project = load_project(&state, project_id).await?;
    let task = task_gate(&state, project_id, task_id).await?;
    let is_member = MemberRepo::is_member(&state.pool, project_id, user.user_id).await?;
    authorize(
        &user.actor(),
        &Action::UploadDocument {
            manager_id: project.manager_id,
            created_by: project.created_by,
            is_member,
            task,
        },
    )?;

    if let Some(phase_id) = phase_id {
        if PhaseRepo::find(&state.pool, project_id, phase_id).await?.is_none() {
            return Err(AppError::Core(CoreError::validation(format!(
                "Phase {phase_id} does not belong to project {project_id}"
            ))));
        }
    }

    let doc_name = form.text("doc_name").unwrap_or_else(|| file.file_name.clone());
    let mime_type = file
        .content_type
        .clone()
        .unwrap_or_else(|| mime_for(&file.file_name).to_string());

    let stored = state
        .storage
        .save(AREA_DOCUMENTS, &file.file_name, &file.data)
        .await?;

    let input = CreateDocument {
        project_id,
        phase_id,
        task_id,
        doc_name,
        doc_type: form.text("doc_type"),
        file_path: stored.relative_path.clone(),
        file_size: stored.size,
        mime_type: Some(mime_type),
        uploaded_by: user.user_id,
        remark: form.text("remark"),
    };
    let document = match DocumentRepo::create(&state.pool, &input).await {
        Ok(doc) => doc,
        Err(e) => {
            state.storage.remove(&stored.relative_path).await;
            return Err(e.into());
        }
    };

    Audit::new(&meta, Some(user.user_id), ACTION_UPLOAD, MODULE_DOCUMENT)
        .target("document", document.id, &document.doc_name)
        .describe(format!("Uploaded document {}", document.doc_name))
        .record(&state.pool);

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(document))))
}

/// GET /api/v1/documents/{id}/download
pub async fn download(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<Response> {
    let document = load_document(&state, id).await?;
    let response = download::attachment(
        &state.storage,
        &document.file_path,
        &download_name(&document.doc_name, &document.file_path),
        document.mime_type.as_deref(),
    )
    .await?;

    Audit::new(&meta, Some(user.user_id), ACTION_DOWNLOAD, MODULE_DOCUMENT)
        .target("document", id, &document.doc_name)
        .describe(format!("Downloaded document {}", document.doc_name))
        .record(&state.pool);

    Ok(response)
}

/// PUT /api/v1/documents/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateDocument>,
) -> AppResult<Json<ApiResponse<Document>>> {
    let existing = load_document(&state, id).await?;
    let project = load_project(&state, existing.project_id).await?;
    authorize(
        &user.actor(),
        &Action::EditDocument {
            manager_id: project.manager_id,
            uploaded_by: existing.uploaded_by,
        },
    )?;

    input.doc_name = input
        .doc_name
        .as_deref()
        .map(|name| required("doc_name", name))
        .transpose()?;
    if let Some(phase_id) = input.phase_id {
        if PhaseRepo::find(&state.pool, project.id, phase_id).await?.is_none() {
            return Err(AppError::Core(CoreError::validation(format!(
                "Phase {phase_id} does not belong to project {}",
                project.id
            ))));
        }
    }

    let updated = DocumentRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Document", id))?;

    Audit::new(&meta, Some(user.user_id), ACTION_UPDATE, MODULE_DOCUMENT)
        .target("document", id, &updated.doc_name)
        .describe(format!("Updated document {}", updated.doc_name))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(updated)))
}

/// DELETE /api/v1/documents/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<()>>> {
    let existing = load_document(&state, id).await?;
    let project = load_project(&state, existing.project_id).await?;
    let task = task_gate(&state, existing.project_id, existing.task_id).await?;
    authorize(
        &user.actor(),
        &Action::DeleteDocument {
            manager_id: project.manager_id,
            uploaded_by: existing.uploaded_by,
            task,
        },
    )?;

    if !DocumentRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Document", id));
    }
    state.storage.remove(&existing.file_path).await;

    Audit::new(&meta, Some(user.user_id), ACTION_DELETE, MODULE_DOCUMENT)
        .target("document", id, &existing.doc_name)
        .describe(format!("Deleted document {}", existing.doc_name))
        .record(&state.pool);

    Ok(Json(ApiResponse::message("Document deleted")))
}

/// POST /api/v1/documents/{id}/archive
pub async fn archive(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Document>>> {
    authorize(&user.actor(), &Action::ArchiveDocument)?;

    let archived = DocumentRepo::set_status(&state.pool, id, STATUS_ARCHIVED)
        .await?
        .ok_or_else(|| AppError::not_found("Document", id))?;

    Audit::new(&meta, Some(user.user_id), ACTION_ARCHIVE, MODULE_DOCUMENT)
        .target("document", id, &archived.doc_name)
        .describe(format!("Archived document {}", archived.doc_name))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(archived)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_name_borrows_stored_extension() {
        assert_eq!(download_name("Plan", "documents/202401/x.pdf"), "Plan.pdf");
        assert_eq!(download_name("Plan.docx", "documents/202401/x.pdf"), "Plan.docx");
        assert_eq!(download_name("Plan", "documents/202401/x"), "Plan");
    }
}
