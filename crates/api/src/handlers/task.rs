//! Handlers for the `/tasks` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use projectflow_core::audit::{
    ACTION_CREATE, ACTION_DELETE, ACTION_REVIEW, ACTION_UPDATE, ACTION_UPDATE_STATUS, MODULE_TASK,
};
use projectflow_core::error::CoreError;
use projectflow_core::policy::{authorize, Action};
use projectflow_core::task::{self, ReviewDecision, TaskStatus};
use projectflow_core::types::DbId;
use projectflow_core::validation::required;
use projectflow_db::models::project::{GroupCount, Project};
use projectflow_db::models::task::{CreateTask, Task, TaskQuery, UpdateTask};
use projectflow_db::repositories::{PhaseRepo, ProjectRepo, TaskRepo, UserRepo};
use serde::Deserialize;

use crate::audit::{Audit, RequestMeta};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PageParams;
use crate::response::{ApiResponse, PageResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct BatchCreateRequest {
    pub tasks: Vec<CreateTask>,
}

#[derive(Debug, Deserialize)]
pub struct MyTaskParams {
    /// Comma-separated statuses, e.g. `not_started,in_progress`.
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// `approved` or `rejected`.
    pub decision: String,
    pub comment: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_task(state: &AppState, id: DbId) -> AppResult<Task> {
    TaskRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Task", id))
}

/// Load the owning project and check the caller may manage its tasks.
async fn authorize_task_management(
    state: &AppState,
    user: &AuthUser,
    project_id: DbId,
) -> AppResult<Project> {
    let project = ProjectRepo::find_by_id(&state.pool, project_id)
        .await?
        .ok_or_else(|| AppError::not_found("Project", project_id))?;
    authorize(
        &user.actor(),
        &Action::ManageTasks {
            manager_id: project.manager_id,
        },
    )?;
    Ok(project)
}

/// Check references of a new or edited task; returns the resolved priority.
async fn check_task_refs(
    state: &AppState,
    project_id: DbId,
    phase_id: Option<DbId>,
    assignee_id: Option<DbId>,
    priority: Option<i32>,
) -> AppResult<i32> {
    let priority = task::resolve_priority(priority)?;

    if let Some(phase_id) = phase_id {
        if PhaseRepo::find(&state.pool, project_id, phase_id).await?.is_none() {
            return Err(AppError::Core(CoreError::validation(format!(
                "Phase {phase_id} does not belong to project {project_id}"
            ))));
        }
    }
    if let Some(assignee_id) = assignee_id {
        if UserRepo::find_by_id(&state.pool, assignee_id).await?.is_none() {
            return Err(AppError::Core(CoreError::validation(format!(
                "Assignee {assignee_id} does not exist"
            ))));
        }
    }
    Ok(priority)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Json(mut input): Json<CreateTask>,
) -> AppResult<(StatusCode, Json<ApiResponse<Task>>)> {
    authorize_task_management(&state, &user, input.project_id).await?;
    input.task_name = required("task_name", &input.task_name)?;
    let priority = check_task_refs(
        &state,
        input.project_id,
        input.phase_id,
        input.assignee_id,
        input.priority,
    )
    .await?;

    let created = TaskRepo::create(&state.pool, &input, priority, user.user_id).await?;

    Audit::new(&meta, Some(user.user_id), ACTION_CREATE, MODULE_TASK)
        .target("task", created.id, &created.task_name)
        .describe(format!("Created task {}", created.task_name))
        .record(&state.pool);

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

/// POST /api/v1/tasks/batch
///
/// All tasks must belong to one project; they are inserted together or not
/// at all.
pub async fn batch_create(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Json(input): Json<BatchCreateRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Vec<Task>>>)> {
    let Some(first) = input.tasks.first() else {
        return Err(AppError::BadRequest("tasks must not be empty".into()));
    };
    let project_id = first.project_id;
    if input.tasks.iter().any(|t| t.project_id != project_id) {
        return Err(AppError::Core(CoreError::validation(
            "All tasks in a batch must belong to the same project",
        )));
    }
    let project = authorize_task_management(&state, &user, project_id).await?;

    let mut resolved = Vec::with_capacity(input.tasks.len());
    for mut item in input.tasks {
        item.task_name = required("task_name", &item.task_name)?;
        let priority = check_task_refs(
            &state,
            project_id,
            item.phase_id,
            item.assignee_id,
            item.priority,
        )
        .await?;
        resolved.push((item, priority));
    }

    let created = TaskRepo::batch_create(&state.pool, &resolved, user.user_id).await?;

    Audit::new(&meta, Some(user.user_id), ACTION_CREATE, MODULE_TASK)
        .target("project", project_id, &project.name)
        .describe(format!("Created {} tasks", created.len()))
        .record(&state.pool);

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

/// GET /api/v1/tasks
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(page): Query<PageParams>,
    Query(params): Query<TaskQuery>,
) -> AppResult<Json<PageResponse<Task>>> {
    if let Some(status) = params.status.as_deref() {
        status.parse::<TaskStatus>()?;
    }
    let page = page.request();
    let tasks = TaskRepo::list(&state.pool, &params, &page).await?;
    let total = TaskRepo::count(&state.pool, &params).await?;
    Ok(Json(PageResponse::new(tasks, total, &page)))
}

/// GET /api/v1/tasks/my
///
/// Tasks assigned to the caller, soonest deadline first.
pub async fn my_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<PageParams>,
    Query(params): Query<MyTaskParams>,
) -> AppResult<Json<PageResponse<Task>>> {
    let statuses = match params.status.as_deref() {
        Some(raw) => task::parse_status_filter(raw)?,
        None => Vec::new(),
    };
    let page = page.request();
    let (tasks, total) = TaskRepo::my_tasks(&state.pool, user.user_id, &statuses, &page).await?;
    Ok(Json(PageResponse::new(tasks, total, &page)))
}

/// GET /api/v1/tasks/statistics
pub async fn statistics(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<GroupCount>>>> {
    let counts = TaskRepo::status_counts(&state.pool).await?;
    Ok(Json(ApiResponse::ok(counts)))
}

/// GET /api/v1/tasks/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Task>>> {
    let task = load_task(&state, id).await?;
    Ok(Json(ApiResponse::ok(task)))
}

/// PUT /api/v1/tasks/{id}
///
/// Edits descriptive fields only; status goes through `PUT /tasks/{id}/status`.
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateTask>,
) -> AppResult<Json<ApiResponse<Task>>> {
    let existing = load_task(&state, id).await?;
    authorize_task_management(&state, &user, existing.project_id).await?;

    input.task_name = input
        .task_name
        .as_deref()
        .map(|name| required("task_name", name))
        .transpose()?;
    if input.priority.is_some() || input.phase_id.is_some() || input.assignee_id.is_some() {
        let priority = check_task_refs(
            &state,
            existing.project_id,
            input.phase_id,
            input.assignee_id,
            input.priority,
        )
        .await?;
        input.priority = input.priority.map(|_| priority);
    }

    let updated = TaskRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Task", id))?;

    Audit::new(&meta, Some(user.user_id), ACTION_UPDATE, MODULE_TASK)
        .target("task", id, &updated.task_name)
        .describe(format!("Updated task {}", updated.task_name))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(updated)))
}

/// DELETE /api/v1/tasks/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<()>>> {
    let existing = load_task(&state, id).await?;
    authorize_task_management(&state, &user, existing.project_id).await?;

    if !TaskRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Task", id));
    }

    Audit::new(&meta, Some(user.user_id), ACTION_DELETE, MODULE_TASK)
        .target("task", id, &existing.task_name)
        .describe(format!("Deleted task {}", existing.task_name))
        .record(&state.pool);

    Ok(Json(ApiResponse::message("Task deleted")))
}

/// PUT /api/v1/tasks/{id}/status
///
/// Only the assignee may move the task; there is no admin override.
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<Task>>> {
    let status: TaskStatus = input.status.trim().parse()?;
    let existing = load_task(&state, id).await?;
    authorize(
        &user.actor(),
        &Action::ChangeTaskStatus {
            assignee_id: existing.assignee_id,
        },
    )?;

    let updated = TaskRepo::update_status(&state.pool, id, status)
        .await?
        .ok_or_else(|| AppError::not_found("Task", id))?;

    Audit::new(&meta, Some(user.user_id), ACTION_UPDATE_STATUS, MODULE_TASK)
        .target("task", id, &updated.task_name)
        .describe(format!(
            "Status {} -> {}",
            existing.status,
            status.as_str()
        ))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(updated)))
}

/// POST /api/v1/tasks/{id}/review
pub async fn review(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    Json(input): Json<ReviewRequest>,
) -> AppResult<Json<ApiResponse<Task>>> {
    authorize(&user.actor(), &Action::ReviewTask)?;
    let decision: ReviewDecision = input.decision.trim().parse()?;
    load_task(&state, id).await?;

    let reviewed = TaskRepo::review(
        &state.pool,
        id,
        decision,
        input.comment.as_deref(),
        user.user_id,
    )
    .await?
    .ok_or_else(|| AppError::not_found("Task", id))?;

    Audit::new(&meta, Some(user.user_id), ACTION_REVIEW, MODULE_TASK)
        .target("task", id, &reviewed.task_name)
        .describe(format!("Review: {}", decision.as_str()))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(reviewed)))
}
