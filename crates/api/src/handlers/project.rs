//! Handlers for the `/projects` resource, including nested phases and members.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use projectflow_core::audit::{
    ACTION_ADD_MEMBER, ACTION_CREATE, ACTION_DELETE, ACTION_REMOVE_MEMBER, ACTION_UPDATE,
    ACTION_UPDATE_PHASE, MODULE_PROJECT,
};
use projectflow_core::error::CoreError;
use projectflow_core::lifecycle::ProjectType;
use projectflow_core::numbering;
use projectflow_core::policy::{authorize, Action};
use projectflow_core::types::DbId;
use projectflow_core::validation::{parse_optional_date, required};
use projectflow_db::models::project::{
    CreateProject, GroupCount, PhaseChangeOutcome, Project, ProjectMember, ProjectPhase,
    ProjectQuery, UpdateProject,
};
use projectflow_db::repositories::{MemberRepo, PhaseRepo, ProjectRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::audit::{Audit, RequestMeta};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PageParams;
use crate::response::{ApiResponse, PageResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /projects`.
///
/// Dates are `YYYY-MM-DD` strings; the project type accepts its code or
/// display label.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub project_no: Option<String>,
    pub name: String,
    pub project_type: String,
    /// Defaults to the caller.
    pub manager_id: Option<DbId>,
    pub contract_no: Option<String>,
    pub budget_code: Option<String>,
    pub innovation_code: Option<String>,
    pub initiation_date: Option<String>,
    pub closing_date: Option<String>,
    pub labor_cost: Option<f64>,
    pub direct_cost: Option<f64>,
    pub outsourcing_cost: Option<f64>,
    pub other_cost: Option<f64>,
}

/// A project with its phases in order.
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub phases: Vec<ProjectPhase>,
}

#[derive(Debug, Serialize)]
pub struct ProjectStatistics {
    pub total: i64,
    pub by_status: Vec<GroupCount>,
    pub by_phase: Vec<GroupCount>,
}

#[derive(Debug, Deserialize)]
pub struct AddPhaseRequest {
    pub phase_name: String,
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePhaseStatusRequest {
    pub status: String,
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: DbId,
    /// Defaults to `member`.
    pub role_type: Option<String>,
}

const DEFAULT_MEMBER_ROLE_TYPE: &str = "member";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_project(state: &AppState, id: DbId) -> AppResult<Project> {
    ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Project", id))
}

/// Load a project and check the caller may manage it.
async fn managed_project(state: &AppState, user: &AuthUser, id: DbId) -> AppResult<Project> {
    let project = load_project(state, id).await?;
    authorize(
        &user.actor(),
        &Action::ManageProject {
            manager_id: project.manager_id,
        },
    )?;
    Ok(project)
}

async fn ensure_user_exists(state: &AppState, user_id: DbId, what: &str) -> AppResult<()> {
    if UserRepo::find_by_id(&state.pool, user_id).await?.is_none() {
        return Err(AppError::Core(CoreError::validation(format!(
            "{what} {user_id} does not exist"
        ))));
    }
    Ok(())
}

fn non_negative(field: &str, value: Option<f64>) -> Result<f64, CoreError> {
    let value = value.unwrap_or(0.0);
    if !value.is_finite() || value < 0.0 {
        return Err(CoreError::validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// POST /api/v1/projects
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Json(input): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProjectDetail>>)> {
    authorize(&user.actor(), &Action::CreateProject)?;

    let name = required("name", &input.name)?;
    let project_type: ProjectType = input.project_type.parse()?;
    let manager_id = input.manager_id.unwrap_or(user.user_id);
    if manager_id != user.user_id {
        ensure_user_exists(&state, manager_id, "Manager").await?;
    }

    let project_no = match input.project_no.as_deref().map(str::trim) {
        Some(no) if !no.is_empty() => {
            if ProjectRepo::find_by_no(&state.pool, no).await?.is_some() {
                return Err(AppError::Core(CoreError::validation(format!(
                    "Project number '{no}' already exists"
                ))));
            }
            no.to_string()
        }
        _ => numbering::project_no(Utc::now()),
    };

    let create = CreateProject {
        project_no,
        name,
        project_type: project_type.as_str().to_string(),
        manager_id,
        created_by: user.user_id,
        contract_no: input.contract_no,
        budget_code: input.budget_code,
        innovation_code: input.innovation_code,
        initiation_date: parse_optional_date(input.initiation_date.as_deref())?,
        closing_date: parse_optional_date(input.closing_date.as_deref())?,
        labor_cost: non_negative("labor_cost", input.labor_cost)?,
        direct_cost: non_negative("direct_cost", input.direct_cost)?,
        outsourcing_cost: non_negative("outsourcing_cost", input.outsourcing_cost)?,
        other_cost: non_negative("other_cost", input.other_cost)?,
    };

    let project = ProjectRepo::create_with_phases(&state.pool, &create).await?;
    let phases = PhaseRepo::list_for_project(&state.pool, project.id).await?;

    tracing::info!(project_id = project.id, project_no = %project.project_no, "Project created");
    Audit::new(&meta, Some(user.user_id), ACTION_CREATE, MODULE_PROJECT)
        .target("project", project.id, &project.name)
        .describe(format!("Created project {}", project.name))
        .record(&state.pool);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ProjectDetail { project, phases })),
    ))
}

/// GET /api/v1/projects
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(page): Query<PageParams>,
    Query(params): Query<ProjectQuery>,
) -> AppResult<Json<PageResponse<Project>>> {
    let page = page.request();
    let projects = ProjectRepo::list(&state.pool, &params, &page).await?;
    let total = ProjectRepo::count(&state.pool, &params).await?;
    Ok(Json(PageResponse::new(projects, total, &page)))
}

/// GET /api/v1/projects/statistics
pub async fn statistics(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<ProjectStatistics>>> {
    let by_status = ProjectRepo::status_counts(&state.pool).await?;
    let by_phase = ProjectRepo::phase_counts(&state.pool).await?;
    let total = by_status.iter().map(|c| c.count).sum();
    Ok(Json(ApiResponse::ok(ProjectStatistics {
        total,
        by_status,
        by_phase,
    })))
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<ProjectDetail>>> {
    let project = load_project(&state, id).await?;
    let phases = PhaseRepo::list_for_project(&state.pool, id).await?;
    Ok(Json(ApiResponse::ok(ProjectDetail { project, phases })))
}

/// PUT /api/v1/projects/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateProject>,
) -> AppResult<Json<ApiResponse<Project>>> {
    managed_project(&state, &user, id).await?;

    input.project_type = input
        .project_type
        .as_deref()
        .map(|raw| raw.parse::<ProjectType>().map(|t| t.as_str().to_string()))
        .transpose()?;
    input.name = input
        .name
        .as_deref()
        .map(|name| required("name", name))
        .transpose()?;
    if let Some(manager_id) = input.manager_id {
        ensure_user_exists(&state, manager_id, "Manager").await?;
    }
    for (field, value) in [
        ("labor_cost", input.labor_cost),
        ("direct_cost", input.direct_cost),
        ("outsourcing_cost", input.outsourcing_cost),
        ("other_cost", input.other_cost),
    ] {
        if value.is_some() {
            non_negative(field, value)?;
        }
    }

    let project = ProjectRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Project", id))?;

    Audit::new(&meta, Some(user.user_id), ACTION_UPDATE, MODULE_PROJECT)
        .target("project", project.id, &project.name)
        .describe(format!("Updated project {}", project.name))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(project)))
}

/// DELETE /api/v1/projects/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<()>>> {
    let project = managed_project(&state, &user, id).await?;

    if !ProjectRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Project", id));
    }

    Audit::new(&meta, Some(user.user_id), ACTION_DELETE, MODULE_PROJECT)
        .target("project", id, &project.name)
        .describe(format!("Deleted project {}", project.name))
        .record(&state.pool);

    Ok(Json(ApiResponse::message("Project deleted")))
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// GET /api/v1/projects/{id}/phases
pub async fn list_phases(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Vec<ProjectPhase>>>> {
    load_project(&state, id).await?;
    let phases = PhaseRepo::list_for_project(&state.pool, id).await?;
    Ok(Json(ApiResponse::ok(phases)))
}

/// POST /api/v1/projects/{id}/phases
///
/// Appends a custom phase between `contract` and `acceptance`.
pub async fn add_phase(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    Json(input): Json<AddPhaseRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProjectPhase>>)> {
    let project = managed_project(&state, &user, id).await?;
    let phase_name = required("phase_name", &input.phase_name)?;

    let phase = PhaseRepo::add_custom(&state.pool, id, &phase_name, input.remark.as_deref()).await?;

    Audit::new(&meta, Some(user.user_id), ACTION_CREATE, MODULE_PROJECT)
        .target("project", id, &project.name)
        .describe(format!(
            "Added phase {} (order {})",
            phase.phase_name, phase.phase_order
        ))
        .record(&state.pool);

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(phase))))
}

/// PUT /api/v1/projects/{id}/phases/{phase_id}
///
/// Completing a phase activates its successor, or completes the project when
/// it was the last one.
pub async fn update_phase_status(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path((id, phase_id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdatePhaseStatusRequest>,
) -> AppResult<Json<ApiResponse<PhaseChangeOutcome>>> {
    let project = managed_project(&state, &user, id).await?;

    let outcome = PhaseRepo::apply_status_change(
        &state.pool,
        id,
        phase_id,
        &input.status,
        input.remark.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::not_found("Phase", phase_id))?;

    tracing::info!(
        project_id = id,
        phase_id,
        status = %outcome.phase.status,
        project_status = %outcome.project.status,
        "Phase status changed"
    );
    Audit::new(&meta, Some(user.user_id), ACTION_UPDATE_PHASE, MODULE_PROJECT)
        .target("project", id, &project.name)
        .describe(format!(
            "Phase {} set to {}",
            outcome.phase.phase_name, outcome.phase.status
        ))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(outcome)))
}

/// DELETE /api/v1/projects/{id}/phases/{phase_id}
pub async fn delete_phase(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path((id, phase_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<ApiResponse<()>>> {
    let project = managed_project(&state, &user, id).await?;

    if !PhaseRepo::delete(&state.pool, id, phase_id).await? {
        return Err(AppError::not_found("Phase", phase_id));
    }

    Audit::new(&meta, Some(user.user_id), ACTION_DELETE, MODULE_PROJECT)
        .target("project", id, &project.name)
        .describe(format!("Deleted phase {phase_id}"))
        .record(&state.pool);

    Ok(Json(ApiResponse::message("Phase deleted")))
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

/// GET /api/v1/projects/{id}/members
pub async fn list_members(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Vec<ProjectMember>>>> {
    load_project(&state, id).await?;
    let members = MemberRepo::list(&state.pool, id).await?;
    Ok(Json(ApiResponse::ok(members)))
}

/// POST /api/v1/projects/{id}/members
pub async fn add_member(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    Json(input): Json<AddMemberRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProjectMember>>)> {
    let project = managed_project(&state, &user, id).await?;
    ensure_user_exists(&state, input.user_id, "User").await?;

    if MemberRepo::is_member(&state.pool, id, input.user_id).await? {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "User {} is already a member of this project",
            input.user_id
        ))));
    }

    let role_type = input
        .role_type
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_MEMBER_ROLE_TYPE);
    let member = MemberRepo::add(&state.pool, id, input.user_id, role_type).await?;

    Audit::new(&meta, Some(user.user_id), ACTION_ADD_MEMBER, MODULE_PROJECT)
        .target("project", id, &project.name)
        .describe(format!("Added member {}", member.username))
        .record(&state.pool);

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(member))))
}

/// DELETE /api/v1/projects/{id}/members/{member_id}
pub async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path((id, member_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<ApiResponse<()>>> {
    let project = managed_project(&state, &user, id).await?;

    if !MemberRepo::remove(&state.pool, id, member_id).await? {
        return Err(AppError::not_found("Project member", member_id));
    }

    Audit::new(&meta, Some(user.user_id), ACTION_REMOVE_MEMBER, MODULE_PROJECT)
        .target("project", id, &project.name)
        .describe(format!("Removed member {member_id}"))
        .record(&state.pool);

    Ok(Json(ApiResponse::message("Member removed")))
}
