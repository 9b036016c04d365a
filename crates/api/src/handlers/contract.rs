//! Handlers for the `/contracts` resource.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use projectflow_core::audit::{
    ACTION_CREATE, ACTION_DELETE, ACTION_UPDATE, ACTION_UPLOAD, MODULE_CONTRACT,
};
use projectflow_core::error::CoreError;
use projectflow_core::numbering;
use projectflow_core::policy::{authorize, Action};
use projectflow_core::types::DbId;
use projectflow_core::validation::required;
use projectflow_db::models::contract::{Contract, ContractQuery, CreateContract, UpdateContract};
use projectflow_db::repositories::{ContractRepo, ProjectRepo};

use crate::audit::{Audit, RequestMeta};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PageParams;
use crate::response::{ApiResponse, PageResponse};
use crate::state::AppState;
use crate::storage::AREA_CONTRACTS;
use crate::upload::UploadForm;

async fn load_contract(state: &AppState, id: DbId) -> AppResult<Contract> {
    ContractRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Contract", id))
}

async fn check_refs(state: &AppState, project_id: Option<DbId>, amount: Option<f64>) -> AppResult<()> {
    if let Some(amount) = amount {
        if !amount.is_finite() || amount < 0.0 {
            return Err(AppError::Core(CoreError::validation(
                "Amount must be a non-negative number",
            )));
        }
    }
    if let Some(project_id) = project_id {
        if ProjectRepo::find_by_id(&state.pool, project_id).await?.is_none() {
            return Err(AppError::Core(CoreError::validation(format!(
                "Project {project_id} does not exist"
            ))));
        }
    }
    Ok(())
}

/// GET /api/v1/contracts
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(page): Query<PageParams>,
    Query(params): Query<ContractQuery>,
) -> AppResult<Json<PageResponse<Contract>>> {
    let page = page.request();
    let contracts = ContractRepo::list(&state.pool, &params, &page).await?;
    let total = ContractRepo::count(&state.pool, &params).await?;
    Ok(Json(PageResponse::new(contracts, total, &page)))
}

/// GET /api/v1/contracts/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Contract>>> {
    let contract = load_contract(&state, id).await?;
    Ok(Json(ApiResponse::ok(contract)))
}

/// POST /api/v1/contracts
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Json(mut input): Json<CreateContract>,
) -> AppResult<(StatusCode, Json<ApiResponse<Contract>>)> {
    authorize(&user.actor(), &Action::ManageContract)?;
    input.contract_name = required("contract_name", &input.contract_name)?;
    check_refs(&state, input.project_id, input.amount).await?;

    let contract_no = match input.contract_no.as_deref().map(str::trim) {
        Some(no) if !no.is_empty() => no.to_string(),
        _ => numbering::contract_no(Utc::now()),
    };

    let contract = ContractRepo::create(&state.pool, &contract_no, &input, user.user_id).await?;

    Audit::new(&meta, Some(user.user_id), ACTION_CREATE, MODULE_CONTRACT)
        .target("contract", contract.id, &contract.contract_name)
        .describe(format!("Created contract {}", contract.contract_name))
        .record(&state.pool);

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(contract))))
}

/// PUT /api/v1/contracts/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateContract>,
) -> AppResult<Json<ApiResponse<Contract>>> {
    authorize(&user.actor(), &Action::ManageContract)?;
    input.contract_name = input
        .contract_name
        .as_deref()
        .map(|name| required("contract_name", name))
        .transpose()?;
    check_refs(&state, input.project_id, input.amount).await?;

    let contract = ContractRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Contract", id))?;

    Audit::new(&meta, Some(user.user_id), ACTION_UPDATE, MODULE_CONTRACT)
        .target("contract", id, &contract.contract_name)
        .describe(format!("Updated contract {}", contract.contract_name))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(contract)))
}

/// POST /api/v1/contracts/{id}/upload
///
/// Replaces the contract's scanned file; the previous file is removed.
pub async fn upload_file(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Contract>>> {
    authorize(&user.actor(), &Action::ManageContract)?;
    let existing = load_contract(&state, id).await?;

    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;
    let stored = state
        .storage
        .save(AREA_CONTRACTS, &file.file_name, &file.data)
        .await?;

    let contract = match ContractRepo::set_file_path(&state.pool, id, &stored.relative_path).await {
        Ok(Some(contract)) => contract,
        Ok(None) => {
            state.storage.remove(&stored.relative_path).await;
            return Err(AppError::not_found("Contract", id));
        }
        Err(e) => {
            state.storage.remove(&stored.relative_path).await;
            return Err(e.into());
        }
    };
    if let Some(old) = existing.file_path.as_deref() {
        state.storage.remove(old).await;
    }

    Audit::new(&meta, Some(user.user_id), ACTION_UPLOAD, MODULE_CONTRACT)
        .target("contract", id, &contract.contract_name)
        .describe(format!("Uploaded file {}", file.file_name))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(contract)))
}

/// DELETE /api/v1/contracts/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<()>>> {
    authorize(&user.actor(), &Action::ManageContract)?;
    let existing = load_contract(&state, id).await?;

    if !ContractRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Contract", id));
    }
    if let Some(path) = existing.file_path.as_deref() {
        state.storage.remove(path).await;
    }

    Audit::new(&meta, Some(user.user_id), ACTION_DELETE, MODULE_CONTRACT)
        .target("contract", id, &existing.contract_name)
        .describe(format!("Deleted contract {}", existing.contract_name))
        .record(&state.pool);

    Ok(Json(ApiResponse::message("Contract deleted")))
}
