//! Handlers for the `/expenses` resource: manual entries, vouchers,
//! statistics, budget comparison and spreadsheet import.

use std::collections::HashMap;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use projectflow_core::audit::{
    ACTION_CREATE, ACTION_DELETE, ACTION_DOWNLOAD, ACTION_IMPORT, ACTION_UPDATE, ACTION_UPLOAD,
    MODULE_EXPENSE,
};
use projectflow_core::error::CoreError;
use projectflow_core::expense::{
    self, compare_budget, plan_import, BudgetComparison, Budgets, ExpenseType, RowError,
};
use projectflow_core::policy::{authorize, Action};
use projectflow_core::types::DbId;
use projectflow_db::models::expense::{Expense, ExpenseInput, ExpenseQuery, ImportedExpense};
use projectflow_db::repositories::{ExpenseRepo, ProjectRepo};
use serde::{Deserialize, Serialize};

use crate::audit::{Audit, RequestMeta};
use crate::download;
use crate::error::{AppError, AppResult};
use crate::import::read_first_sheet;
use crate::middleware::auth::AuthUser;
use crate::query::{IndexParams, PageParams};
use crate::response::{ApiResponse, PageResponse};
use crate::state::AppState;
use crate::storage::AREA_VOUCHERS;
use crate::upload::UploadForm;

#[derive(Debug, Deserialize)]
pub struct StatisticsParams {
    pub project_id: Option<DbId>,
}

/// Total spend of one expense type.
#[derive(Debug, Serialize)]
pub struct TypeStatistic {
    pub expense_type: &'static str,
    pub label: &'static str,
    pub total: f64,
}

#[derive(Debug, Serialize)]
pub struct ExpenseStatistics {
    pub project_id: Option<DbId>,
    pub by_type: Vec<TypeStatistic>,
    pub total: f64,
}

/// Outcome of a spreadsheet import.
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_expense(state: &AppState, id: DbId) -> AppResult<Expense> {
    ExpenseRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Expense", id))
}

/// Normalise the type to its code and check amount and project.
async fn check_input(state: &AppState, input: &mut ExpenseInput) -> AppResult<()> {
    let expense_type: ExpenseType = input.expense_type.parse()?;
    input.expense_type = expense_type.as_str().to_string();
    expense::validate_amount(input.amount)?;

    if let Some(project_id) = input.project_id {
        if ProjectRepo::find_by_id(&state.pool, project_id).await?.is_none() {
            return Err(AppError::Core(CoreError::validation(format!(
                "Project {project_id} does not exist"
            ))));
        }
    }
    input.document_no = input
        .document_no
        .as_deref()
        .map(str::trim)
        .filter(|no| !no.is_empty())
        .map(str::to_string);
    Ok(())
}

fn voucher_name(expense_id: DbId, index: usize, path: &str) -> String {
    match std::path::Path::new(path).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("voucher-{expense_id}-{}.{ext}", index + 1),
        None => format!("voucher-{expense_id}-{}", index + 1),
    }
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/expenses
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(page): Query<PageParams>,
    Query(mut params): Query<ExpenseQuery>,
) -> AppResult<Json<PageResponse<Expense>>> {
    if let Some(raw) = params.expense_type.as_deref() {
        let expense_type: ExpenseType = raw.parse()?;
        params.expense_type = Some(expense_type.as_str().to_string());
    }
    let page = page.request();
    let expenses = ExpenseRepo::list(&state.pool, &params, &page).await?;
    let total = ExpenseRepo::count(&state.pool, &params).await?;
    Ok(Json(PageResponse::new(expenses, total, &page)))
}

/// GET /api/v1/expenses/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Expense>>> {
    let expense = load_expense(&state, id).await?;
    Ok(Json(ApiResponse::ok(expense)))
}

/// POST /api/v1/expenses
///
/// The caller becomes the reimburser.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Json(mut input): Json<ExpenseInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Expense>>)> {
    check_input(&state, &mut input).await?;
    let expense = ExpenseRepo::create(&state.pool, &input, user.user_id).await?;

    Audit::new(&meta, Some(user.user_id), ACTION_CREATE, MODULE_EXPENSE)
        .target("expense", expense.id, &expense.expense_type)
        .describe(format!(
            "Created {} expense of {:.2}",
            expense.expense_type, expense.amount
        ))
        .record(&state.pool);

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(expense))))
}

/// PUT /api/v1/expenses/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    Json(mut input): Json<ExpenseInput>,
) -> AppResult<Json<ApiResponse<Expense>>> {
    let existing = load_expense(&state, id).await?;
    authorize(
        &user.actor(),
        &Action::ModifyExpense {
            reimbursed_by: existing.reimbursed_by,
        },
    )?;
    check_input(&state, &mut input).await?;

    let expense = ExpenseRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Expense", id))?;

    Audit::new(&meta, Some(user.user_id), ACTION_UPDATE, MODULE_EXPENSE)
        .target("expense", id, &expense.expense_type)
        .describe(format!("Updated expense {id}"))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(expense)))
}

/// DELETE /api/v1/expenses/{id}
///
/// Voucher files are removed best-effort after the row is gone.
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<()>>> {
    let expense = load_expense(&state, id).await?;
    authorize(
        &user.actor(),
        &Action::ModifyExpense {
            reimbursed_by: expense.reimbursed_by,
        },
    )?;

    if !ExpenseRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Expense", id));
    }
    for path in &expense.voucher_paths {
        state.storage.remove(path).await;
    }

    Audit::new(&meta, Some(user.user_id), ACTION_DELETE, MODULE_EXPENSE)
        .target("expense", id, &expense.expense_type)
        .describe(format!("Deleted expense {id}"))
        .record(&state.pool);

    Ok(Json(ApiResponse::message("Expense deleted")))
}

// ---------------------------------------------------------------------------
// Vouchers
// ---------------------------------------------------------------------------

/// POST /api/v1/expenses/{id}/vouchers
///
/// Every file part is stored and appended to the voucher list.
pub async fn upload_vouchers(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Expense>>> {
    let expense = load_expense(&state, id).await?;
    authorize(
        &user.actor(),
        &Action::ModifyExpense {
            reimbursed_by: expense.reimbursed_by,
        },
    )?;

    let form = UploadForm::read(multipart).await?;
    let files: Vec<_> = form.files.iter().filter(|f| !f.data.is_empty()).collect();
    if files.is_empty() {
        return Err(AppError::BadRequest("No voucher files uploaded".into()));
    }

    let mut stored = Vec::with_capacity(files.len());
    for file in &files {
        match state
            .storage
            .save(AREA_VOUCHERS, &file.file_name, &file.data)
            .await
        {
            Ok(saved) => stored.push(saved.relative_path),
            Err(e) => {
                for path in &stored {
                    state.storage.remove(path).await;
                }
                return Err(e.into());
            }
        }
    }

    let mut paths = expense.voucher_paths.clone();
    paths.extend(stored.iter().cloned());
    let updated = match ExpenseRepo::set_vouchers(&state.pool, id, &paths).await {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            for path in &stored {
                state.storage.remove(path).await;
            }
            return Err(AppError::not_found("Expense", id));
        }
        Err(e) => {
            for path in &stored {
                state.storage.remove(path).await;
            }
            return Err(e.into());
        }
    };

    Audit::new(&meta, Some(user.user_id), ACTION_UPLOAD, MODULE_EXPENSE)
        .target("expense", id, &updated.expense_type)
        .describe(format!("Uploaded {} voucher(s)", stored.len()))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(updated)))
}

/// GET /api/v1/expenses/{id}/vouchers?index=
pub async fn download_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    Query(params): Query<IndexParams>,
) -> AppResult<Response> {
    let expense = load_expense(&state, id).await?;
    let path = expense::voucher_at(&expense.voucher_paths, params.index)?;

    let response = download::attachment(
        &state.storage,
        path,
        &voucher_name(id, params.index, path),
        None,
    )
    .await?;

    Audit::new(&meta, Some(user.user_id), ACTION_DOWNLOAD, MODULE_EXPENSE)
        .target("expense", id, &expense.expense_type)
        .describe(format!("Downloaded voucher {}", params.index))
        .record(&state.pool);

    Ok(response)
}

/// DELETE /api/v1/expenses/{id}/vouchers?index=
pub async fn delete_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    Query(params): Query<IndexParams>,
) -> AppResult<Json<ApiResponse<Expense>>> {
    let expense = load_expense(&state, id).await?;
    authorize(
        &user.actor(),
        &Action::ModifyExpense {
            reimbursed_by: expense.reimbursed_by,
        },
    )?;

    let mut paths = expense.voucher_paths;
    let removed = expense::take_voucher(&mut paths, params.index)?;
    let updated = ExpenseRepo::set_vouchers(&state.pool, id, &paths)
        .await?
        .ok_or_else(|| AppError::not_found("Expense", id))?;
    state.storage.remove(&removed).await;

    Audit::new(&meta, Some(user.user_id), ACTION_DELETE, MODULE_EXPENSE)
        .target("expense", id, &updated.expense_type)
        .describe(format!("Deleted voucher {}", params.index))
        .record(&state.pool);

    Ok(Json(ApiResponse::ok(updated)))
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

/// GET /api/v1/expenses/statistics
///
/// Totals per expense type, every type listed even when zero.
pub async fn statistics(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<StatisticsParams>,
) -> AppResult<Json<ApiResponse<ExpenseStatistics>>> {
    let totals = ExpenseRepo::totals_by_type(&state.pool, params.project_id).await?;
    let by_code: HashMap<String, f64> = totals
        .into_iter()
        .map(|t| (t.expense_type, t.total))
        .collect();

    let by_type: Vec<TypeStatistic> = ExpenseType::ALL
        .into_iter()
        .map(|t| TypeStatistic {
            expense_type: t.as_str(),
            label: t.label(),
            total: by_code.get(t.as_str()).copied().unwrap_or(0.0),
        })
        .collect();
    let total: f64 = by_type.iter().map(|t| t.total).sum();

    Ok(Json(ApiResponse::ok(ExpenseStatistics {
        project_id: params.project_id,
        by_type,
        total,
    })))
}

/// GET /api/v1/expenses/comparison
pub async fn comparison(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<BudgetComparison>>>> {
    let projects = ProjectRepo::list_all(&state.pool).await?;
    let totals = ExpenseRepo::project_type_totals(&state.pool).await?;

    let mut actuals: HashMap<DbId, HashMap<ExpenseType, f64>> = HashMap::new();
    for row in totals {
        match row.expense_type.parse::<ExpenseType>() {
            Ok(t) => {
                *actuals.entry(row.project_id).or_default().entry(t).or_default() += row.total;
            }
            Err(_) => {
                tracing::warn!(
                    project_id = row.project_id,
                    expense_type = %row.expense_type,
                    "Skipping expenses with unknown type"
                );
            }
        }
    }

    let empty = HashMap::new();
    let comparisons = projects
        .iter()
        .map(|p| {
            let budgets = Budgets {
                labor: p.labor_cost,
                direct: p.direct_cost,
                outsourcing: p.outsourcing_cost,
                other: p.other_cost,
            };
            compare_budget(p.id, &p.name, budgets, actuals.get(&p.id).unwrap_or(&empty))
        })
        .collect();

    Ok(Json(ApiResponse::ok(comparisons)))
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// POST /api/v1/expenses/import
///
/// Multipart field `file`: an xlsx/xls workbook. Rows are reconciled by
/// document number inside one transaction; row-level problems are reported
/// rather than failing the import.
pub async fn import(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<ImportSummary>>> {
    authorize(&user.actor(), &Action::ImportExpenses)?;

    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;
    let file_name = file.file_name.clone();
    let bytes = file.data.to_vec();

    let sheet = tokio::task::spawn_blocking(move || read_first_sheet(bytes))
        .await
        .map_err(|e| AppError::InternalError(format!("Import worker failed: {e}")))??;

    let mut plan = plan_import(&sheet);

    let project_nos: Vec<String> = plan
        .rows
        .iter()
        .filter_map(|r| r.project_no.clone())
        .collect();
    let project_ids: HashMap<String, DbId> = ProjectRepo::ids_by_no(&state.pool, &project_nos)
        .await?
        .into_iter()
        .collect();

    let mut rows = Vec::with_capacity(plan.rows.len());
    for row in std::mem::take(&mut plan.rows) {
        let project_id = match row.project_no.as_deref() {
            None => None,
            Some(no) => match project_ids.get(no) {
                Some(id) => Some(*id),
                None => {
                    plan.errors.push(RowError {
                        row: row.row_number,
                        message: format!("Unknown project number '{no}'"),
                    });
                    continue;
                }
            },
        };
        rows.push(ImportedExpense {
            document_no: row.document_no,
            project_id,
            expense_type: row.expense_type.as_str().to_string(),
            amount: row.amount,
            expense_date: row.expense_date,
            description: row.description,
            remark: row.remark,
        });
    }
    plan.errors.sort_by_key(|e| e.row);

    let counts = ExpenseRepo::import_rows(&state.pool, &rows, user.user_id, &file_name).await?;
    let summary = ImportSummary {
        inserted: counts.inserted,
        updated: counts.updated,
        skipped: plan.skipped(),
        errors: plan.errors,
    };

    tracing::info!(
        file = %file_name,
        inserted = summary.inserted,
        updated = summary.updated,
        skipped = summary.skipped,
        "Expense import finished"
    );

    Audit::new(&meta, Some(user.user_id), ACTION_IMPORT, MODULE_EXPENSE)
        .describe(format!(
            "Imported {file_name}: {} inserted, {} updated, {} skipped",
            summary.inserted, summary.updated, summary.skipped
        ))
        .record(&state.pool);

    Ok(Json(ApiResponse::with_message("Import finished", summary)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voucher_names_are_one_based() {
        assert_eq!(voucher_name(7, 0, "vouchers/202401/x.pdf"), "voucher-7-1.pdf");
        assert_eq!(voucher_name(7, 2, "vouchers/202401/x"), "voucher-7-3");
    }
}
