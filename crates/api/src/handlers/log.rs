//! Handlers for the `/logs` resource. Every endpoint requires a management
//! role.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Days, NaiveDate};
use projectflow_core::audit::{Label, ACTIONS, MODULES};
use projectflow_core::error::CoreError;
use projectflow_core::types::{DbId, Timestamp};
use projectflow_core::validation::parse_optional_date;
use projectflow_db::models::operation_log::{LogQuery, LogStatistics, OperationLog};
use projectflow_db::repositories::OperationLogRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::rbac::RequireManagement;
use crate::query::PageParams;
use crate::response::{ApiResponse, PageResponse};
use crate::state::AppState;

/// Query string of the log listing. Dates are `YYYY-MM-DD`; both ends are
/// inclusive.
#[derive(Debug, Default, Deserialize)]
pub struct LogQueryParams {
    pub user_id: Option<DbId>,
    pub action: Option<String>,
    pub module: Option<String>,
    pub target_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub keyword: Option<String>,
}

impl LogQueryParams {
    fn into_query(self) -> Result<LogQuery, CoreError> {
        let from = parse_optional_date(self.start_date.as_deref())?.map(start_of_day);
        let to = parse_optional_date(self.end_date.as_deref())?
            .map(|date| {
                date.checked_add_days(Days::new(1))
                    .map(start_of_day)
                    .ok_or_else(|| CoreError::validation("End date is out of range"))
            })
            .transpose()?;

        Ok(LogQuery {
            user_id: self.user_id,
            action: non_blank(self.action),
            module: non_blank(self.module),
            target_type: non_blank(self.target_type),
            from,
            to,
            keyword: non_blank(self.keyword),
        })
    }
}

fn start_of_day(date: NaiveDate) -> Timestamp {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// GET /api/v1/logs
pub async fn list(
    State(state): State<AppState>,
    RequireManagement(_user): RequireManagement,
    Query(page): Query<PageParams>,
    Query(params): Query<LogQueryParams>,
) -> AppResult<Json<PageResponse<OperationLog>>> {
    let query = params.into_query()?;
    let page = page.request();
    let logs = OperationLogRepo::list(&state.pool, &query, &page).await?;
    let total = OperationLogRepo::count(&state.pool, &query).await?;
    Ok(Json(PageResponse::new(logs, total, &page)))
}

/// GET /api/v1/logs/actions
pub async fn actions(
    RequireManagement(_user): RequireManagement,
) -> Json<ApiResponse<&'static [Label]>> {
    Json(ApiResponse::ok(ACTIONS))
}

/// GET /api/v1/logs/modules
pub async fn modules(
    RequireManagement(_user): RequireManagement,
) -> Json<ApiResponse<&'static [Label]>> {
    Json(ApiResponse::ok(MODULES))
}

/// GET /api/v1/logs/statistics
pub async fn statistics(
    State(state): State<AppState>,
    RequireManagement(_user): RequireManagement,
) -> AppResult<Json<ApiResponse<LogStatistics>>> {
    let stats = OperationLogRepo::statistics(&state.pool).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn end_date_is_inclusive() {
        let query = LogQueryParams {
            start_date: Some("2024-03-01".into()),
            end_date: Some("2024-03-31".into()),
            ..Default::default()
        }
        .into_query()
        .unwrap();

        assert_eq!(query.from, Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
        assert_eq!(query.to, Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn blank_filters_are_dropped() {
        let query = LogQueryParams {
            action: Some("  ".into()),
            module: Some("project".into()),
            start_date: Some(String::new()),
            ..Default::default()
        }
        .into_query()
        .unwrap();

        assert_eq!(query.action, None);
        assert_eq!(query.module.as_deref(), Some("project"));
        assert_eq!(query.from, None);
    }

    #[test]
    fn malformed_dates_are_rejected() {
        let result = LogQueryParams {
            end_date: Some("31/03/2024".into()),
            ..Default::default()
        }
        .into_query();
        assert!(result.is_err());
    }
}
