//! Repository for the append-only `operation_logs` table.

use sqlx::PgPool;
use projectflow_core::pagination::PageRequest;

use crate::filter::{bind_values, bind_values_scalar, BindValue, Filter};
use crate::models::operation_log::{CreateOperationLog, LogQuery, LogStatistics, OperationLog};
use crate::models::project::GroupCount;

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

/// Columns selected from `operation_logs l LEFT JOIN users u`.
const COLUMNS: &str = "\
    l.id, l.user_id, u.username, l.action, l.module, l.target_type, \
    l.target_id, l.target_name, l.description, l.result, l.ip_address, \
    l.user_agent, l.created_at";

const FROM: &str = "operation_logs l LEFT JOIN users u ON u.id = l.user_id";

/// Number of actions reported by [`OperationLogRepo::statistics`].
const TOP_ACTIONS: i64 = 10;

// ---------------------------------------------------------------------------
// OperationLogRepo
// ---------------------------------------------------------------------------

/// Insert and query operations for the audit trail. Rows are never updated.
pub struct OperationLogRepo;

impl OperationLogRepo {
    pub async fn insert(pool: &PgPool, entry: &CreateOperationLog) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO operation_logs
                (user_id, action, module, target_type, target_id, target_name,
                 description, result, ip_address, user_agent)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.module)
        .bind(&entry.target_type)
        .bind(entry.target_id)
        .bind(&entry.target_name)
        .bind(&entry.description)
        .bind(&entry.result)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Query logs with optional filters, newest first.
    pub async fn list(
        pool: &PgPool,
        params: &LogQuery,
        page: &PageRequest,
    ) -> Result<Vec<OperationLog>, sqlx::Error> {
        let filter = build_log_filter(params);
        let idx = filter.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM {FROM} {} ORDER BY l.created_at DESC, l.id DESC \
             LIMIT ${idx} OFFSET ${}",
            filter.where_clause(),
            idx + 1
        );
        bind_values(sqlx::query_as::<_, OperationLog>(&query), filter.values())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    /// Count logs matching the filter (for pagination metadata).
    pub async fn count(pool: &PgPool, params: &LogQuery) -> Result<i64, sqlx::Error> {
        let filter = build_log_filter(params);
        let query = format!("SELECT COUNT(*)::BIGINT FROM {FROM} {}", filter.where_clause());
        bind_values_scalar(sqlx::query_scalar::<_, i64>(&query), filter.values())
            .fetch_one(pool)
            .await
    }

    /// Today's and the last seven days' volume, per-module counts and the
    /// most frequent actions.
    pub async fn statistics(pool: &PgPool) -> Result<LogStatistics, sqlx::Error> {
        let today_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM operation_logs WHERE created_at >= date_trunc('day', NOW())",
        )
        .fetch_one(pool)
        .await?;

        let week_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM operation_logs WHERE created_at >= NOW() - interval '7 days'",
        )
        .fetch_one(pool)
        .await?;

        let module_counts = sqlx::query_as::<_, GroupCount>(
            "SELECT module AS key, COUNT(*)::BIGINT AS count FROM operation_logs \
             GROUP BY module ORDER BY count DESC, module",
        )
        .fetch_all(pool)
        .await?;

        let action_counts = sqlx::query_as::<_, GroupCount>(
            "SELECT action AS key, COUNT(*)::BIGINT AS count FROM operation_logs \
             GROUP BY action ORDER BY count DESC, action LIMIT $1",
        )
        .bind(TOP_ACTIONS)
        .fetch_all(pool)
        .await?;

        Ok(LogStatistics {
            today_count,
            week_count,
            module_counts,
            action_counts,
        })
    }
}

fn build_log_filter(params: &LogQuery) -> Filter {
    let mut filter = Filter::new();
    if let Some(user_id) = params.user_id {
        filter.eq("l.user_id", BindValue::BigInt(user_id));
    }
    if let Some(action) = params.action.as_deref().filter(|s| !s.is_empty()) {
        filter.eq("l.action", BindValue::Text(action.to_string()));
    }
    if let Some(module) = params.module.as_deref().filter(|s| !s.is_empty()) {
        filter.eq("l.module", BindValue::Text(module.to_string()));
    }
    if let Some(target_type) = params.target_type.as_deref().filter(|s| !s.is_empty()) {
        filter.eq("l.target_type", BindValue::Text(target_type.to_string()));
    }
    if let Some(from) = params.from {
        filter.cmp("l.created_at", ">=", BindValue::Timestamp(from));
    }
    if let Some(to) = params.to {
        filter.cmp("l.created_at", "<", BindValue::Timestamp(to));
    }
    if let Some(keyword) = params.keyword.as_deref().filter(|k| !k.is_empty()) {
        filter.search(&["l.description", "l.target_name", "u.username"], keyword);
    }
    filter
}
