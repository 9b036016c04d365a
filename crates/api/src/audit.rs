//! Operation-log recording.
//!
//! Entries are written on a spawned task so a slow or failing insert never
//! delays or fails the request that triggered it.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use projectflow_core::audit::{RESULT_FAILED, RESULT_SUCCESS};
use projectflow_core::types::DbId;
use projectflow_db::models::operation_log::CreateOperationLog;
use projectflow_db::repositories::OperationLogRepo;
use projectflow_db::DbPool;

/// Client address and user agent of the current request.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        // First hop of X-Forwarded-For is the original client.
        let ip_address = header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| header("x-real-ip"))
            .map(str::to_string);

        Self {
            ip_address,
            user_agent: header("user-agent").map(str::to_string),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestMeta::from_headers(&parts.headers))
    }
}

/// Builder for one operation-log entry.
///
/// ```ignore
/// Audit::new(&meta, Some(user.user_id), ACTION_CREATE, MODULE_PROJECT)
///     .target("project", project.id, &project.name)
///     .describe(format!("Created project {}", project.name))
///     .record(&state.pool);
/// ```
#[derive(Debug, Clone)]
pub struct Audit {
    entry: CreateOperationLog,
}

impl Audit {
    pub fn new(meta: &RequestMeta, user_id: Option<DbId>, action: &str, module: &str) -> Self {
        Self {
            entry: CreateOperationLog {
                user_id,
                action: action.to_string(),
                module: module.to_string(),
                result: RESULT_SUCCESS.to_string(),
                ip_address: meta.ip_address.clone(),
                user_agent: meta.user_agent.clone(),
                ..Default::default()
            },
        }
    }

    pub fn target(mut self, target_type: &str, id: DbId, name: impl Into<String>) -> Self {
        self.entry.target_type = Some(target_type.to_string());
        self.entry.target_id = Some(id);
        self.entry.target_name = Some(name.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.entry.description = Some(description.into());
        self
    }

    pub fn failed(mut self) -> Self {
        self.entry.result = RESULT_FAILED.to_string();
        self
    }

    /// Spawn the insert and return immediately.
    pub fn record(self, pool: &DbPool) {
        let pool = pool.clone();
        let entry = self.entry;
        tokio::spawn(async move {
            if let Err(e) = OperationLogRepo::insert(&pool, &entry).await {
                tracing::warn!(
                    error = %e,
                    action = %entry.action,
                    module = %entry.module,
                    "Failed to record operation log"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn forwarded_for_wins_over_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 172.16.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.1.9"));
        headers.insert("user-agent", HeaderValue::from_static("curl/8.0"));

        let meta = RequestMeta::from_headers(&headers);
        assert_eq!(meta.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.1.9"));
        assert_eq!(
            RequestMeta::from_headers(&headers).ip_address.as_deref(),
            Some("192.168.1.9")
        );
        assert!(RequestMeta::from_headers(&HeaderMap::new()).ip_address.is_none());
    }

    #[test]
    fn builder_fills_entry() {
        let meta = RequestMeta::default();
        let audit = Audit::new(&meta, Some(3), "delete", "project")
            .target("project", 9, "Pack line")
            .describe("Deleted project Pack line")
            .failed();
        assert_eq!(audit.entry.user_id, Some(3));
        assert_eq!(audit.entry.target_id, Some(9));
        assert_eq!(audit.entry.result, "failed");
    }
}
