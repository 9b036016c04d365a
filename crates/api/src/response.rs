//! Shared response envelope types for API handlers.
//!
//! Every successful response is `{ "success": true, "message": ..., "data": ... }`;
//! paginated lists add `total`, `page` and `page_size` alongside `data`.

use projectflow_core::pagination::PageRequest;
use serde::Serialize;

pub const DEFAULT_MESSAGE: &str = "success";

/// Standard success envelope.
///
/// ```ignore
/// Ok(Json(ApiResponse::ok(project)))
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self::with_message(DEFAULT_MESSAGE, data)
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

impl ApiResponse<()> {
    /// A success envelope with `data: null`.
    pub fn message(message: impl Into<String>) -> Self {
        Self::with_message(message, ())
    }
}

/// Paginated success envelope.
#[derive(Debug, Serialize)]
pub struct PageResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl<T: Serialize> PageResponse<T> {
    pub fn new(data: Vec<T>, total: i64, page: &PageRequest) -> Self {
        Self {
            success: true,
            message: DEFAULT_MESSAGE.to_string(),
            data,
            total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn ok_wraps_data() {
        let value = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(
            value,
            json!({ "success": true, "message": "success", "data": [1, 2] })
        );
    }

    #[test]
    fn message_only_has_null_data() {
        let value = serde_json::to_value(ApiResponse::message("Deleted")).unwrap();
        assert_eq!(value["data"], serde_json::Value::Null);
        assert_eq!(value["message"], "Deleted");
    }

    #[test]
    fn page_response_carries_paging() {
        let page = PageRequest::new(Some(2), Some(5));
        let value = serde_json::to_value(PageResponse::new(vec!["a"], 11, &page)).unwrap();
        assert_eq!(value["total"], 11);
        assert_eq!(value["page"], 2);
        assert_eq!(value["page_size"], 5);
        assert_eq!(value["data"], json!(["a"]));
    }
}
