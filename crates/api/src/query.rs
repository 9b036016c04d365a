//! Shared query parameter types for API handlers.

use projectflow_core::pagination::PageRequest;
use serde::Deserialize;

/// Page-based pagination parameters (`?page=&page_size=`).
///
/// Extracted next to each list endpoint's filter struct (both read the same
/// query string); values are clamped by [`PageRequest::new`].
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }
}

/// `?index=` selector for voucher endpoints.
#[derive(Debug, Deserialize)]
pub struct IndexParams {
    pub index: usize,
}
