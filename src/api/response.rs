use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::config;

/// Wrapper for API responses that automatically adds the success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None, // Default to 200 OK
        }
    }

    /// Create an API response with custom status code
    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code: Some(status_code),
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "message": "Failed to serialize response data",
                        "error": "INTERNAL_SERVER_ERROR"
                    })),
                )
                    .into_response();
            }
        };

        (status, Json(json!({ "success": true, "data": data_value }))).into_response()
    }
}

/// Pagination block attached to every list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// List response: items under `data`, page math alongside.
#[derive(Debug)]
pub struct PageResponse<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T: Serialize> PageResponse<T> {
    pub fn new(items: Vec<T>, pagination: Pagination) -> Self {
        Self { items, pagination }
    }
}

impl<T: Serialize> IntoResponse for PageResponse<T> {
    fn into_response(self) -> Response {
        let items_value = match serde_json::to_value(&self.items) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize list response: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "message": "Failed to serialize response data",
                        "error": "INTERNAL_SERVER_ERROR"
                    })),
                )
                    .into_response();
            }
        };

        Json(json!({
            "success": true,
            "data": items_value,
            "pagination": self.pagination
        }))
        .into_response()
    }
}

/// Normalize raw pagination input: page floors at 1, limit is clamped to
/// `[1, api.max_page_size]` and falls back to the per-route default.
/// Returns `(page, limit, offset)`.
pub fn resolve_page(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> (i64, i64, i64) {
    let max = config::config().api.max_page_size;
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(default_limit).clamp(1, max);
    let offset = (page - 1) * limit;
    (page, limit, offset)
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_is_ceiling_of_total_over_limit() {
        assert_eq!(Pagination::new(1, 20, 0).pages, 0);
        assert_eq!(Pagination::new(1, 20, 1).pages, 1);
        assert_eq!(Pagination::new(1, 20, 20).pages, 1);
        assert_eq!(Pagination::new(1, 20, 21).pages, 2);
        assert_eq!(Pagination::new(1, 10, 95).pages, 10);
    }

    #[test]
    fn test_resolve_page_defaults() {
        let (page, limit, offset) = resolve_page(None, None, 20);
        assert_eq!((page, limit, offset), (1, 20, 0));
    }

    #[test]
    fn test_resolve_page_clamps_out_of_range_input() {
        let (page, _, offset) = resolve_page(Some(0), Some(20), 20);
        assert_eq!((page, offset), (1, 0));

        let (_, limit, _) = resolve_page(None, Some(0), 20);
        assert_eq!(limit, 1);

        let max = crate::config::config().api.max_page_size;
        let (_, limit, _) = resolve_page(None, Some(10_000), 20);
        assert_eq!(limit, max);
    }

    #[test]
    fn test_resolve_page_offset_math() {
        let (page, limit, offset) = resolve_page(Some(3), Some(25), 20);
        assert_eq!((page, limit, offset), (3, 25, 50));
    }
}
