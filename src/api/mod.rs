pub mod response;

pub use response::{resolve_page, ApiResponse, ApiResult, PageResponse, Pagination};
