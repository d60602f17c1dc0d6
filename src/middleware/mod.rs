pub mod auth;
pub mod response;

pub use auth::{jwt_auth_middleware, optional_auth_middleware, CurrentUser};
pub use response::{ApiResponse, ApiResult, PageBody};
