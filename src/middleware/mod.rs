pub mod auth;
pub mod tenant;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use tenant::{tenant_context_middleware, RequestContext, TENANT_HEADER};
