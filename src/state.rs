use sqlx::PgPool;

/// Shared application state handed to every handler and stateful middleware.
/// One pool serves all tenants; queries scope themselves by tenant_id.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
