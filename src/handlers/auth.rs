use axum::extract::{Extension, State};
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{ApiResponse, ApiResult};
use crate::auth::{self, password, Claims};
use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::models::non_blank;
use crate::models::tenant::Tenant;
use crate::models::user::{LoginRequest, LoginResponse, User, UserSummary};
use crate::state::AppState;

/// Single message for every credential failure, so a caller cannot tell an
/// unknown tenant from a wrong password.
fn denied() -> ApiError {
    ApiError::unauthorized("Invalid tenant, email, or password")
}

/// POST /auth/login - Exchange tenant name + credentials for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let tenant = non_blank(payload.tenant);
    let email = non_blank(payload.email);
    let password_input = non_blank(payload.password);

    let mut missing = Vec::new();
    if tenant.is_none() {
        missing.push("tenant");
    }
    if email.is_none() {
        missing.push("email");
    }
    if password_input.is_none() {
        missing.push("password");
    }

    let (Some(tenant), Some(email), Some(password_input)) = (tenant, email, password_input) else {
        return Err(ApiError::missing_fields(&missing));
    };

    let tenant_row: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, status FROM tenants WHERE name = $1")
            .bind(&tenant)
            .fetch_optional(&state.pool)
            .await?;

    let Some((tenant_id, status)) = tenant_row else {
        return Err(denied());
    };
    if status != "active" {
        tracing::warn!(tenant_id = %tenant_id, "login attempt against inactive tenant");
        return Err(denied());
    }

    let user: Option<User> =
        sqlx::query_as("SELECT * FROM users WHERE tenant_id = $1 AND email = $2")
            .bind(tenant_id)
            .bind(&email)
            .fetch_optional(&state.pool)
            .await?;

    let Some(user) = user else {
        return Err(denied());
    };
    if !user.is_active {
        return Err(denied());
    }

    if !password::verify_password(&password_input, &user.password_hash)? {
        return Err(denied());
    }

    let claims = Claims::new(user.id, user.tenant_id, user.email.clone());
    let token = auth::generate_token(&claims)?;

    tracing::info!(user_id = %user.id, tenant_id = %user.tenant_id, "login succeeded");

    Ok(ApiResponse::success(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: auth::token_lifetime_secs(),
        user: UserSummary::from(&user),
    }))
}

/// GET /api/auth/whoami - Resolved identity, tenant, and effective
/// permission names. Permission-free: any authenticated user may call it.
pub async fn whoami(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> ApiResult<Value> {
    let user: User = sqlx::query_as("SELECT * FROM users WHERE id = $1 AND tenant_id = $2")
        .bind(ctx.user.user_id)
        .bind(ctx.tenant_id)
        .fetch_one(&state.pool)
        .await?;

    let tenant: Tenant = sqlx::query_as("SELECT * FROM tenants WHERE id = $1")
        .bind(ctx.tenant_id)
        .fetch_one(&state.pool)
        .await?;

    Ok(ApiResponse::success(json!({
        "user": UserSummary::from(&user),
        "tenant": {
            "id": tenant.id,
            "name": tenant.name,
            "display_name": tenant.display_name,
        },
        "permissions": ctx.permissions.names(),
    })))
}

/// POST /api/auth/refresh - Re-issue a token with a fresh expiry for the
/// already-authenticated user.
pub async fn refresh(Extension(ctx): Extension<RequestContext>) -> ApiResult<Value> {
    let claims = Claims::new(ctx.user.user_id, ctx.tenant_id, ctx.user.email.clone());
    let token = auth::generate_token(&claims)?;

    Ok(ApiResponse::success(json!({
        "token": token,
        "token_type": "Bearer",
        "expires_in": auth::token_lifetime_secs(),
    })))
}
