use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{resolve_page, ApiResponse, ApiResult, PageResponse, Pagination};
use crate::database::query::{Bind, ScopedQuery, ScopedUpdate};
use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::models::hostel::{CreateHostel, Hostel, UpdateHostel};
use crate::permissions::Permission;
use crate::state::AppState;

const SEARCH_COLUMNS: &[&str] = &["name", "warden_name"];

#[derive(Debug, Deserialize)]
pub struct ListHostelsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

/// GET /api/hostels
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListHostelsQuery>,
) -> Result<PageResponse<Hostel>, ApiError> {
    ctx.require(Permission::HOSTELS_READ)?;

    let (page, limit, offset) = resolve_page(query.page, query.limit, 20);

    let mut scoped = ScopedQuery::new("hostels", ctx.tenant_id);
    if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        scoped.search(SEARCH_COLUMNS, term.trim());
    }

    let (hostels, total) = scoped
        .fetch_page::<Hostel>(&state.pool, "name ASC", limit, offset)
        .await?;

    Ok(PageResponse::new(hostels, Pagination::new(page, limit, total)))
}

/// GET /api/hostels/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Hostel> {
    ctx.require(Permission::HOSTELS_READ)?;

    let hostel: Option<Hostel> =
        sqlx::query_as("SELECT * FROM hostels WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .fetch_optional(&state.pool)
            .await?;

    let hostel = hostel.ok_or_else(|| ApiError::not_found("Hostel not found"))?;
    Ok(ApiResponse::success(hostel))
}

/// POST /api/hostels
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateHostel>,
) -> ApiResult<Hostel> {
    ctx.require(Permission::HOSTELS_CREATE)?;

    let new_hostel = payload.validate()?;

    let hostel: Hostel = sqlx::query_as(
        "INSERT INTO hostels (tenant_id, name, warden_name, capacity, notes, created_by)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(ctx.tenant_id)
    .bind(&new_hostel.name)
    .bind(&new_hostel.warden_name)
    .bind(new_hostel.capacity)
    .bind(&new_hostel.notes)
    .bind(ctx.user.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::created(hostel))
}

/// PATCH /api/hostels/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateHostel>,
) -> ApiResult<Hostel> {
    ctx.require(Permission::HOSTELS_UPDATE)?;

    payload.check()?;

    let mut update = ScopedUpdate::new("hostels");
    update
        .set_opt("name", payload.name.map(Bind::Text))
        .set_opt("warden_name", payload.warden_name.map(Bind::Text))
        .set_opt("capacity", payload.capacity.map(|n| Bind::Int(n as i64)))
        .set_opt("occupied", payload.occupied.map(|n| Bind::Int(n as i64)))
        .set_opt("notes", payload.notes.map(Bind::Text));

    if update.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let hostel: Option<Hostel> = update.fetch_optional(&state.pool, id, ctx.tenant_id).await?;
    let hostel = hostel.ok_or_else(|| ApiError::not_found("Hostel not found"))?;
    Ok(ApiResponse::success(hostel))
}

/// DELETE /api/hostels/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    ctx.require(Permission::HOSTELS_DELETE)?;

    let deleted = sqlx::query("DELETE FROM hostels WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(ctx.tenant_id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Hostel not found"));
    }

    Ok(ApiResponse::success(json!({ "deleted": true, "id": id })))
}
