use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{resolve_page, ApiResponse, ApiResult, PageResponse, Pagination};
use crate::auth::password;
use crate::database::query::{Bind, ScopedQuery, ScopedUpdate};
use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::models::staff::{CreateStaff, Staff, StaffStatus, UpdateStaff};
use crate::permissions::Permission;
use crate::state::AppState;

const SEARCH_COLUMNS: &[&str] = &["first_name", "last_name", "staff_no", "designation"];

#[derive(Debug, Deserialize)]
pub struct ListStaffQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub department: Option<String>,
    /// Hire date range, inclusive.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// GET /api/staff
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListStaffQuery>,
) -> Result<PageResponse<Staff>, ApiError> {
    ctx.require(Permission::STAFF_READ)?;

    let (page, limit, offset) = resolve_page(query.page, query.limit, 20);

    let mut scoped = ScopedQuery::new("staff", ctx.tenant_id);
    if let Some(status) = query.status.as_deref() {
        let status = StaffStatus::parse(status)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid staff status: {}", status)))?;
        scoped.eq("status", Bind::text(status.as_str()));
    }
    if let Some(department) = query.department.as_deref().filter(|d| !d.trim().is_empty()) {
        scoped.eq("department", Bind::text(department.trim()));
    }
    if let Some(from) = query.from {
        scoped.gte("hire_date", Bind::Date(from));
    }
    if let Some(to) = query.to {
        scoped.lte("hire_date", Bind::Date(to));
    }
    if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        scoped.search(SEARCH_COLUMNS, term.trim());
    }

    let (staff, total) = scoped
        .fetch_page::<Staff>(&state.pool, "created_at DESC", limit, offset)
        .await?;

    Ok(PageResponse::new(staff, Pagination::new(page, limit, total)))
}

/// GET /api/staff/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Staff> {
    ctx.require(Permission::STAFF_READ)?;

    let member: Option<Staff> =
        sqlx::query_as("SELECT * FROM staff WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .fetch_optional(&state.pool)
            .await?;

    let member = member.ok_or_else(|| ApiError::not_found("Staff member not found"))?;
    Ok(ApiResponse::success(member))
}

/// POST /api/staff - Create a staff member together with their login account.
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateStaff>,
) -> ApiResult<Staff> {
    ctx.require(Permission::STAFF_CREATE)?;

    let new_staff = payload.validate()?;

    let initial_password = new_staff
        .password
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let password_hash = password::hash_password(&initial_password)?;
    let full_name = format!("{} {}", new_staff.first_name, new_staff.last_name);

    let mut tx = state.pool.begin().await?;

    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (tenant_id, email, password_hash, full_name)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(ctx.tenant_id)
    .bind(&new_staff.email)
    .bind(&password_hash)
    .bind(&full_name)
    .fetch_one(&mut *tx)
    .await?;

    let member: Staff = sqlx::query_as(
        "INSERT INTO staff (tenant_id, user_id, staff_no, first_name, last_name,
                            designation, department, status, hire_date, phone, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING *",
    )
    .bind(ctx.tenant_id)
    .bind(user_id)
    .bind(&new_staff.staff_no)
    .bind(&new_staff.first_name)
    .bind(&new_staff.last_name)
    .bind(&new_staff.designation)
    .bind(new_staff.department.as_deref())
    .bind(new_staff.status.as_str())
    .bind(new_staff.hire_date)
    .bind(new_staff.phone.as_deref())
    .bind(ctx.user.user_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(staff_id = %member.id, tenant_id = %ctx.tenant_id, "staff member created");
    Ok(ApiResponse::created(member))
}

/// PATCH /api/staff/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStaff>,
) -> ApiResult<Staff> {
    ctx.require(Permission::STAFF_UPDATE)?;

    let status = payload.parsed_status()?;

    let mut update = ScopedUpdate::new("staff");
    update
        .set_opt("first_name", payload.first_name.map(Bind::Text))
        .set_opt("last_name", payload.last_name.map(Bind::Text))
        .set_opt("designation", payload.designation.map(Bind::Text))
        .set_opt("department", payload.department.map(Bind::Text))
        .set_opt("status", status.map(|s| Bind::text(s.as_str())))
        .set_opt("hire_date", payload.hire_date.map(Bind::Date))
        .set_opt("phone", payload.phone.map(Bind::Text));

    if update.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let member: Option<Staff> = update.fetch_optional(&state.pool, id, ctx.tenant_id).await?;
    let member = member.ok_or_else(|| ApiError::not_found("Staff member not found"))?;
    Ok(ApiResponse::success(member))
}

/// DELETE /api/staff/:id - Remove the staff member and their login account.
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    ctx.require(Permission::STAFF_DELETE)?;

    let mut tx = state.pool.begin().await?;

    let user_id: Option<Uuid> = sqlx::query_scalar(
        "DELETE FROM staff WHERE id = $1 AND tenant_id = $2 RETURNING user_id",
    )
    .bind(id)
    .bind(ctx.tenant_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(user_id) = user_id else {
        return Err(ApiError::not_found("Staff member not found"));
    };

    sqlx::query("DELETE FROM users WHERE id = $1 AND tenant_id = $2")
        .bind(user_id)
        .bind(ctx.tenant_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(staff_id = %id, tenant_id = %ctx.tenant_id, "staff member deleted");
    Ok(ApiResponse::success(json!({ "deleted": true, "id": id })))
}
