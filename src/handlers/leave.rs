use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{resolve_page, ApiResponse, ApiResult, PageResponse, Pagination};
use crate::database::query::{Bind, ScopedQuery, ScopedUpdate};
use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::models::leave::{CreateLeave, LeaveRequest, LeaveStatus, UpdateLeave};
use crate::models::non_blank;
use crate::permissions::Permission;
use crate::state::AppState;

const READ_ANY: &[Permission] = &[Permission::LEAVE_READ, Permission::LEAVE_APPROVE];

#[derive(Debug, Deserialize)]
pub struct ListLeaveQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub requester_id: Option<Uuid>,
    /// Leave start date range, inclusive.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// GET /api/leave - Approvers can read without the plain read grant.
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListLeaveQuery>,
) -> Result<PageResponse<LeaveRequest>, ApiError> {
    ctx.require_any(READ_ANY)?;

    let (page, limit, offset) = resolve_page(query.page, query.limit, 20);

    let mut scoped = ScopedQuery::new("leave_requests", ctx.tenant_id);
    if let Some(status) = query.status.as_deref() {
        let status = LeaveStatus::parse(status)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid leave status: {}", status)))?;
        scoped.eq("status", Bind::text(status.as_str()));
    }
    if let Some(requester_id) = query.requester_id {
        scoped.eq("requester_id", Bind::Uuid(requester_id));
    }
    if let Some(from) = query.from {
        scoped.gte("start_date", Bind::Date(from));
    }
    if let Some(to) = query.to {
        scoped.lte("start_date", Bind::Date(to));
    }
    if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        scoped.search(&["reason"], term.trim());
    }

    let (requests, total) = scoped
        .fetch_page::<LeaveRequest>(&state.pool, "created_at DESC", limit, offset)
        .await?;

    Ok(PageResponse::new(requests, Pagination::new(page, limit, total)))
}

/// GET /api/leave/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<LeaveRequest> {
    ctx.require_any(READ_ANY)?;

    let request: Option<LeaveRequest> =
        sqlx::query_as("SELECT * FROM leave_requests WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .fetch_optional(&state.pool)
            .await?;

    let request = request.ok_or_else(|| ApiError::not_found("Leave request not found"))?;
    Ok(ApiResponse::success(request))
}

/// POST /api/leave - File a leave request for the calling user; always
/// starts PENDING.
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateLeave>,
) -> ApiResult<LeaveRequest> {
    ctx.require(Permission::LEAVE_CREATE)?;

    let new_leave = payload.validate()?;

    let request: LeaveRequest = sqlx::query_as(
        "INSERT INTO leave_requests (tenant_id, requester_id, start_date, end_date, reason, status)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(ctx.tenant_id)
    .bind(ctx.user.user_id)
    .bind(new_leave.start_date)
    .bind(new_leave.end_date)
    .bind(&new_leave.reason)
    .bind(LeaveStatus::Pending.as_str())
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::created(request))
}

/// PATCH /api/leave/:id - Edits and resolutions share this endpoint.
///
/// A `status` field is a transition and needs leave:approve; date/reason
/// edits need leave:update. Either way the request must still be PENDING;
/// the source state is re-checked inside the UPDATE so two approvers cannot
/// both resolve it.
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLeave>,
) -> ApiResult<LeaveRequest> {
    let status = payload.parsed_status()?;
    let UpdateLeave {
        status: _,
        start_date,
        end_date,
        reason,
        rejection_reason,
    } = payload;

    let editing = start_date.is_some() || end_date.is_some() || reason.is_some();

    if status.is_some() {
        ctx.require(Permission::LEAVE_APPROVE)?;
    }
    if editing {
        ctx.require(Permission::LEAVE_UPDATE)?;
    }
    if status.is_none() && !editing {
        return Err(ApiError::bad_request("No fields to update"));
    }
    if rejection_reason.is_some() && status != Some(LeaveStatus::Rejected) {
        return Err(ApiError::bad_request(
            "rejection_reason is only valid when rejecting",
        ));
    }

    let current: Option<LeaveRequest> =
        sqlx::query_as("SELECT * FROM leave_requests WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .fetch_optional(&state.pool)
            .await?;
    let current = current.ok_or_else(|| ApiError::not_found("Leave request not found"))?;

    if LeaveStatus::parse(&current.status) != Some(LeaveStatus::Pending) {
        return Err(ApiError::conflict("Leave request is already resolved"));
    }

    let merged_start = start_date.unwrap_or(current.start_date);
    let merged_end = end_date.unwrap_or(current.end_date);
    if merged_end < merged_start {
        return Err(ApiError::bad_request("end_date cannot be before start_date"));
    }

    let mut update = ScopedUpdate::new("leave_requests");
    update
        .set_opt("start_date", start_date.map(Bind::Date))
        .set_opt("end_date", end_date.map(Bind::Date))
        .set_opt("reason", reason.map(Bind::Text))
        .guard("status", Bind::text(LeaveStatus::Pending.as_str()));

    match status {
        Some(LeaveStatus::Approved) => {
            update
                .set("status", Bind::text(LeaveStatus::Approved.as_str()))
                .set("approved_by", Bind::Uuid(ctx.user.user_id))
                .set("resolved_at", Bind::Timestamp(Utc::now()));
        }
        Some(LeaveStatus::Rejected) => {
            let rejection_reason = non_blank(rejection_reason).ok_or_else(|| {
                ApiError::validation_error(
                    "rejection_reason is required when rejecting",
                    Some(std::collections::HashMap::from([(
                        "rejection_reason".to_string(),
                        "This field is required".to_string(),
                    )])),
                )
            })?;
            update
                .set("status", Bind::text(LeaveStatus::Rejected.as_str()))
                .set("rejection_reason", Bind::Text(rejection_reason))
                .set("approved_by", Bind::Uuid(ctx.user.user_id))
                .set("resolved_at", Bind::Timestamp(Utc::now()));
        }
        Some(LeaveStatus::Pending) => {
            return Err(ApiError::bad_request("Cannot transition back to PENDING"));
        }
        None => {}
    }

    let request: Option<LeaveRequest> =
        update.fetch_optional(&state.pool, id, ctx.tenant_id).await?;

    match request {
        Some(request) => {
            if let Some(status) = status {
                tracing::info!(
                    leave_id = %id,
                    resolver = %ctx.user.user_id,
                    status = status.as_str(),
                    "leave request resolved"
                );
            }
            Ok(ApiResponse::success(request))
        }
        // The guard lost a race: someone else resolved it between the fetch
        // and the update.
        None => Err(ApiError::conflict("Leave request is already resolved")),
    }
}

/// DELETE /api/leave/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    ctx.require(Permission::LEAVE_DELETE)?;

    let deleted = sqlx::query("DELETE FROM leave_requests WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(ctx.tenant_id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Leave request not found"));
    }

    Ok(ApiResponse::success(json!({ "deleted": true, "id": id })))
}
