use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{resolve_page, ApiResponse, ApiResult, PageResponse, Pagination};
use crate::database::query::{tenant_row_exists, Bind, ScopedQuery, ScopedUpdate};
use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::models::announcement::{
    Announcement, AnnouncementStatus, Audience, CreateAnnouncement, UpdateAnnouncement,
};
use crate::permissions::Permission;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListAnnouncementsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub audience: Option<String>,
    /// Creation time range, inclusive, RFC 3339.
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// GET /api/announcements
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListAnnouncementsQuery>,
) -> Result<PageResponse<Announcement>, ApiError> {
    ctx.require(Permission::ANNOUNCEMENTS_READ)?;

    let (page, limit, offset) = resolve_page(query.page, query.limit, 10);

    let mut scoped = ScopedQuery::new("announcements", ctx.tenant_id);
    if let Some(status) = query.status.as_deref() {
        let status = AnnouncementStatus::parse(status).ok_or_else(|| {
            ApiError::bad_request(format!("Invalid announcement status: {}", status))
        })?;
        scoped.eq("status", Bind::text(status.as_str()));
    }
    if let Some(audience) = query.audience.as_deref() {
        let audience = Audience::parse(audience)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid audience: {}", audience)))?;
        scoped.eq("audience", Bind::text(audience.as_str()));
    }
    if let Some(from) = query.from {
        scoped.gte("created_at", Bind::Timestamp(from));
    }
    if let Some(to) = query.to {
        scoped.lte("created_at", Bind::Timestamp(to));
    }
    if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        scoped.search(&["title", "body"], term.trim());
    }

    let (announcements, total) = scoped
        .fetch_page::<Announcement>(&state.pool, "created_at DESC", limit, offset)
        .await?;

    Ok(PageResponse::new(
        announcements,
        Pagination::new(page, limit, total),
    ))
}

/// GET /api/announcements/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Announcement> {
    ctx.require(Permission::ANNOUNCEMENTS_READ)?;

    let announcement: Option<Announcement> =
        sqlx::query_as("SELECT * FROM announcements WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .fetch_optional(&state.pool)
            .await?;

    let announcement =
        announcement.ok_or_else(|| ApiError::not_found("Announcement not found"))?;
    Ok(ApiResponse::success(announcement))
}

/// POST /api/announcements - New announcements start in DRAFT.
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateAnnouncement>,
) -> ApiResult<Announcement> {
    ctx.require(Permission::ANNOUNCEMENTS_CREATE)?;

    let new_announcement = payload.validate()?;

    let announcement: Announcement = sqlx::query_as(
        "INSERT INTO announcements (tenant_id, title, body, audience, status, created_by)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(ctx.tenant_id)
    .bind(&new_announcement.title)
    .bind(&new_announcement.body)
    .bind(new_announcement.audience.as_str())
    .bind(AnnouncementStatus::Draft.as_str())
    .bind(ctx.user.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::created(announcement))
}

/// PATCH /api/announcements/:id - Edit title, body, or audience.
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAnnouncement>,
) -> ApiResult<Announcement> {
    ctx.require(Permission::ANNOUNCEMENTS_UPDATE)?;

    let audience = payload.parsed_audience()?;

    let mut update = ScopedUpdate::new("announcements");
    update
        .set_opt("title", payload.title.map(Bind::Text))
        .set_opt("body", payload.body.map(Bind::Text))
        .set_opt("audience", audience.map(|a| Bind::text(a.as_str())));

    if update.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let announcement: Option<Announcement> =
        update.fetch_optional(&state.pool, id, ctx.tenant_id).await?;
    let announcement =
        announcement.ok_or_else(|| ApiError::not_found("Announcement not found"))?;
    Ok(ApiResponse::success(announcement))
}

/// Run a guarded status transition; when no row matches, disambiguate
/// between a missing row (404) and a wrong source state (409).
async fn transition(
    state: &AppState,
    ctx: &RequestContext,
    id: Uuid,
    from: AnnouncementStatus,
    to: AnnouncementStatus,
    stamp_published: bool,
) -> Result<Announcement, ApiError> {
    let mut update = ScopedUpdate::new("announcements");
    update
        .set("status", Bind::text(to.as_str()))
        .guard("status", Bind::text(from.as_str()));
    if stamp_published {
        update.set("published_at", Bind::Timestamp(Utc::now()));
    }

    let announcement: Option<Announcement> =
        update.fetch_optional(&state.pool, id, ctx.tenant_id).await?;

    match announcement {
        Some(announcement) => Ok(announcement),
        None => {
            if tenant_row_exists(&state.pool, "announcements", id, ctx.tenant_id).await? {
                Err(ApiError::conflict(format!(
                    "Announcement is not in {} state",
                    from.as_str()
                )))
            } else {
                Err(ApiError::not_found("Announcement not found"))
            }
        }
    }
}

/// POST /api/announcements/:id/publish - DRAFT to PUBLISHED, stamps
/// published_at. Publishing from any other state is a 409.
pub async fn publish(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Announcement> {
    ctx.require(Permission::ANNOUNCEMENTS_UPDATE)?;

    let announcement = transition(
        &state,
        &ctx,
        id,
        AnnouncementStatus::Draft,
        AnnouncementStatus::Published,
        true,
    )
    .await?;

    tracing::info!(announcement_id = %id, tenant_id = %ctx.tenant_id, "announcement published");
    Ok(ApiResponse::success(announcement))
}

/// POST /api/announcements/:id/archive - PUBLISHED to ARCHIVED.
pub async fn archive(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Announcement> {
    ctx.require(Permission::ANNOUNCEMENTS_UPDATE)?;

    let announcement = transition(
        &state,
        &ctx,
        id,
        AnnouncementStatus::Published,
        AnnouncementStatus::Archived,
        false,
    )
    .await?;

    Ok(ApiResponse::success(announcement))
}

/// DELETE /api/announcements/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    ctx.require(Permission::ANNOUNCEMENTS_DELETE)?;

    let deleted = sqlx::query("DELETE FROM announcements WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(ctx.tenant_id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Announcement not found"));
    }

    Ok(ApiResponse::success(json!({ "deleted": true, "id": id })))
}
