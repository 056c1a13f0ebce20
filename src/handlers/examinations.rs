use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{resolve_page, ApiResponse, ApiResult, PageResponse, Pagination};
use crate::database::query::{tenant_row_exists, Bind, ScopedQuery, ScopedUpdate};
use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::models::examination::{CreateExamination, ExamStatus, Examination, UpdateExamination};
use crate::permissions::Permission;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListExaminationsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub class_id: Option<Uuid>,
    /// Exam date range, inclusive.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// GET /api/examinations
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListExaminationsQuery>,
) -> Result<PageResponse<Examination>, ApiError> {
    ctx.require(Permission::EXAMINATIONS_READ)?;

    let (page, limit, offset) = resolve_page(query.page, query.limit, 20);

    let mut scoped = ScopedQuery::new("examinations", ctx.tenant_id);
    if let Some(status) = query.status.as_deref() {
        let status = ExamStatus::parse(status)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid exam status: {}", status)))?;
        scoped.eq("status", Bind::text(status.as_str()));
    }
    if let Some(class_id) = query.class_id {
        scoped.eq("class_id", Bind::Uuid(class_id));
    }
    if let Some(from) = query.from {
        scoped.gte("exam_date", Bind::Date(from));
    }
    if let Some(to) = query.to {
        scoped.lte("exam_date", Bind::Date(to));
    }
    if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        scoped.search(&["name", "subject"], term.trim());
    }

    let (exams, total) = scoped
        .fetch_page::<Examination>(&state.pool, "exam_date ASC", limit, offset)
        .await?;

    Ok(PageResponse::new(exams, Pagination::new(page, limit, total)))
}

/// GET /api/examinations/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Examination> {
    ctx.require(Permission::EXAMINATIONS_READ)?;

    let exam: Option<Examination> =
        sqlx::query_as("SELECT * FROM examinations WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .fetch_optional(&state.pool)
            .await?;

    let exam = exam.ok_or_else(|| ApiError::not_found("Examination not found"))?;
    Ok(ApiResponse::success(exam))
}

/// POST /api/examinations
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateExamination>,
) -> ApiResult<Examination> {
    ctx.require(Permission::EXAMINATIONS_CREATE)?;

    let new_exam = payload.validate()?;

    if !tenant_row_exists(&state.pool, "classes", new_exam.class_id, ctx.tenant_id).await? {
        return Err(ApiError::bad_request("Class does not exist"));
    }

    let exam: Examination = sqlx::query_as(
        "INSERT INTO examinations (tenant_id, name, subject, class_id, exam_date,
                                   max_marks, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING *",
    )
    .bind(ctx.tenant_id)
    .bind(&new_exam.name)
    .bind(&new_exam.subject)
    .bind(new_exam.class_id)
    .bind(new_exam.exam_date)
    .bind(new_exam.max_marks)
    .bind(ctx.user.user_id)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(exam_id = %exam.id, tenant_id = %ctx.tenant_id, "examination created");
    Ok(ApiResponse::created(exam))
}

/// PATCH /api/examinations/:id - Partial update; status changes
/// (SCHEDULED/COMPLETED/CANCELLED) ride the same endpoint.
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateExamination>,
) -> ApiResult<Examination> {
    ctx.require(Permission::EXAMINATIONS_UPDATE)?;

    let status = payload.parsed_status()?;

    if matches!(payload.max_marks, Some(m) if m <= 0) {
        return Err(ApiError::bad_request("max_marks must be positive"));
    }
    if let Some(class_id) = payload.class_id {
        if !tenant_row_exists(&state.pool, "classes", class_id, ctx.tenant_id).await? {
            return Err(ApiError::bad_request("Class does not exist"));
        }
    }

    let mut update = ScopedUpdate::new("examinations");
    update
        .set_opt("name", payload.name.map(Bind::Text))
        .set_opt("subject", payload.subject.map(Bind::Text))
        .set_opt("class_id", payload.class_id.map(Bind::Uuid))
        .set_opt("exam_date", payload.exam_date.map(Bind::Date))
        .set_opt("max_marks", payload.max_marks.map(|m| Bind::Int(m as i64)))
        .set_opt("status", status.map(|s| Bind::text(s.as_str())));

    if update.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let exam: Option<Examination> = update.fetch_optional(&state.pool, id, ctx.tenant_id).await?;
    let exam = exam.ok_or_else(|| ApiError::not_found("Examination not found"))?;
    Ok(ApiResponse::success(exam))
}

/// DELETE /api/examinations/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    ctx.require(Permission::EXAMINATIONS_DELETE)?;

    let deleted = sqlx::query("DELETE FROM examinations WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(ctx.tenant_id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Examination not found"));
    }

    Ok(ApiResponse::success(json!({ "deleted": true, "id": id })))
}
