use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{resolve_page, ApiResponse, ApiResult, PageResponse, Pagination};
use crate::database::query::{tenant_row_exists, Bind, ScopedQuery, ScopedUpdate};
use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::models::class::{Class, CreateClass, UpdateClass};
use crate::permissions::Permission;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListClassesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub academic_year: Option<String>,
    pub grade_level: Option<i32>,
    pub class_teacher_id: Option<Uuid>,
}

/// GET /api/classes
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListClassesQuery>,
) -> Result<PageResponse<Class>, ApiError> {
    ctx.require(Permission::CLASSES_READ)?;

    let (page, limit, offset) = resolve_page(query.page, query.limit, 20);

    let mut scoped = ScopedQuery::new("classes", ctx.tenant_id);
    if let Some(year) = query.academic_year.as_deref().filter(|y| !y.trim().is_empty()) {
        scoped.eq("academic_year", Bind::text(year.trim()));
    }
    if let Some(grade) = query.grade_level {
        scoped.eq("grade_level", Bind::Int(grade as i64));
    }
    if let Some(teacher) = query.class_teacher_id {
        scoped.eq("class_teacher_id", Bind::Uuid(teacher));
    }
    if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        scoped.search(&["name", "section"], term.trim());
    }

    let (classes, total) = scoped
        .fetch_page::<Class>(&state.pool, "grade_level ASC, name ASC", limit, offset)
        .await?;

    Ok(PageResponse::new(classes, Pagination::new(page, limit, total)))
}

/// GET /api/classes/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Class> {
    ctx.require(Permission::CLASSES_READ)?;

    let class: Option<Class> =
        sqlx::query_as("SELECT * FROM classes WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .fetch_optional(&state.pool)
            .await?;

    let class = class.ok_or_else(|| ApiError::not_found("Class not found"))?;
    Ok(ApiResponse::success(class))
}

/// POST /api/classes
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateClass>,
) -> ApiResult<Class> {
    ctx.require(Permission::CLASSES_CREATE)?;

    let new_class = payload.validate()?;

    if let Some(teacher_id) = new_class.class_teacher_id {
        if !tenant_row_exists(&state.pool, "staff", teacher_id, ctx.tenant_id).await? {
            return Err(ApiError::bad_request("Class teacher does not exist"));
        }
    }

    let class: Class = sqlx::query_as(
        "INSERT INTO classes (tenant_id, name, grade_level, section, academic_year,
                              class_teacher_id, capacity, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(ctx.tenant_id)
    .bind(&new_class.name)
    .bind(new_class.grade_level)
    .bind(new_class.section.as_deref())
    .bind(&new_class.academic_year)
    .bind(new_class.class_teacher_id)
    .bind(new_class.capacity)
    .bind(ctx.user.user_id)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(class_id = %class.id, tenant_id = %ctx.tenant_id, "class created");
    Ok(ApiResponse::created(class))
}

/// PATCH /api/classes/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClass>,
) -> ApiResult<Class> {
    ctx.require(Permission::CLASSES_UPDATE)?;

    if matches!(payload.capacity, Some(c) if c <= 0) {
        return Err(ApiError::bad_request("capacity must be positive"));
    }
    if let Some(teacher_id) = payload.class_teacher_id {
        if !tenant_row_exists(&state.pool, "staff", teacher_id, ctx.tenant_id).await? {
            return Err(ApiError::bad_request("Class teacher does not exist"));
        }
    }

    let mut update = ScopedUpdate::new("classes");
    update
        .set_opt("name", payload.name.map(Bind::Text))
        .set_opt("grade_level", payload.grade_level.map(|g| Bind::Int(g as i64)))
        .set_opt("section", payload.section.map(Bind::Text))
        .set_opt("academic_year", payload.academic_year.map(Bind::Text))
        .set_opt("class_teacher_id", payload.class_teacher_id.map(Bind::Uuid))
        .set_opt("capacity", payload.capacity.map(|c| Bind::Int(c as i64)));

    if update.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let class: Option<Class> = update.fetch_optional(&state.pool, id, ctx.tenant_id).await?;
    let class = class.ok_or_else(|| ApiError::not_found("Class not found"))?;
    Ok(ApiResponse::success(class))
}

/// DELETE /api/classes/:id - Enrolled students are detached (class_id set
/// null by the schema), examinations for the class are removed.
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    ctx.require(Permission::CLASSES_DELETE)?;

    let deleted = sqlx::query("DELETE FROM classes WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(ctx.tenant_id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Class not found"));
    }

    tracing::info!(class_id = %id, tenant_id = %ctx.tenant_id, "class deleted");
    Ok(ApiResponse::success(json!({ "deleted": true, "id": id })))
}
