use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{resolve_page, ApiResponse, ApiResult, PageResponse, Pagination};
use crate::auth::password;
use crate::database::query::{tenant_row_exists, Bind, ScopedQuery, ScopedUpdate};
use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::models::student::{CreateStudent, Student, StudentStatus, UpdateStudent};
use crate::permissions::Permission;
use crate::state::AppState;

const SEARCH_COLUMNS: &[&str] = &["first_name", "last_name", "admission_no"];

#[derive(Debug, Deserialize)]
pub struct ListStudentsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub class_id: Option<Uuid>,
    /// Admission date range, inclusive.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// GET /api/students - List students in the tenant.
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListStudentsQuery>,
) -> Result<PageResponse<Student>, ApiError> {
    ctx.require(Permission::STUDENTS_READ)?;

    let (page, limit, offset) = resolve_page(query.page, query.limit, 20);

    let mut scoped = ScopedQuery::new("students", ctx.tenant_id);
    if let Some(status) = query.status.as_deref() {
        let status = StudentStatus::parse(status)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid student status: {}", status)))?;
        scoped.eq("status", Bind::text(status.as_str()));
    }
    if let Some(class_id) = query.class_id {
        scoped.eq("class_id", Bind::Uuid(class_id));
    }
    if let Some(from) = query.from {
        scoped.gte("admission_date", Bind::Date(from));
    }
    if let Some(to) = query.to {
        scoped.lte("admission_date", Bind::Date(to));
    }
    if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        scoped.search(SEARCH_COLUMNS, term.trim());
    }

    let (students, total) = scoped
        .fetch_page::<Student>(&state.pool, "created_at DESC", limit, offset)
        .await?;

    Ok(PageResponse::new(students, Pagination::new(page, limit, total)))
}

/// GET /api/students/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Student> {
    ctx.require(Permission::STUDENTS_READ)?;

    let student: Option<Student> =
        sqlx::query_as("SELECT * FROM students WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .fetch_optional(&state.pool)
            .await?;

    let student = student.ok_or_else(|| ApiError::not_found("Student not found"))?;
    Ok(ApiResponse::success(student))
}

/// POST /api/students - Create a student together with their login account.
///
/// The users row and the students row are written in one transaction so a
/// failed insert never leaves an orphaned login.
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateStudent>,
) -> ApiResult<Student> {
    ctx.require(Permission::STUDENTS_CREATE)?;

    let new_student = payload.validate()?;

    if let Some(class_id) = new_student.class_id {
        if !tenant_row_exists(&state.pool, "classes", class_id, ctx.tenant_id).await? {
            return Err(ApiError::bad_request("Class does not exist"));
        }
    }

    let initial_password = new_student
        .password
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let password_hash = password::hash_password(&initial_password)?;
    let full_name = format!("{} {}", new_student.first_name, new_student.last_name);

    let mut tx = state.pool.begin().await?;

    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (tenant_id, email, password_hash, full_name)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(ctx.tenant_id)
    .bind(&new_student.email)
    .bind(&password_hash)
    .bind(&full_name)
    .fetch_one(&mut *tx)
    .await?;

    let student: Student = sqlx::query_as(
        "INSERT INTO students (tenant_id, user_id, admission_no, first_name, last_name,
                               class_id, status, admission_date, date_of_birth,
                               guardian_name, guardian_phone, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING *",
    )
    .bind(ctx.tenant_id)
    .bind(user_id)
    .bind(&new_student.admission_no)
    .bind(&new_student.first_name)
    .bind(&new_student.last_name)
    .bind(new_student.class_id)
    .bind(new_student.status.as_str())
    .bind(new_student.admission_date)
    .bind(new_student.date_of_birth)
    .bind(new_student.guardian_name.as_deref())
    .bind(new_student.guardian_phone.as_deref())
    .bind(ctx.user.user_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(student_id = %student.id, tenant_id = %ctx.tenant_id, "student created");
    Ok(ApiResponse::created(student))
}

/// PATCH /api/students/:id - Partial update; only supplied fields change.
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStudent>,
) -> ApiResult<Student> {
    ctx.require(Permission::STUDENTS_UPDATE)?;

    let status = payload.parsed_status()?;

    if let Some(class_id) = payload.class_id {
        if !tenant_row_exists(&state.pool, "classes", class_id, ctx.tenant_id).await? {
            return Err(ApiError::bad_request("Class does not exist"));
        }
    }

    let mut update = ScopedUpdate::new("students");
    update
        .set_opt("first_name", payload.first_name.map(Bind::Text))
        .set_opt("last_name", payload.last_name.map(Bind::Text))
        .set_opt("class_id", payload.class_id.map(Bind::Uuid))
        .set_opt("status", status.map(|s| Bind::text(s.as_str())))
        .set_opt("admission_date", payload.admission_date.map(Bind::Date))
        .set_opt("date_of_birth", payload.date_of_birth.map(Bind::Date))
        .set_opt("guardian_name", payload.guardian_name.map(Bind::Text))
        .set_opt("guardian_phone", payload.guardian_phone.map(Bind::Text));

    if update.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let student: Option<Student> = update.fetch_optional(&state.pool, id, ctx.tenant_id).await?;
    let student = student.ok_or_else(|| ApiError::not_found("Student not found"))?;
    Ok(ApiResponse::success(student))
}

/// DELETE /api/students/:id - Remove the student and their login account.
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    ctx.require(Permission::STUDENTS_DELETE)?;

    let mut tx = state.pool.begin().await?;

    let user_id: Option<Uuid> = sqlx::query_scalar(
        "DELETE FROM students WHERE id = $1 AND tenant_id = $2 RETURNING user_id",
    )
    .bind(id)
    .bind(ctx.tenant_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(user_id) = user_id else {
        return Err(ApiError::not_found("Student not found"));
    };

    sqlx::query("DELETE FROM users WHERE id = $1 AND tenant_id = $2")
        .bind(user_id)
        .bind(ctx.tenant_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(student_id = %id, tenant_id = %ctx.tenant_id, "student deleted");
    Ok(ApiResponse::success(json!({ "deleted": true, "id": id })))
}
