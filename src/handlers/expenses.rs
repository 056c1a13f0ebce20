use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{resolve_page, ApiResponse, ApiResult, PageResponse, Pagination};
use crate::database::query::{Bind, ScopedQuery, ScopedUpdate};
use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::models::expense::{CreateExpense, Expense, UpdateExpense};
use crate::permissions::Permission;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListExpensesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category: Option<String>,
    /// Incurred date range, inclusive.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// GET /api/expenses
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListExpensesQuery>,
) -> Result<PageResponse<Expense>, ApiError> {
    ctx.require(Permission::EXPENSES_READ)?;

    let (page, limit, offset) = resolve_page(query.page, query.limit, 20);

    let mut scoped = ScopedQuery::new("expenses", ctx.tenant_id);
    if let Some(category) = query.category.as_deref().filter(|c| !c.trim().is_empty()) {
        scoped.eq("category", Bind::text(category.trim()));
    }
    if let Some(from) = query.from {
        scoped.gte("incurred_on", Bind::Date(from));
    }
    if let Some(to) = query.to {
        scoped.lte("incurred_on", Bind::Date(to));
    }
    if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        scoped.search(&["title", "category"], term.trim());
    }

    let (expenses, total) = scoped
        .fetch_page::<Expense>(&state.pool, "incurred_on DESC", limit, offset)
        .await?;

    Ok(PageResponse::new(expenses, Pagination::new(page, limit, total)))
}

/// GET /api/expenses/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Expense> {
    ctx.require(Permission::EXPENSES_READ)?;

    let expense: Option<Expense> =
        sqlx::query_as("SELECT * FROM expenses WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .fetch_optional(&state.pool)
            .await?;

    let expense = expense.ok_or_else(|| ApiError::not_found("Expense not found"))?;
    Ok(ApiResponse::success(expense))
}

/// POST /api/expenses
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateExpense>,
) -> ApiResult<Expense> {
    ctx.require(Permission::EXPENSES_CREATE)?;

    let new_expense = payload.validate()?;

    let expense: Expense = sqlx::query_as(
        "INSERT INTO expenses (tenant_id, title, category, amount, incurred_on, notes, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING *",
    )
    .bind(ctx.tenant_id)
    .bind(&new_expense.title)
    .bind(&new_expense.category)
    .bind(new_expense.amount)
    .bind(new_expense.incurred_on)
    .bind(new_expense.notes.as_deref())
    .bind(ctx.user.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::created(expense))
}

/// PATCH /api/expenses/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateExpense>,
) -> ApiResult<Expense> {
    ctx.require(Permission::EXPENSES_UPDATE)?;

    payload.check()?;

    let mut update = ScopedUpdate::new("expenses");
    update
        .set_opt("title", payload.title.map(Bind::Text))
        .set_opt("category", payload.category.map(Bind::Text))
        .set_opt("amount", payload.amount.map(Bind::Decimal))
        .set_opt("incurred_on", payload.incurred_on.map(Bind::Date))
        .set_opt("notes", payload.notes.map(Bind::Text));

    if update.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let expense: Option<Expense> = update.fetch_optional(&state.pool, id, ctx.tenant_id).await?;
    let expense = expense.ok_or_else(|| ApiError::not_found("Expense not found"))?;
    Ok(ApiResponse::success(expense))
}

/// DELETE /api/expenses/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    ctx.require(Permission::EXPENSES_DELETE)?;

    let deleted = sqlx::query("DELETE FROM expenses WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(ctx.tenant_id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Expense not found"));
    }

    Ok(ApiResponse::success(json!({ "deleted": true, "id": id })))
}
