use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{resolve_page, ApiResponse, ApiResult, PageResponse, Pagination};
use crate::database::query::{tenant_row_exists, Bind, ScopedQuery, ScopedUpdate};
use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::models::invoice::{
    invoice_number, CreateInvoice, Invoice, InvoiceStatus, UpdateInvoice,
};
use crate::permissions::Permission;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub student_id: Option<Uuid>,
    /// Due date range, inclusive.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// GET /api/invoices
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<PageResponse<Invoice>, ApiError> {
    ctx.require(Permission::INVOICES_READ)?;

    let (page, limit, offset) = resolve_page(query.page, query.limit, 20);

    let mut scoped = ScopedQuery::new("invoices", ctx.tenant_id);
    if let Some(status) = query.status.as_deref() {
        let status = InvoiceStatus::parse(status)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid invoice status: {}", status)))?;
        scoped.eq("status", Bind::text(status.as_str()));
    }
    if let Some(student_id) = query.student_id {
        scoped.eq("student_id", Bind::Uuid(student_id));
    }
    if let Some(from) = query.from {
        scoped.gte("due_date", Bind::Date(from));
    }
    if let Some(to) = query.to {
        scoped.lte("due_date", Bind::Date(to));
    }
    if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        scoped.search(&["invoice_no", "category"], term.trim());
    }

    let (invoices, total) = scoped
        .fetch_page::<Invoice>(&state.pool, "created_at DESC", limit, offset)
        .await?;

    Ok(PageResponse::new(invoices, Pagination::new(page, limit, total)))
}

/// GET /api/invoices/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Invoice> {
    ctx.require(Permission::INVOICES_READ)?;

    let invoice: Option<Invoice> =
        sqlx::query_as("SELECT * FROM invoices WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .fetch_optional(&state.pool)
            .await?;

    let invoice = invoice.ok_or_else(|| ApiError::not_found("Invoice not found"))?;
    Ok(ApiResponse::success(invoice))
}

/// POST /api/invoices - Create an invoice with a server-derived number and
/// computed final amount.
///
/// Numbering counts the tenant's invoices inside the transaction; a
/// concurrent create for the same tenant can collide and surfaces as 409 via
/// the unique (tenant_id, invoice_no) constraint.
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateInvoice>,
) -> ApiResult<Invoice> {
    ctx.require(Permission::INVOICES_CREATE)?;

    let new_invoice = payload.validate()?;

    if !tenant_row_exists(&state.pool, "students", new_invoice.student_id, ctx.tenant_id).await? {
        return Err(ApiError::bad_request("Student does not exist"));
    }

    let mut tx = state.pool.begin().await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE tenant_id = $1")
        .bind(ctx.tenant_id)
        .fetch_one(&mut *tx)
        .await?;
    let invoice_no = invoice_number(Utc::now().year(), existing + 1);

    let invoice: Invoice = sqlx::query_as(
        "INSERT INTO invoices (tenant_id, invoice_no, student_id, category, amount,
                               discount, final_amount, status, due_date, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING *",
    )
    .bind(ctx.tenant_id)
    .bind(&invoice_no)
    .bind(new_invoice.student_id)
    .bind(&new_invoice.category)
    .bind(new_invoice.amount)
    .bind(new_invoice.discount)
    .bind(new_invoice.final_amount)
    .bind(InvoiceStatus::Unpaid.as_str())
    .bind(new_invoice.due_date)
    .bind(ctx.user.user_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        invoice_id = %invoice.id,
        invoice_no = %invoice.invoice_no,
        tenant_id = %ctx.tenant_id,
        "invoice created"
    );
    Ok(ApiResponse::created(invoice))
}

/// PATCH /api/invoices/:id - Partial update; a status change to PAID stamps
/// paid_at.
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInvoice>,
) -> ApiResult<Invoice> {
    ctx.require(Permission::INVOICES_UPDATE)?;

    let status = payload.parsed_status()?;

    let mut update = ScopedUpdate::new("invoices");
    update
        .set_opt("category", payload.category.map(Bind::Text))
        .set_opt("due_date", payload.due_date.map(Bind::Date));
    if let Some(status) = status {
        update.set("status", Bind::text(status.as_str()));
        if status == InvoiceStatus::Paid {
            update.set("paid_at", Bind::Timestamp(Utc::now()));
        }
    }

    if update.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let invoice: Option<Invoice> = update.fetch_optional(&state.pool, id, ctx.tenant_id).await?;
    let invoice = invoice.ok_or_else(|| ApiError::not_found("Invoice not found"))?;
    Ok(ApiResponse::success(invoice))
}

/// DELETE /api/invoices/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    ctx.require(Permission::INVOICES_DELETE)?;

    let deleted = sqlx::query("DELETE FROM invoices WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(ctx.tenant_id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Invoice not found"));
    }

    Ok(ApiResponse::success(json!({ "deleted": true, "id": id })))
}
