use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{resolve_page, ApiResponse, ApiResult, PageResponse, Pagination};
use crate::database::query::{Bind, ScopedQuery, ScopedUpdate};
use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::models::book::{Book, CreateBook, UpdateBook};
use crate::permissions::Permission;
use crate::state::AppState;

const SEARCH_COLUMNS: &[&str] = &["title", "author", "isbn"];

#[derive(Debug, Deserialize)]
pub struct ListBooksQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category: Option<String>,
}

/// GET /api/books
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListBooksQuery>,
) -> Result<PageResponse<Book>, ApiError> {
    ctx.require(Permission::BOOKS_READ)?;

    let (page, limit, offset) = resolve_page(query.page, query.limit, 20);

    let mut scoped = ScopedQuery::new("books", ctx.tenant_id);
    if let Some(category) = query.category.as_deref().filter(|c| !c.trim().is_empty()) {
        scoped.eq("category", Bind::text(category.trim()));
    }
    if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        scoped.search(SEARCH_COLUMNS, term.trim());
    }

    let (books, total) = scoped
        .fetch_page::<Book>(&state.pool, "title ASC", limit, offset)
        .await?;

    Ok(PageResponse::new(books, Pagination::new(page, limit, total)))
}

/// GET /api/books/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Book> {
    ctx.require(Permission::BOOKS_READ)?;

    let book: Option<Book> = sqlx::query_as("SELECT * FROM books WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_optional(&state.pool)
        .await?;

    let book = book.ok_or_else(|| ApiError::not_found("Book not found"))?;
    Ok(ApiResponse::success(book))
}

/// POST /api/books - New titles start with every copy available.
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateBook>,
) -> ApiResult<Book> {
    ctx.require(Permission::BOOKS_CREATE)?;

    let new_book = payload.validate()?;

    let book: Book = sqlx::query_as(
        "INSERT INTO books (tenant_id, title, author, isbn, category,
                            total_copies, available_copies, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(ctx.tenant_id)
    .bind(&new_book.title)
    .bind(&new_book.author)
    .bind(&new_book.isbn)
    .bind(&new_book.category)
    .bind(new_book.total_copies)
    .bind(new_book.total_copies)
    .bind(ctx.user.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::created(book))
}

/// PATCH /api/books/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBook>,
) -> ApiResult<Book> {
    ctx.require(Permission::BOOKS_UPDATE)?;

    payload.check()?;

    let mut update = ScopedUpdate::new("books");
    update
        .set_opt("title", payload.title.map(Bind::Text))
        .set_opt("author", payload.author.map(Bind::Text))
        .set_opt("isbn", payload.isbn.map(Bind::Text))
        .set_opt("category", payload.category.map(Bind::Text))
        .set_opt("total_copies", payload.total_copies.map(|n| Bind::Int(n as i64)))
        .set_opt(
            "available_copies",
            payload.available_copies.map(|n| Bind::Int(n as i64)),
        );

    if update.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let book: Option<Book> = update.fetch_optional(&state.pool, id, ctx.tenant_id).await?;
    let book = book.ok_or_else(|| ApiError::not_found("Book not found"))?;
    Ok(ApiResponse::success(book))
}

/// DELETE /api/books/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    ctx.require(Permission::BOOKS_DELETE)?;

    let deleted = sqlx::query("DELETE FROM books WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(ctx.tenant_id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Book not found"));
    }

    Ok(ApiResponse::success(json!({ "deleted": true, "id": id })))
}
