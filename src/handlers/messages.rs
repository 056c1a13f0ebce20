use std::collections::HashSet;

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{resolve_page, ApiResponse, ApiResult, PageResponse, Pagination};
use crate::database::query::{tenant_row_exists, Bind, ScopedQuery};
use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::models::message::{
    BulkMessage, BulkSendReport, CreateMessage, Message, MessageStatus, NewMessage,
};
use crate::permissions::Permission;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub recipient_id: Option<Uuid>,
    /// Creation time range, inclusive, RFC 3339.
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// GET /api/messages
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListMessagesQuery>,
) -> Result<PageResponse<Message>, ApiError> {
    ctx.require(Permission::MESSAGES_READ)?;

    let (page, limit, offset) = resolve_page(query.page, query.limit, 10);

    let mut scoped = ScopedQuery::new("messages", ctx.tenant_id);
    if let Some(status) = query.status.as_deref() {
        let status = MessageStatus::parse(status)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid message status: {}", status)))?;
        scoped.eq("status", Bind::text(status.as_str()));
    }
    if let Some(recipient_id) = query.recipient_id {
        scoped.eq("recipient_id", Bind::Uuid(recipient_id));
    }
    if let Some(from) = query.from {
        scoped.gte("created_at", Bind::Timestamp(from));
    }
    if let Some(to) = query.to {
        scoped.lte("created_at", Bind::Timestamp(to));
    }
    if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        scoped.search(&["subject", "body"], term.trim());
    }

    let (messages, total) = scoped
        .fetch_page::<Message>(&state.pool, "created_at DESC", limit, offset)
        .await?;

    Ok(PageResponse::new(messages, Pagination::new(page, limit, total)))
}

/// GET /api/messages/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Message> {
    ctx.require(Permission::MESSAGES_READ)?;

    let message: Option<Message> =
        sqlx::query_as("SELECT * FROM messages WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .fetch_optional(&state.pool)
            .await?;

    let message = message.ok_or_else(|| ApiError::not_found("Message not found"))?;
    Ok(ApiResponse::success(message))
}

async fn insert_message(
    tx: &mut sqlx::PgConnection,
    tenant_id: Uuid,
    sender_id: Uuid,
    recipient_id: Uuid,
    subject: &str,
    body: &str,
    scheduled_at: Option<DateTime<Utc>>,
) -> Result<Message, sqlx::Error> {
    // A schedule time in the past is treated as "send now".
    let now = Utc::now();
    let (status, sent_at) = match scheduled_at {
        Some(at) if at > now => (MessageStatus::Scheduled, None),
        _ => (MessageStatus::Sent, Some(now)),
    };

    let message: Message = sqlx::query_as(
        "INSERT INTO messages (tenant_id, sender_id, recipient_id, subject, body,
                               status, scheduled_at, sent_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(tenant_id)
    .bind(sender_id)
    .bind(recipient_id)
    .bind(subject)
    .bind(body)
    .bind(status.as_str())
    .bind(scheduled_at)
    .bind(sent_at)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO communication_logs (tenant_id, message_id, recipient_id)
         VALUES ($1, $2, $3)",
    )
    .bind(tenant_id)
    .bind(message.id)
    .bind(recipient_id)
    .execute(&mut *tx)
    .await?;

    Ok(message)
}

/// POST /api/messages - Send (or schedule) a message to one recipient. The
/// message row and its communication-log row are written together.
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateMessage>,
) -> ApiResult<Message> {
    ctx.require(Permission::MESSAGES_CREATE)?;

    let NewMessage {
        recipient_id,
        subject,
        body,
        scheduled_at,
    } = payload.validate()?;

    if !tenant_row_exists(&state.pool, "users", recipient_id, ctx.tenant_id).await? {
        return Err(ApiError::bad_request("Recipient does not exist"));
    }

    let mut tx = state.pool.begin().await?;
    let message = insert_message(
        &mut tx,
        ctx.tenant_id,
        ctx.user.user_id,
        recipient_id,
        &subject,
        &body,
        scheduled_at,
    )
    .await?;
    tx.commit().await?;

    Ok(ApiResponse::created(message))
}

/// POST /api/messages/bulk - Send one message per recipient in a single
/// transaction. Recipients outside the tenant are skipped and reported back,
/// not silently dropped.
pub async fn bulk(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<BulkMessage>,
) -> ApiResult<BulkSendReport> {
    ctx.require(Permission::MESSAGES_CREATE)?;

    let new_bulk = payload.validate()?;

    let valid: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM users WHERE tenant_id = $1 AND id = ANY($2)")
            .bind(ctx.tenant_id)
            .bind(&new_bulk.recipient_ids)
            .fetch_all(&state.pool)
            .await?;
    let valid: HashSet<Uuid> = valid.into_iter().collect();

    let mut recipients = Vec::new();
    let mut skipped = Vec::new();
    for id in &new_bulk.recipient_ids {
        if valid.contains(id) {
            recipients.push(*id);
        } else {
            tracing::warn!(
                recipient_id = %id,
                tenant_id = %ctx.tenant_id,
                "bulk message recipient not in tenant, skipping"
            );
            skipped.push(*id);
        }
    }

    if recipients.is_empty() {
        return Err(ApiError::bad_request("No valid recipients"));
    }

    let mut tx = state.pool.begin().await?;
    let mut message_ids = Vec::with_capacity(recipients.len());
    for recipient_id in &recipients {
        let message = insert_message(
            &mut tx,
            ctx.tenant_id,
            ctx.user.user_id,
            *recipient_id,
            &new_bulk.subject,
            &new_bulk.body,
            None,
        )
        .await?;
        message_ids.push(message.id);
    }
    tx.commit().await?;

    tracing::info!(
        created = message_ids.len(),
        skipped = skipped.len(),
        tenant_id = %ctx.tenant_id,
        "bulk message sent"
    );

    Ok(ApiResponse::created(BulkSendReport {
        created: message_ids.len(),
        message_ids,
        skipped_recipient_ids: skipped,
    }))
}

/// POST /api/messages/:id/read - Mark a message read. Idempotent: the first
/// call stamps read_at, later calls leave it untouched.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Message> {
    ctx.require(Permission::MESSAGES_UPDATE)?;

    let message: Option<Message> = sqlx::query_as(
        "UPDATE messages
         SET status = $3, read_at = COALESCE(read_at, now()), updated_at = now()
         WHERE id = $1 AND tenant_id = $2
         RETURNING *",
    )
    .bind(id)
    .bind(ctx.tenant_id)
    .bind(MessageStatus::Read.as_str())
    .fetch_optional(&state.pool)
    .await?;

    let message = message.ok_or_else(|| ApiError::not_found("Message not found"))?;
    Ok(ApiResponse::success(message))
}

/// DELETE /api/messages/:id - Deletes the message and its log rows.
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    ctx.require(Permission::MESSAGES_DELETE)?;

    let deleted = sqlx::query("DELETE FROM messages WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(ctx.tenant_id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Message not found"));
    }

    Ok(ApiResponse::success(json!({ "deleted": true, "id": id })))
}
