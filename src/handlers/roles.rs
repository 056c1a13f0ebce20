use std::collections::HashMap;

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::{resolve_page, ApiResponse, ApiResult, PageResponse, Pagination};
use crate::database::query::{tenant_row_exists, Bind, ScopedQuery, ScopedUpdate};
use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::models::non_blank;
use crate::models::role::{
    parse_permission_names, AssignRole, CreateRole, Role, RoleWithPermissions, UpdateRole,
};
use crate::permissions::Permission;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListRolesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

/// Granted permission names per role, one query for a whole page of roles.
async fn grants_for_roles(
    pool: &PgPool,
    role_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, Vec<String>>, sqlx::Error> {
    if role_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, String)> = sqlx::query_as(
        "SELECT rp.role_id, p.name
         FROM role_permissions rp
         JOIN permissions p ON p.id = rp.permission_id
         WHERE rp.role_id = ANY($1)
         ORDER BY p.name",
    )
    .bind(&role_ids)
    .fetch_all(pool)
    .await?;

    let mut grants: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (role_id, name) in rows {
        grants.entry(role_id).or_default().push(name);
    }
    Ok(grants)
}

async fn role_grants(pool: &PgPool, role_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT p.name
         FROM role_permissions rp
         JOIN permissions p ON p.id = rp.permission_id
         WHERE rp.role_id = $1
         ORDER BY p.name",
    )
    .bind(role_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Replace a role's grant list wholesale. Names were already parsed against
/// the catalog, so the SELECT resolves every one of them.
async fn replace_grants(
    tx: &mut sqlx::PgConnection,
    role_id: Uuid,
    permissions: &[Permission],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
        .bind(role_id)
        .execute(&mut *tx)
        .await?;

    if permissions.is_empty() {
        return Ok(());
    }

    let names: Vec<String> = permissions.iter().map(Permission::name).collect();
    sqlx::query(
        "INSERT INTO role_permissions (role_id, permission_id)
         SELECT $1, id FROM permissions WHERE name = ANY($2)",
    )
    .bind(role_id)
    .bind(&names)
    .execute(&mut *tx)
    .await?;

    Ok(())
}

fn sorted_names(permissions: &[Permission]) -> Vec<String> {
    let mut names: Vec<String> = permissions.iter().map(Permission::name).collect();
    names.sort();
    names
}

/// GET /api/roles
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListRolesQuery>,
) -> Result<PageResponse<RoleWithPermissions>, ApiError> {
    ctx.require(Permission::ROLES_READ)?;

    let (page, limit, offset) = resolve_page(query.page, query.limit, 20);

    let mut scoped = ScopedQuery::new("roles", ctx.tenant_id);
    if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        scoped.search(&["name", "description"], term.trim());
    }

    let (roles, total) = scoped
        .fetch_page::<Role>(&state.pool, "name ASC", limit, offset)
        .await?;

    let ids: Vec<Uuid> = roles.iter().map(|r| r.id).collect();
    let mut grants = grants_for_roles(&state.pool, ids).await?;

    let roles: Vec<RoleWithPermissions> = roles
        .into_iter()
        .map(|role| {
            let permissions = grants.remove(&role.id).unwrap_or_default();
            RoleWithPermissions { role, permissions }
        })
        .collect();

    Ok(PageResponse::new(roles, Pagination::new(page, limit, total)))
}

/// GET /api/roles/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<RoleWithPermissions> {
    ctx.require(Permission::ROLES_READ)?;

    let role: Option<Role> = sqlx::query_as("SELECT * FROM roles WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_optional(&state.pool)
        .await?;

    let role = role.ok_or_else(|| ApiError::not_found("Role not found"))?;
    let permissions = role_grants(&state.pool, role.id).await?;
    Ok(ApiResponse::success(RoleWithPermissions { role, permissions }))
}

/// POST /api/roles - Create a role and its grants in one transaction. A
/// duplicate name within the tenant comes back as 409.
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateRole>,
) -> ApiResult<RoleWithPermissions> {
    ctx.require(Permission::ROLES_CREATE)?;

    let new_role = payload.validate()?;

    let mut tx = state.pool.begin().await?;

    let role: Role = sqlx::query_as(
        "INSERT INTO roles (tenant_id, name, description)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(ctx.tenant_id)
    .bind(&new_role.name)
    .bind(&new_role.description)
    .fetch_one(&mut *tx)
    .await?;

    replace_grants(&mut tx, role.id, &new_role.permissions).await?;

    tx.commit().await?;

    let permissions = sorted_names(&new_role.permissions);
    Ok(ApiResponse::created(RoleWithPermissions { role, permissions }))
}

/// PATCH /api/roles/:id - A `permissions` array replaces the grant list
/// wholesale; name and description edit in place.
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRole>,
) -> ApiResult<RoleWithPermissions> {
    ctx.require(Permission::ROLES_UPDATE)?;

    let parsed = payload
        .permissions
        .as_deref()
        .map(parse_permission_names)
        .transpose()?;
    let name = non_blank(payload.name);
    let description = non_blank(payload.description);

    if name.is_none() && description.is_none() && parsed.is_none() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let mut tx = state.pool.begin().await?;

    let role: Option<Role> = if name.is_some() || description.is_some() {
        let mut update = ScopedUpdate::new("roles");
        update
            .set_opt("name", name.map(Bind::Text))
            .set_opt("description", description.map(Bind::Text));
        update.fetch_optional(&mut *tx, id, ctx.tenant_id).await?
    } else {
        sqlx::query_as("SELECT * FROM roles WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .fetch_optional(&mut *tx)
            .await?
    };
    let role = role.ok_or_else(|| ApiError::not_found("Role not found"))?;

    if let Some(permissions) = &parsed {
        replace_grants(&mut tx, role.id, permissions).await?;
    }

    tx.commit().await?;

    let permissions = match &parsed {
        Some(permissions) => sorted_names(permissions),
        None => role_grants(&state.pool, role.id).await?,
    };
    Ok(ApiResponse::success(RoleWithPermissions { role, permissions }))
}

/// DELETE /api/roles/:id - Grants and assignments cascade away with the role.
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    ctx.require(Permission::ROLES_DELETE)?;

    let deleted = sqlx::query("DELETE FROM roles WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(ctx.tenant_id)
        .execute(&state.pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Role not found"));
    }

    Ok(ApiResponse::success(json!({ "deleted": true, "id": id })))
}

/// POST /api/roles/:id/assign - Grant a role to a user. Assigning a role the
/// user already holds is a no-op, not an error.
pub async fn assign(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRole>,
) -> ApiResult<Value> {
    ctx.require(Permission::ROLES_ASSIGN)?;

    let user_id = payload
        .user_id
        .ok_or_else(|| ApiError::missing_fields(&["user_id"]))?;

    if !tenant_row_exists(&state.pool, "roles", id, ctx.tenant_id).await? {
        return Err(ApiError::not_found("Role not found"));
    }
    if !tenant_row_exists(&state.pool, "users", user_id, ctx.tenant_id).await? {
        return Err(ApiError::bad_request("User does not belong to this tenant"));
    }

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id, tenant_id)
         VALUES ($1, $2, $3)
         ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(id)
    .bind(ctx.tenant_id)
    .execute(&state.pool)
    .await?;

    tracing::info!(
        role_id = %id,
        user_id = %user_id,
        granted_by = %ctx.user.user_id,
        "role assigned"
    );

    Ok(ApiResponse::success(json!({
        "role_id": id,
        "user_id": user_id,
        "assigned": true
    })))
}

/// DELETE /api/roles/:id/assign/:user_id - Revoke a role from a user.
pub async fn unassign(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    ctx.require(Permission::ROLES_ASSIGN)?;

    let deleted = sqlx::query(
        "DELETE FROM user_roles WHERE tenant_id = $1 AND role_id = $2 AND user_id = $3",
    )
    .bind(ctx.tenant_id)
    .bind(id)
    .bind(user_id)
    .execute(&state.pool)
    .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Role assignment not found"));
    }

    tracing::info!(
        role_id = %id,
        user_id = %user_id,
        revoked_by = %ctx.user.user_id,
        "role revoked"
    );

    Ok(ApiResponse::success(json!({
        "role_id": id,
        "user_id": user_id,
        "assigned": false
    })))
}

/// GET /api/permissions - The full permission catalog, for role editors.
pub async fn catalog(Extension(ctx): Extension<RequestContext>) -> ApiResult<Value> {
    ctx.require(Permission::ROLES_READ)?;

    let names = sorted_names(&Permission::catalog());
    Ok(ApiResponse::success(json!({
        "count": names.len(),
        "permissions": names
    })))
}
