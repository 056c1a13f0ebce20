use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::permissions::{self, Permission, PermissionSet};
use crate::state::AppState;

/// Optional client hint. Never trusted as a tenant source; only checked for
/// disagreement with the verified claims.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Per-request context assembled after authentication: the verified user,
/// their tenant, and their effective permissions for this tenant.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub user: AuthUser,
    pub tenant_id: Uuid,
    pub permissions: PermissionSet,
}

impl RequestContext {
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.permissions.has(permission) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user.user_id,
                tenant_id = %self.tenant_id,
                permission = %permission,
                "permission denied"
            );
            Err(ApiError::forbidden(format!(
                "Missing required permission: {}",
                permission
            )))
        }
    }

    /// Any-of check: passes when at least one listed permission is granted.
    pub fn require_any(&self, required: &[Permission]) -> Result<(), ApiError> {
        if self.permissions.has_any(required) {
            Ok(())
        } else {
            let names: Vec<String> = required.iter().map(Permission::name).collect();
            tracing::warn!(
                user_id = %self.user.user_id,
                tenant_id = %self.tenant_id,
                permissions = %names.join(", "),
                "permission denied"
            );
            Err(ApiError::forbidden(format!(
                "Requires one of: {}",
                names.join(", ")
            )))
        }
    }
}

/// Middleware that resolves the tenant for an authenticated request.
///
/// Tenant identity comes from the verified claims alone. The optional
/// x-tenant-id header is compared against the claims and the request is
/// refused on mismatch; the tenant must exist and be active, the user must
/// still be active, and the user's permission set is loaded here so handlers
/// can evaluate access without further queries.
pub async fn tenant_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required before tenant resolution"))?;

    if let Some(header) = request.headers().get(TENANT_HEADER) {
        let header_str = header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid x-tenant-id header"))?;
        let hinted: Uuid = header_str
            .parse()
            .map_err(|_| ApiError::bad_request("Invalid x-tenant-id header"))?;
        if hinted != auth_user.tenant_id {
            tracing::warn!(
                user_id = %auth_user.user_id,
                claimed = %auth_user.tenant_id,
                hinted = %hinted,
                "x-tenant-id header disagrees with token claims"
            );
            return Err(ApiError::forbidden(
                "x-tenant-id header does not match the authenticated tenant",
            ));
        }
    }

    let tenant_status: Option<(String,)> =
        sqlx::query_as("SELECT status FROM tenants WHERE id = $1")
            .bind(auth_user.tenant_id)
            .fetch_optional(&state.pool)
            .await?;

    match tenant_status {
        Some((status,)) if status == "active" => {}
        Some(_) | None => {
            tracing::warn!(tenant_id = %auth_user.tenant_id, "tenant not active or unknown");
            return Err(ApiError::forbidden("Tenant is not active or does not exist"));
        }
    }

    let user_active: Option<(bool,)> =
        sqlx::query_as("SELECT is_active FROM users WHERE id = $1 AND tenant_id = $2")
            .bind(auth_user.user_id)
            .bind(auth_user.tenant_id)
            .fetch_optional(&state.pool)
            .await?;

    match user_active {
        Some((true,)) => {}
        Some((false,)) => return Err(ApiError::forbidden("User account is disabled")),
        None => return Err(ApiError::unauthorized("User account no longer exists")),
    }

    let permissions =
        permissions::load_for_user(&state.pool, auth_user.user_id, auth_user.tenant_id).await?;

    let context = RequestContext {
        tenant_id: auth_user.tenant_id,
        user: auth_user,
        permissions,
    };
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with(names: &[&str]) -> RequestContext {
        let tenant_id = Uuid::new_v4();
        RequestContext {
            user: AuthUser {
                user_id: Uuid::new_v4(),
                tenant_id,
                email: "head@school.test".to_string(),
            },
            tenant_id,
            permissions: PermissionSet::from_names(names.iter().copied()),
        }
    }

    #[test]
    fn test_require_passes_when_granted() {
        let ctx = context_with(&["students:read"]);
        assert!(ctx.require(Permission::STUDENTS_READ).is_ok());
    }

    #[test]
    fn test_require_denies_with_403() {
        let ctx = context_with(&["students:read"]);
        let err = ctx.require(Permission::STUDENTS_DELETE).unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_require_any_passes_on_single_match() {
        let ctx = context_with(&["leave:approve"]);
        assert!(ctx
            .require_any(&[Permission::LEAVE_READ, Permission::LEAVE_APPROVE])
            .is_ok());
    }

    #[test]
    fn test_require_any_denies_when_none_match() {
        let ctx = context_with(&["books:read"]);
        let err = ctx
            .require_any(&[Permission::LEAVE_READ, Permission::LEAVE_APPROVE])
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}
