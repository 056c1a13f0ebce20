use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::non_blank;
use crate::permissions::Permission;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role plus its granted permission names, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRole {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<Permission>,
}

impl CreateRole {
    pub fn validate(self) -> Result<NewRole, ApiError> {
        let name = non_blank(self.name).ok_or_else(|| ApiError::missing_fields(&["name"]))?;
        let permissions = parse_permission_names(&self.permissions)?;
        Ok(NewRole {
            name,
            description: non_blank(self.description),
            permissions,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub description: Option<String>,
    /// When present, replaces the full grant list.
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRole {
    pub user_id: Option<Uuid>,
}

/// Parse permission names, rejecting the whole request if any name falls
/// outside the catalog.
pub fn parse_permission_names(names: &[String]) -> Result<Vec<Permission>, ApiError> {
    let mut parsed = Vec::with_capacity(names.len());
    let mut invalid = Vec::new();
    for name in names {
        match name.parse::<Permission>() {
            Ok(p) => {
                if !parsed.contains(&p) {
                    parsed.push(p);
                }
            }
            Err(_) => invalid.push(name.as_str()),
        }
    }
    if invalid.is_empty() {
        Ok(parsed)
    } else {
        Err(ApiError::bad_request(format!(
            "Unknown permissions: {}",
            invalid.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_role_requires_name() {
        let payload = CreateRole {
            name: Some("  ".to_string()),
            description: None,
            permissions: vec![],
        };
        let err = payload.validate().unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_create_role_parses_and_dedupes_permissions() {
        let payload = CreateRole {
            name: Some("Registrar".to_string()),
            description: None,
            permissions: vec![
                "students:read".to_string(),
                "students:read".to_string(),
                "students:create".to_string(),
            ],
        };
        let new_role = payload.validate().unwrap();
        assert_eq!(
            new_role.permissions,
            vec![Permission::STUDENTS_READ, Permission::STUDENTS_CREATE]
        );
    }

    #[test]
    fn test_unknown_permission_names_are_rejected_together() {
        let err = parse_permission_names(&[
            "students:read".to_string(),
            "spaceships:fly".to_string(),
            "grades:read".to_string(),
        ])
        .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.message().contains("spaceships:fly"));
        assert!(err.message().contains("grades:read"));
    }
}
