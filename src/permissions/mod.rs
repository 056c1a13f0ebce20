//! Permission vocabulary and evaluation.
//!
//! Permissions are `resource:action` pairs drawn from a closed catalog that
//! is compiled into the binary and seeded into the `permissions` table by a
//! migration. Roles reference catalog rows; a user's effective permission set
//! is the union across every role assigned to them within their tenant.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Students,
    Staff,
    Classes,
    Examinations,
    Invoices,
    Expenses,
    Messages,
    Announcements,
    Leave,
    Books,
    Hostels,
    Roles,
}

impl Resource {
    pub const ALL: [Resource; 12] = [
        Resource::Students,
        Resource::Staff,
        Resource::Classes,
        Resource::Examinations,
        Resource::Invoices,
        Resource::Expenses,
        Resource::Messages,
        Resource::Announcements,
        Resource::Leave,
        Resource::Books,
        Resource::Hostels,
        Resource::Roles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Students => "students",
            Resource::Staff => "staff",
            Resource::Classes => "classes",
            Resource::Examinations => "examinations",
            Resource::Invoices => "invoices",
            Resource::Expenses => "expenses",
            Resource::Messages => "messages",
            Resource::Announcements => "announcements",
            Resource::Leave => "leave",
            Resource::Books => "books",
            Resource::Hostels => "hostels",
            Resource::Roles => "roles",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    /// Resolve leave requests; distinct from plain `update`.
    Approve,
    /// Grant roles to users; distinct from editing the role itself.
    Assign,
}

impl Action {
    pub const CRUD: [Action; 4] = [Action::Read, Action::Create, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Approve => "approve",
            Action::Assign => "assign",
        }
    }
}

/// A single entry of the permission catalog, e.g. `students:read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Permission {
    pub resource: Resource,
    pub action: Action,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown permission: {0}")]
pub struct PermissionParseError(pub String);

impl Permission {
    pub const fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }

    pub fn name(&self) -> String {
        format!("{}:{}", self.resource.as_str(), self.action.as_str())
    }

    /// Every permission the API understands. The seed migration and the
    /// startup check both derive from this list.
    pub fn catalog() -> Vec<Permission> {
        let mut all = Vec::with_capacity(Resource::ALL.len() * Action::CRUD.len() + 2);
        for resource in Resource::ALL {
            for action in Action::CRUD {
                all.push(Permission::new(resource, action));
            }
        }
        all.push(Permission::LEAVE_APPROVE);
        all.push(Permission::ROLES_ASSIGN);
        all
    }
}

// Named constants for handler call sites.
impl Permission {
    pub const STUDENTS_READ: Permission = Permission::new(Resource::Students, Action::Read);
    pub const STUDENTS_CREATE: Permission = Permission::new(Resource::Students, Action::Create);
    pub const STUDENTS_UPDATE: Permission = Permission::new(Resource::Students, Action::Update);
    pub const STUDENTS_DELETE: Permission = Permission::new(Resource::Students, Action::Delete);

    pub const STAFF_READ: Permission = Permission::new(Resource::Staff, Action::Read);
    pub const STAFF_CREATE: Permission = Permission::new(Resource::Staff, Action::Create);
    pub const STAFF_UPDATE: Permission = Permission::new(Resource::Staff, Action::Update);
    pub const STAFF_DELETE: Permission = Permission::new(Resource::Staff, Action::Delete);

    pub const CLASSES_READ: Permission = Permission::new(Resource::Classes, Action::Read);
    pub const CLASSES_CREATE: Permission = Permission::new(Resource::Classes, Action::Create);
    pub const CLASSES_UPDATE: Permission = Permission::new(Resource::Classes, Action::Update);
    pub const CLASSES_DELETE: Permission = Permission::new(Resource::Classes, Action::Delete);

    pub const EXAMINATIONS_READ: Permission = Permission::new(Resource::Examinations, Action::Read);
    pub const EXAMINATIONS_CREATE: Permission =
        Permission::new(Resource::Examinations, Action::Create);
    pub const EXAMINATIONS_UPDATE: Permission =
        Permission::new(Resource::Examinations, Action::Update);
    pub const EXAMINATIONS_DELETE: Permission =
        Permission::new(Resource::Examinations, Action::Delete);

    pub const INVOICES_READ: Permission = Permission::new(Resource::Invoices, Action::Read);
    pub const INVOICES_CREATE: Permission = Permission::new(Resource::Invoices, Action::Create);
    pub const INVOICES_UPDATE: Permission = Permission::new(Resource::Invoices, Action::Update);
    pub const INVOICES_DELETE: Permission = Permission::new(Resource::Invoices, Action::Delete);

    pub const EXPENSES_READ: Permission = Permission::new(Resource::Expenses, Action::Read);
    pub const EXPENSES_CREATE: Permission = Permission::new(Resource::Expenses, Action::Create);
    pub const EXPENSES_UPDATE: Permission = Permission::new(Resource::Expenses, Action::Update);
    pub const EXPENSES_DELETE: Permission = Permission::new(Resource::Expenses, Action::Delete);

    pub const MESSAGES_READ: Permission = Permission::new(Resource::Messages, Action::Read);
    pub const MESSAGES_CREATE: Permission = Permission::new(Resource::Messages, Action::Create);
    pub const MESSAGES_UPDATE: Permission = Permission::new(Resource::Messages, Action::Update);
    pub const MESSAGES_DELETE: Permission = Permission::new(Resource::Messages, Action::Delete);

    pub const ANNOUNCEMENTS_READ: Permission =
        Permission::new(Resource::Announcements, Action::Read);
    pub const ANNOUNCEMENTS_CREATE: Permission =
        Permission::new(Resource::Announcements, Action::Create);
    pub const ANNOUNCEMENTS_UPDATE: Permission =
        Permission::new(Resource::Announcements, Action::Update);
    pub const ANNOUNCEMENTS_DELETE: Permission =
        Permission::new(Resource::Announcements, Action::Delete);

    pub const LEAVE_READ: Permission = Permission::new(Resource::Leave, Action::Read);
    pub const LEAVE_CREATE: Permission = Permission::new(Resource::Leave, Action::Create);
    pub const LEAVE_UPDATE: Permission = Permission::new(Resource::Leave, Action::Update);
    pub const LEAVE_DELETE: Permission = Permission::new(Resource::Leave, Action::Delete);
    pub const LEAVE_APPROVE: Permission = Permission::new(Resource::Leave, Action::Approve);

    pub const BOOKS_READ: Permission = Permission::new(Resource::Books, Action::Read);
    pub const BOOKS_CREATE: Permission = Permission::new(Resource::Books, Action::Create);
    pub const BOOKS_UPDATE: Permission = Permission::new(Resource::Books, Action::Update);
    pub const BOOKS_DELETE: Permission = Permission::new(Resource::Books, Action::Delete);

    pub const HOSTELS_READ: Permission = Permission::new(Resource::Hostels, Action::Read);
    pub const HOSTELS_CREATE: Permission = Permission::new(Resource::Hostels, Action::Create);
    pub const HOSTELS_UPDATE: Permission = Permission::new(Resource::Hostels, Action::Update);
    pub const HOSTELS_DELETE: Permission = Permission::new(Resource::Hostels, Action::Delete);

    pub const ROLES_READ: Permission = Permission::new(Resource::Roles, Action::Read);
    pub const ROLES_CREATE: Permission = Permission::new(Resource::Roles, Action::Create);
    pub const ROLES_UPDATE: Permission = Permission::new(Resource::Roles, Action::Update);
    pub const ROLES_DELETE: Permission = Permission::new(Resource::Roles, Action::Delete);
    pub const ROLES_ASSIGN: Permission = Permission::new(Resource::Roles, Action::Assign);
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource.as_str(), self.action.as_str())
    }
}

impl FromStr for Permission {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, action) = s
            .split_once(':')
            .ok_or_else(|| PermissionParseError(s.to_string()))?;

        let resource = Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == resource)
            .ok_or_else(|| PermissionParseError(s.to_string()))?;

        let permission = match action {
            "read" => Permission::new(resource, Action::Read),
            "create" => Permission::new(resource, Action::Create),
            "update" => Permission::new(resource, Action::Update),
            "delete" => Permission::new(resource, Action::Delete),
            "approve" if resource == Resource::Leave => Permission::LEAVE_APPROVE,
            "assign" if resource == Resource::Roles => Permission::ROLES_ASSIGN,
            _ => return Err(PermissionParseError(s.to_string())),
        };

        Ok(permission)
    }
}

/// Effective permissions of one user within one tenant.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    granted: HashSet<Permission>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from permission names as stored in the database. Names outside
    /// the catalog are skipped with a warning rather than failing the
    /// request; startup verification is the place that hard-fails on drift.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut granted = HashSet::new();
        for name in names {
            match name.as_ref().parse::<Permission>() {
                Ok(permission) => {
                    granted.insert(permission);
                }
                Err(_) => {
                    tracing::warn!("ignoring unknown permission name: {}", name.as_ref());
                }
            }
        }
        Self { granted }
    }

    pub fn insert(&mut self, permission: Permission) {
        self.granted.insert(permission);
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }

    /// Any-of semantics: true when at least one of `required` is granted.
    pub fn has_any(&self, required: &[Permission]) -> bool {
        required.iter().any(|p| self.granted.contains(p))
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.granted.len()
    }

    /// Sorted names, for stable API responses.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.granted.iter().map(Permission::name).collect();
        names.sort();
        names
    }
}

/// Load the effective permission set for a user. `user_roles.tenant_id` keeps
/// this a single tenant-scoped join; roles from other tenants can never leak
/// in even if a user id were somehow reused.
pub async fn load_for_user(
    pool: &PgPool,
    user_id: Uuid,
    tenant_id: Uuid,
) -> Result<PermissionSet, sqlx::Error> {
    let names: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT p.name
         FROM permissions p
         JOIN role_permissions rp ON rp.permission_id = p.id
         JOIN user_roles ur ON ur.role_id = rp.role_id
         WHERE ur.user_id = $1 AND ur.tenant_id = $2",
    )
    .bind(user_id)
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(PermissionSet::from_names(names.into_iter().map(|(n,)| n)))
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error while verifying permission catalog: {0}")]
    Database(#[from] sqlx::Error),
    #[error("permission table is missing catalog entries: {0}")]
    MissingEntries(String),
}

/// Compare the seeded `permissions` table against the compiled-in catalog.
/// Called once at startup; a missing entry aborts boot, an unknown extra row
/// is only warned about so that rolling deploys can add entries first.
pub async fn verify_catalog(pool: &PgPool) -> Result<(), CatalogError> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM permissions")
        .fetch_all(pool)
        .await?;

    let seeded: HashSet<String> = rows.into_iter().map(|(n,)| n).collect();

    let missing: Vec<String> = Permission::catalog()
        .iter()
        .map(Permission::name)
        .filter(|name| !seeded.contains(name))
        .collect();

    for name in &seeded {
        if name.parse::<Permission>().is_err() {
            tracing::warn!("permissions table contains a name outside the catalog: {}", name);
        }
    }

    if missing.is_empty() {
        tracing::info!(count = seeded.len(), "permission catalog verified");
        Ok(())
    } else {
        Err(CatalogError::MissingEntries(missing.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_size_and_uniqueness() {
        let catalog = Permission::catalog();
        assert_eq!(catalog.len(), 50);

        let unique: HashSet<_> = catalog.iter().collect();
        assert_eq!(unique.len(), catalog.len());
    }

    #[test]
    fn test_every_catalog_entry_round_trips() {
        for permission in Permission::catalog() {
            let name = permission.name();
            let parsed: Permission = name.parse().expect("catalog names must parse");
            assert_eq!(parsed, permission);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        assert!("students".parse::<Permission>().is_err());
        assert!("students:fly".parse::<Permission>().is_err());
        assert!("grades:read".parse::<Permission>().is_err());
        assert!("books:approve".parse::<Permission>().is_err());
        assert!("".parse::<Permission>().is_err());
    }

    #[test]
    fn test_approve_and_assign_are_restricted() {
        assert_eq!("leave:approve".parse::<Permission>(), Ok(Permission::LEAVE_APPROVE));
        assert_eq!("roles:assign".parse::<Permission>(), Ok(Permission::ROLES_ASSIGN));
        assert!("students:approve".parse::<Permission>().is_err());
        assert!("leave:assign".parse::<Permission>().is_err());
    }

    #[test]
    fn test_has_any_union_semantics() {
        let set = PermissionSet::from_names(["leave:read", "leave:approve"]);
        assert!(set.has(Permission::LEAVE_READ));
        assert!(set.has_any(&[Permission::LEAVE_UPDATE, Permission::LEAVE_APPROVE]));
        assert!(!set.has_any(&[Permission::STUDENTS_READ, Permission::STAFF_READ]));
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        let set = PermissionSet::from_names(["students:read", "definitely:not-real"]);
        assert_eq!(set.len(), 1);
        assert!(set.has(Permission::STUDENTS_READ));
    }

    #[test]
    fn test_names_are_sorted() {
        let set = PermissionSet::from_names(["staff:read", "books:read", "classes:read"]);
        assert_eq!(set.names(), vec!["books:read", "classes:read", "staff:read"]);
    }
}
