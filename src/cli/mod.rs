//! Operational commands for the `campusctl` binary: migrations, catalog
//! verification, and first-tenant bootstrap. These talk to the database
//! directly rather than going through the HTTP API, so they work before any
//! user or role exists.

use clap::{Parser, Subcommand};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password;
use crate::database;
use crate::permissions::{self, Permission};

#[derive(Parser)]
#[command(name = "campusctl")]
#[command(about = "Campus API operations: migrations, catalog checks, tenant bootstrap")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Compare the permissions table against the compiled-in catalog")]
    VerifyPermissions,

    #[command(about = "Create a tenant, its starter roles, and the first administrator")]
    Bootstrap {
        #[arg(long, help = "Tenant name (unique, used at login)")]
        tenant: String,

        #[arg(long, help = "Human-readable tenant name; defaults to the tenant name")]
        display_name: Option<String>,

        #[arg(long, help = "Email address of the first administrator")]
        email: String,

        #[arg(long, help = "Administrator password; generated and printed when omitted")]
        password: Option<String>,

        #[arg(long, help = "Full name of the administrator")]
        full_name: Option<String>,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let pool = database::connect().await?;

    match cli.command {
        Commands::Migrate => {
            database::run_migrations(&pool).await?;
            println!("migrations applied");
            Ok(())
        }
        Commands::VerifyPermissions => {
            permissions::verify_catalog(&pool).await?;
            println!(
                "permission catalog matches ({} entries)",
                Permission::catalog().len()
            );
            Ok(())
        }
        Commands::Bootstrap {
            tenant,
            display_name,
            email,
            password,
            full_name,
        } => {
            bootstrap(
                &pool,
                BootstrapArgs {
                    tenant,
                    display_name,
                    email,
                    password,
                    full_name,
                },
            )
            .await
        }
    }
}

struct BootstrapArgs {
    tenant: String,
    display_name: Option<String>,
    email: String,
    password: Option<String>,
    full_name: Option<String>,
}

/// Create a tenant, an Administrator role holding the full catalog, a Teacher
/// role with day-to-day grants, and the first administrator, all in one
/// transaction.
async fn bootstrap(pool: &PgPool, args: BootstrapArgs) -> anyhow::Result<()> {
    permissions::verify_catalog(pool)
        .await
        .map_err(|e| anyhow::anyhow!("{}; run `campusctl migrate` first", e))?;

    let generated = args.password.is_none();
    let password = args
        .password
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let password_hash = password::hash_password(&password)?;

    let mut tx = pool.begin().await?;

    let tenant_id: Uuid =
        sqlx::query_scalar("INSERT INTO tenants (name, display_name) VALUES ($1, $2) RETURNING id")
            .bind(&args.tenant)
            .bind(args.display_name.as_deref().unwrap_or(&args.tenant))
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db)
                    if db.kind() == sqlx::error::ErrorKind::UniqueViolation =>
                {
                    anyhow::anyhow!("tenant '{}' already exists", args.tenant)
                }
                _ => anyhow::Error::from(e),
            })?;

    let admin_role_id = create_role(
        &mut tx,
        tenant_id,
        "Administrator",
        "Full access to every resource",
        &Permission::catalog(),
    )
    .await?;

    create_role(
        &mut tx,
        tenant_id,
        "Teacher",
        "Day-to-day classroom access",
        &teacher_grants(),
    )
    .await?;

    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (tenant_id, email, password_hash, full_name)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(tenant_id)
    .bind(&args.email)
    .bind(&password_hash)
    .bind(args.full_name.as_deref().unwrap_or("Administrator"))
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO user_roles (user_id, role_id, tenant_id) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(admin_role_id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    println!("tenant:   {} ({})", args.tenant, tenant_id);
    println!("admin:    {} ({})", args.email, user_id);
    if generated {
        println!("password: {}  (generated; rotate after first login)", password);
    }

    Ok(())
}

async fn create_role(
    tx: &mut sqlx::PgConnection,
    tenant_id: Uuid,
    name: &str,
    description: &str,
    grants: &[Permission],
) -> anyhow::Result<Uuid> {
    let role_id: Uuid = sqlx::query_scalar(
        "INSERT INTO roles (tenant_id, name, description) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(tenant_id)
    .bind(name)
    .bind(description)
    .fetch_one(&mut *tx)
    .await?;

    let names: Vec<String> = grants.iter().map(Permission::name).collect();
    sqlx::query(
        "INSERT INTO role_permissions (role_id, permission_id)
         SELECT $1, id FROM permissions WHERE name = ANY($2)",
    )
    .bind(role_id)
    .bind(&names)
    .execute(&mut *tx)
    .await?;

    Ok(role_id)
}

fn teacher_grants() -> Vec<Permission> {
    vec![
        Permission::STUDENTS_READ,
        Permission::CLASSES_READ,
        Permission::EXAMINATIONS_READ,
        Permission::EXAMINATIONS_CREATE,
        Permission::EXAMINATIONS_UPDATE,
        Permission::MESSAGES_READ,
        Permission::MESSAGES_CREATE,
        Permission::MESSAGES_UPDATE,
        Permission::ANNOUNCEMENTS_READ,
        Permission::LEAVE_READ,
        Permission::LEAVE_CREATE,
        Permission::LEAVE_UPDATE,
        Permission::BOOKS_READ,
        Permission::HOSTELS_READ,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teacher_grants_stay_inside_catalog() {
        let catalog = Permission::catalog();
        for grant in teacher_grants() {
            assert!(catalog.contains(&grant), "{} is not in the catalog", grant);
        }
    }

    #[test]
    fn test_teacher_role_cannot_administer() {
        let grants = teacher_grants();
        assert!(!grants.contains(&Permission::ROLES_ASSIGN));
        assert!(!grants.contains(&Permission::LEAVE_APPROVE));
        assert!(!grants.contains(&Permission::STUDENTS_DELETE));
    }
}
