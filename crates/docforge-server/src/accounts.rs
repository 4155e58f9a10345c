//! Tenant/User/Project/ProjectMember persistence. Not one of the lower
//! numbered components; it lives here because the server is the only
//! layer that needs this particular entity shape, following the same
//! `Arc<Mutex<Connection>>` SQLite pattern as the document and export
//! repositories it sits alongside.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use docforge_types::permissions::Role;
use docforge_types::tenant::{Project, ProjectMember, ProjectStatus, Tenant, TenantLimits, User};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Clone)]
pub struct AccountRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AccountRepository {
    pub async fn new(db_path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(std::time::Duration::from_secs(10))?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.init_schema().await?;
        Ok(repo)
    }

    async fn init_schema(&self) -> Result<(), AppError> {
        let conn = self.conn.lock().await;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tenants (
                id TEXT PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                max_projects INTEGER,
                max_storage_mb INTEGER
            );
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                email TEXT NOT NULL,
                username TEXT NOT NULL,
                password_hash TEXT,
                oauth_provider TEXT,
                oauth_subject TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_superuser INTEGER NOT NULL DEFAULT 0,
                last_login_at TEXT
            );
            CREATE UNIQUE INDEX IF NOT EXISTS uq_users_tenant_email ON users(tenant_id, email);
            CREATE UNIQUE INDEX IF NOT EXISTS uq_users_tenant_username ON users(tenant_id, username);
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                is_deleted INTEGER NOT NULL DEFAULT 0
            );
            CREATE UNIQUE INDEX IF NOT EXISTS uq_projects_tenant_name
                ON projects(tenant_id, name) WHERE is_deleted = 0;
            CREATE TABLE IF NOT EXISTS project_members (
                tenant_id TEXT NOT NULL,
                project_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                role_id TEXT NOT NULL,
                invited_by_id TEXT,
                joined_at TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                PRIMARY KEY (tenant_id, project_id, user_id)
            );",
        )?;
        Ok(())
    }

    pub async fn get_or_create_tenant(&self, slug: &str, name: &str) -> Result<Tenant, AppError> {
        let conn = self.conn.lock().await;
        if let Some(tenant) = conn
            .query_row("SELECT * FROM tenants WHERE slug = ?1", params![slug], row_to_tenant)
            .optional()?
        {
            return Ok(tenant);
        }
        let tenant = Tenant {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: name.to_string(),
            is_active: true,
            limits: TenantLimits::default(),
        };
        conn.execute(
            "INSERT INTO tenants (id, slug, name, is_active, max_projects, max_storage_mb)
             VALUES (?1, ?2, ?3, 1, NULL, NULL)",
            params![tenant.id.to_string(), tenant.slug, tenant.name],
        )?;
        Ok(tenant)
    }

    pub async fn create_user(
        &self,
        tenant_id: Uuid,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let user = User {
            id: Uuid::new_v4(),
            tenant_id,
            email: email.to_string(),
            username: username.to_string(),
            password_hash: Some(password_hash.to_string()),
            oauth_provider: None,
            oauth_subject: None,
            is_active: true,
            is_superuser: false,
            last_login_at: None,
        };
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO users (id, tenant_id, email, username, password_hash, oauth_provider, oauth_subject, is_active, is_superuser, last_login_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, NULL, 1, 0, NULL)",
            params![
                user.id.to_string(),
                user.tenant_id.to_string(),
                user.email,
                user.username,
                user.password_hash,
            ],
        )
        .map_err(|e| classify_unique_violation(e, "users"))?;
        Ok(user)
    }

    pub async fn get_user_by_email(&self, tenant_id: Uuid, email: &str) -> Result<Option<User>, AppError> {
        let conn = self.conn.lock().await;
        Ok(conn
            .query_row(
                "SELECT * FROM users WHERE tenant_id = ?1 AND email = ?2",
                params![tenant_id.to_string(), email],
                row_to_user,
            )
            .optional()?)
    }

    /// Login has no tenant context to scope by, unlike every other lookup
    /// here. Email is only unique per-tenant, so a shared address across
    /// tenants picks whichever row comes back first; ordering by id keeps
    /// that choice at least stable across calls.
    pub async fn get_user_by_email_any_tenant(&self, email: &str) -> Result<Option<User>, AppError> {
        let conn = self.conn.lock().await;
        Ok(conn
            .query_row(
                "SELECT * FROM users WHERE email = ?1 ORDER BY id LIMIT 1",
                params![email],
                row_to_user,
            )
            .optional()?)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let conn = self.conn.lock().await;
        Ok(conn
            .query_row("SELECT * FROM users WHERE id = ?1", params![id.to_string()], row_to_user)
            .optional()?)
    }

    pub async fn touch_last_login(&self, id: Uuid) -> Result<(), AppError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(())
    }

    pub async fn create_project(
        &self,
        tenant_id: Uuid,
        owner_id: Uuid,
        name: &str,
        description: Option<String>,
    ) -> Result<Project, AppError> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            tenant_id,
            owner_id,
            name: name.to_string(),
            description,
            status: ProjectStatus::Draft,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        };
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO projects (id, tenant_id, owner_id, name, description, status, created_at, updated_at, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
            params![
                project.id.to_string(),
                project.tenant_id.to_string(),
                project.owner_id.to_string(),
                project.name,
                project.description,
                project.status.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| classify_unique_violation(e, "projects"))?;
        drop(conn);
        self.add_member(tenant_id, project.id, owner_id, Role::Owner, None).await?;
        Ok(project)
    }

    pub async fn get_project(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Project>, AppError> {
        let conn = self.conn.lock().await;
        Ok(conn
            .query_row(
                "SELECT * FROM projects WHERE id = ?1 AND tenant_id = ?2 AND is_deleted = 0",
                params![id.to_string(), tenant_id.to_string()],
                row_to_project,
            )
            .optional()?)
    }

    pub async fn list_projects(&self, tenant_id: Uuid) -> Result<Vec<Project>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT * FROM projects WHERE tenant_id = ?1 AND is_deleted = 0 ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map(params![tenant_id.to_string()], row_to_project)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub async fn update_project(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
        status: Option<ProjectStatus>,
    ) -> Result<Project, AppError> {
        let conn = self.conn.lock().await;
        let mut current = conn
            .query_row(
                "SELECT * FROM projects WHERE id = ?1 AND tenant_id = ?2 AND is_deleted = 0",
                params![id.to_string(), tenant_id.to_string()],
                row_to_project,
            )
            .optional()?
            .ok_or_else(|| AppError::NotFound("project not found".to_string()))?;

        if let Some(name) = name {
            current.name = name;
        }
        if description.is_some() {
            current.description = description;
        }
        if let Some(status) = status {
            current.status = status;
        }
        current.updated_at = Utc::now();

        conn.execute(
            "UPDATE projects SET name = ?1, description = ?2, status = ?3, updated_at = ?4
             WHERE id = ?5 AND tenant_id = ?6",
            params![
                current.name,
                current.description,
                current.status.as_str(),
                current.updated_at.to_rfc3339(),
                id.to_string(),
                tenant_id.to_string(),
            ],
        )
        .map_err(|e| classify_unique_violation(e, "projects"))?;
        Ok(current)
    }

    pub async fn soft_delete_project(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let conn = self.conn.lock().await;
        let updated = conn.execute(
            "UPDATE projects SET is_deleted = 1, updated_at = ?1 WHERE id = ?2 AND tenant_id = ?3 AND is_deleted = 0",
            params![Utc::now().to_rfc3339(), id.to_string(), tenant_id.to_string()],
        )?;
        Ok(updated > 0)
    }

    pub async fn add_member(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        user_id: Uuid,
        role: Role,
        invited_by_id: Option<Uuid>,
    ) -> Result<ProjectMember, AppError> {
        let member = ProjectMember {
            tenant_id,
            project_id,
            user_id,
            role_id: role,
            invited_by_id,
            joined_at: Utc::now(),
            is_active: true,
        };
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO project_members (tenant_id, project_id, user_id, role_id, invited_by_id, joined_at, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
             ON CONFLICT(tenant_id, project_id, user_id) DO UPDATE SET role_id = excluded.role_id, is_active = 1",
            params![
                tenant_id.to_string(),
                project_id.to_string(),
                user_id.to_string(),
                role_str(role),
                invited_by_id.map(|u| u.to_string()),
                member.joined_at.to_rfc3339(),
            ],
        )?;
        Ok(member)
    }

    /// Cross-tenant lookups always come back empty: both the project and
    /// the membership are scoped to `tenant_id`.
    pub async fn get_member_role(&self, tenant_id: Uuid, project_id: Uuid, user_id: Uuid) -> Result<Option<Role>, AppError> {
        let conn = self.conn.lock().await;
        let role: Option<String> = conn
            .query_row(
                "SELECT role_id FROM project_members
                    WHERE tenant_id = ?1 AND project_id = ?2 AND user_id = ?3 AND is_active = 1",
                params![tenant_id.to_string(), project_id.to_string(), user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(role.map(|r| parse_role(&r)))
    }
}

fn classify_unique_violation(err: rusqlite::Error, table: &str) -> AppError {
    if let rusqlite::Error::SqliteFailure(ref sqlite_err, _) = err {
        if sqlite_err.code == rusqlite::ErrorCode::ConstraintViolation {
            return AppError::Conflict(format!("{table} constraint violated"));
        }
    }
    AppError::Database(err)
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::Owner => "OWNER",
        Role::Editor => "EDITOR",
        Role::Viewer => "VIEWER",
    }
}

fn parse_role(s: &str) -> Role {
    match s {
        "OWNER" => Role::Owner,
        "EDITOR" => Role::Editor,
        _ => Role::Viewer,
    }
}

fn parse_status(s: &str) -> ProjectStatus {
    match s {
        "IN_PROGRESS" => ProjectStatus::InProgress,
        "COMPLETED" => ProjectStatus::Completed,
        "ARCHIVED" => ProjectStatus::Archived,
        _ => ProjectStatus::Draft,
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_tenant(row: &Row) -> rusqlite::Result<Tenant> {
    let id: String = row.get("id")?;
    let max_projects: Option<i64> = row.get("max_projects")?;
    let max_storage_mb: Option<i64> = row.get("max_storage_mb")?;
    let is_active: i64 = row.get("is_active")?;
    Ok(Tenant {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        slug: row.get("slug")?,
        name: row.get("name")?,
        is_active: is_active != 0,
        limits: TenantLimits {
            max_projects,
            max_storage_mb,
        },
    })
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let id: String = row.get("id")?;
    let tenant_id: String = row.get("tenant_id")?;
    let is_active: i64 = row.get("is_active")?;
    let is_superuser: i64 = row.get("is_superuser")?;
    let last_login_at: Option<String> = row.get("last_login_at")?;
    Ok(User {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        tenant_id: Uuid::parse_str(&tenant_id).unwrap_or_default(),
        email: row.get("email")?,
        username: row.get("username")?,
        password_hash: row.get("password_hash")?,
        oauth_provider: row.get("oauth_provider")?,
        oauth_subject: row.get("oauth_subject")?,
        is_active: is_active != 0,
        is_superuser: is_superuser != 0,
        last_login_at: last_login_at.map(|s| parse_datetime(&s)),
    })
}

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    let id: String = row.get("id")?;
    let tenant_id: String = row.get("tenant_id")?;
    let owner_id: String = row.get("owner_id")?;
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let is_deleted: i64 = row.get("is_deleted")?;
    Ok(Project {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        tenant_id: Uuid::parse_str(&tenant_id).unwrap_or_default(),
        owner_id: Uuid::parse_str(&owner_id).unwrap_or_default(),
        name: row.get("name")?,
        description: row.get("description")?,
        status: parse_status(&status),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
        is_deleted: is_deleted != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("docforge-server-accounts-{name}-{}.sqlite3", Uuid::new_v4()));
        path
    }

    #[tokio::test]
    async fn get_or_create_tenant_is_idempotent_by_slug() {
        let path = temp_db_path("tenant");
        let repo = AccountRepository::new(&path).await.unwrap();
        let first = repo.get_or_create_tenant("acme", "Acme Inc").await.unwrap();
        let second = repo.get_or_create_tenant("acme", "Acme Inc (renamed elsewhere)").await.unwrap();
        assert_eq!(first.id, second.id);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn duplicate_email_within_a_tenant_is_rejected() {
        let path = temp_db_path("dup-email");
        let repo = AccountRepository::new(&path).await.unwrap();
        let tenant = repo.get_or_create_tenant("acme", "Acme").await.unwrap();
        repo.create_user(tenant.id, "a@acme.test", "alice", "hash").await.unwrap();
        let err = repo.create_user(tenant.id, "a@acme.test", "alice2", "hash").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn same_email_is_allowed_in_a_different_tenant() {
        let path = temp_db_path("cross-tenant-email");
        let repo = AccountRepository::new(&path).await.unwrap();
        let tenant_a = repo.get_or_create_tenant("acme", "Acme").await.unwrap();
        let tenant_b = repo.get_or_create_tenant("globex", "Globex").await.unwrap();
        repo.create_user(tenant_a.id, "a@shared.test", "alice", "hash").await.unwrap();
        repo.create_user(tenant_b.id, "a@shared.test", "alice", "hash").await.unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn create_project_seeds_owner_membership() {
        let path = temp_db_path("project-owner");
        let repo = AccountRepository::new(&path).await.unwrap();
        let tenant = repo.get_or_create_tenant("acme", "Acme").await.unwrap();
        let owner = repo.create_user(tenant.id, "o@acme.test", "owner", "hash").await.unwrap();
        let project = repo.create_project(tenant.id, owner.id, "Launch Plan", None).await.unwrap();
        let role = repo.get_member_role(tenant.id, project.id, owner.id).await.unwrap();
        assert_eq!(role, Some(Role::Owner));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn duplicate_project_name_within_tenant_is_rejected() {
        let path = temp_db_path("dup-project-name");
        let repo = AccountRepository::new(&path).await.unwrap();
        let tenant = repo.get_or_create_tenant("acme", "Acme").await.unwrap();
        let owner = repo.create_user(tenant.id, "o@acme.test", "owner", "hash").await.unwrap();
        repo.create_project(tenant.id, owner.id, "Launch Plan", None).await.unwrap();
        let err = repo
            .create_project(tenant.id, owner.id, "Launch Plan", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn soft_deleted_project_is_excluded_from_get_and_list() {
        let path = temp_db_path("soft-delete-project");
        let repo = AccountRepository::new(&path).await.unwrap();
        let tenant = repo.get_or_create_tenant("acme", "Acme").await.unwrap();
        let owner = repo.create_user(tenant.id, "o@acme.test", "owner", "hash").await.unwrap();
        let project = repo.create_project(tenant.id, owner.id, "Archive Me", None).await.unwrap();
        assert!(repo.soft_delete_project(tenant.id, project.id).await.unwrap());
        assert!(repo.get_project(tenant.id, project.id).await.unwrap().is_none());
        assert!(repo.list_projects(tenant.id).await.unwrap().is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn cross_tenant_project_lookup_returns_none() {
        let path = temp_db_path("cross-tenant-project");
        let repo = AccountRepository::new(&path).await.unwrap();
        let tenant_a = repo.get_or_create_tenant("acme", "Acme").await.unwrap();
        let tenant_b = repo.get_or_create_tenant("globex", "Globex").await.unwrap();
        let owner = repo.create_user(tenant_a.id, "o@acme.test", "owner", "hash").await.unwrap();
        let project = repo.create_project(tenant_a.id, owner.id, "Internal", None).await.unwrap();
        assert!(repo.get_project(tenant_b.id, project.id).await.unwrap().is_none());
        let _ = std::fs::remove_file(&path);
    }
}
