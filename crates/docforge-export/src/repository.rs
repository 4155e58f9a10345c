use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;
use uuid::Uuid;

use docforge_types::export::{Export, ExportManifest, ExportStatus};

use crate::error::{ExportError, ExportResult};

const MIN_EXPIRY_HOURS: i64 = 1;
const MAX_EXPIRY_HOURS: i64 = 168;

#[derive(Clone)]
pub struct ExportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ExportRepository {
    pub fn new(db_path: &Path) -> ExportResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(std::time::Duration::from_secs(10))?;
        conn.execute("PRAGMA journal_mode = WAL", [])?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> ExportResult<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS exports (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                project_id TEXT NOT NULL,
                requested_by TEXT NOT NULL,
                status TEXT NOT NULL,
                file_path TEXT,
                manifest TEXT NOT NULL,
                error TEXT,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_exports_project ON exports(tenant_id, project_id);
            CREATE INDEX IF NOT EXISTS idx_exports_expiry ON exports(status, expires_at);",
        )?;
        Ok(())
    }

    pub async fn create(&self, tenant_id: Uuid, project_id: Uuid, requested_by: Uuid, expires_in_hours: i64) -> ExportResult<Export> {
        if !(MIN_EXPIRY_HOURS..=MAX_EXPIRY_HOURS).contains(&expires_in_hours) {
            return Err(ExportError::InvalidExpiry(expires_in_hours));
        }
        let now = Utc::now();
        let export = Export {
            id: Uuid::new_v4(),
            tenant_id,
            project_id,
            requested_by,
            status: ExportStatus::Pending,
            file_path: None,
            manifest: ExportManifest {
                project_id,
                created_at: None,
                documents: Vec::new(),
            },
            error: None,
            expires_at: now + Duration::hours(expires_in_hours),
            created_at: now,
        };

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO exports (id, tenant_id, project_id, requested_by, status, file_path, manifest, error, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, NULL, ?7, ?8)",
            params![
                export.id.to_string(),
                export.tenant_id.to_string(),
                export.project_id.to_string(),
                export.requested_by.to_string(),
                status_str(ExportStatus::Pending),
                serde_json::to_string(&export.manifest)?,
                export.expires_at.to_rfc3339(),
                export.created_at.to_rfc3339(),
            ],
        )?;
        Ok(export)
    }

    pub async fn get(&self, id: Uuid) -> ExportResult<Export> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT * FROM exports WHERE id = ?1", params![id.to_string()], row_to_export)
            .optional()?
            .ok_or_else(|| ExportError::NotFound(id.to_string()))
    }

    pub async fn mark_generating(&self, id: Uuid) -> ExportResult<()> {
        self.set_status(id, ExportStatus::Generating).await
    }

    pub async fn mark_completed(&self, id: Uuid, file_path: &str, manifest: &ExportManifest) -> ExportResult<()> {
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            "UPDATE exports SET status = ?1, file_path = ?2, manifest = ?3 WHERE id = ?4",
            params![status_str(ExportStatus::Completed), file_path, serde_json::to_string(manifest)?, id.to_string()],
        )?;
        if rows == 0 {
            return Err(ExportError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn mark_failed(&self, id: Uuid, error: &str) -> ExportResult<()> {
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            "UPDATE exports SET status = ?1, error = ?2 WHERE id = ?3",
            params![status_str(ExportStatus::Failed), error, id.to_string()],
        )?;
        if rows == 0 {
            return Err(ExportError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: ExportStatus) -> ExportResult<()> {
        let conn = self.conn.lock().await;
        let rows = conn.execute("UPDATE exports SET status = ?1 WHERE id = ?2", params![status_str(status), id.to_string()])?;
        if rows == 0 {
            return Err(ExportError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Every `Completed` export whose `expires_at` has passed, for the sweeper.
    pub async fn expired_completed(&self, now: DateTime<Utc>) -> ExportResult<Vec<Export>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT * FROM exports WHERE status = ?1 AND expires_at < ?2")?;
        let rows = stmt
            .query_map(params![status_str(ExportStatus::Completed), now.to_rfc3339()], row_to_export)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub async fn mark_expired(&self, id: Uuid) -> ExportResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE exports SET status = ?1, file_path = NULL WHERE id = ?2",
            params![status_str(ExportStatus::Expired), id.to_string()],
        )?;
        Ok(())
    }
}

fn status_str(status: ExportStatus) -> &'static str {
    match status {
        ExportStatus::Pending => "PENDING",
        ExportStatus::Generating => "GENERATING",
        ExportStatus::Completed => "COMPLETED",
        ExportStatus::Failed => "FAILED",
        ExportStatus::Expired => "EXPIRED",
    }
}

fn parse_status(s: &str) -> ExportStatus {
    match s {
        "GENERATING" => ExportStatus::Generating,
        "COMPLETED" => ExportStatus::Completed,
        "FAILED" => ExportStatus::Failed,
        "EXPIRED" => ExportStatus::Expired,
        _ => ExportStatus::Pending,
    }
}

fn row_to_export(row: &Row) -> rusqlite::Result<Export> {
    let id: String = row.get("id")?;
    let tenant_id: String = row.get("tenant_id")?;
    let project_id: String = row.get("project_id")?;
    let requested_by: String = row.get("requested_by")?;
    let status: String = row.get("status")?;
    let manifest: String = row.get("manifest")?;
    let expires_at: String = row.get("expires_at")?;
    let created_at: String = row.get("created_at")?;

    Ok(Export {
        id: parse_uuid(&id)?,
        tenant_id: parse_uuid(&tenant_id)?,
        project_id: parse_uuid(&project_id)?,
        requested_by: parse_uuid(&requested_by)?,
        status: parse_status(&status),
        file_path: row.get("file_path")?,
        manifest: serde_json::from_str(&manifest).unwrap_or_default(),
        error: row.get("error")?,
        expires_at: parse_datetime(&expires_at),
        created_at: parse_datetime(&created_at),
    })
}

fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_repo() -> ExportRepository {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports.db");
        std::mem::forget(dir);
        ExportRepository::new(&path).unwrap()
    }

    #[tokio::test]
    async fn create_rejects_expiry_outside_allowed_range() {
        let repo = temp_repo();
        let err = repo.create(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 0).await.unwrap_err();
        assert!(matches!(err, ExportError::InvalidExpiry(0)));
        let err = repo.create(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 200).await.unwrap_err();
        assert!(matches!(err, ExportError::InvalidExpiry(200)));
    }

    #[tokio::test]
    async fn create_then_complete_round_trips() {
        let repo = temp_repo();
        let export = repo.create(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 24).await.unwrap();
        assert_eq!(export.status, ExportStatus::Pending);

        repo.mark_generating(export.id).await.unwrap();
        repo.mark_completed(export.id, "/tmp/export.zip", &export.manifest).await.unwrap();

        let reloaded = repo.get(export.id).await.unwrap();
        assert_eq!(reloaded.status, ExportStatus::Completed);
        assert_eq!(reloaded.file_path.as_deref(), Some("/tmp/export.zip"));
    }

    #[tokio::test]
    async fn expired_completed_exports_are_found_by_the_sweeper() {
        let repo = temp_repo();
        let export = repo.create(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 1).await.unwrap();
        repo.mark_completed(export.id, "/tmp/export.zip", &export.manifest).await.unwrap();

        let far_future = Utc::now() + Duration::days(30);
        let expired = repo.expired_completed(far_future).await.unwrap();
        assert_eq!(expired.len(), 1);

        repo.mark_expired(export.id).await.unwrap();
        let reloaded = repo.get(export.id).await.unwrap();
        assert_eq!(reloaded.status, ExportStatus::Expired);
        assert!(reloaded.file_path.is_none());
    }
}
