//! Versioned storage for generated documents, keyed by `(tenant_id, project_id)`
//! on every row. Version numbers are contiguous per document type, except for
//! `plan_epic` documents which version independently per `epic_number`.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use docforge_types::document::{DocumentType, DocumentVersion};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{DocumentError, DocumentResult};

#[derive(Clone)]
pub struct DocumentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DocumentRepository {
    pub async fn new(db_path: &Path) -> DocumentResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(std::time::Duration::from_secs(10))?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute("PRAGMA synchronous = NORMAL", [])?;

        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.init_schema().await?;
        Ok(repo)
    }

    async fn init_schema(&self) -> DocumentResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS document_versions (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                project_id TEXT NOT NULL,
                document_type TEXT NOT NULL,
                version INTEGER NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                epic_number INTEGER,
                epic_name TEXT,
                metadata TEXT NOT NULL,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                is_deleted INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_document_versions_project_type
                ON document_versions(project_id, document_type)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_document_versions_tenant_created
                ON document_versions(tenant_id, created_at)",
            [],
        )?;
        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_document_version_tenant_project_type_version
                ON document_versions(tenant_id, project_id, document_type, version)
                WHERE epic_number IS NULL AND is_deleted = 0",
            [],
        )?;
        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_document_version_tenant_project_epic_version
                ON document_versions(tenant_id, project_id, epic_number, version)
                WHERE epic_number IS NOT NULL AND document_type = 'plan_epic' AND is_deleted = 0",
            [],
        )?;
        Ok(())
    }

    /// Creates the next version for a document type (or, for `plan_epic`,
    /// the next version for the given `epic_number`). The version number is
    /// computed and inserted under a single held connection lock, so
    /// concurrent callers targeting the same key always observe a
    /// contiguous, strictly increasing sequence starting at 1.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_version(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        document_type: DocumentType,
        title: &str,
        content: &str,
        epic_number: Option<i64>,
        epic_name: Option<String>,
        metadata: serde_json::Value,
        created_by: Uuid,
    ) -> DocumentResult<DocumentVersion> {
        if document_type.is_epic() && epic_number.is_none() {
            return Err(DocumentError::MissingEpicNumber);
        }

        let conn = self.conn.lock().await;
        let version: i64 = if let Some(epic) = epic_number {
            conn.query_row(
                "SELECT COALESCE(MAX(version), 0) + 1 FROM document_versions
                    WHERE tenant_id = ?1 AND project_id = ?2 AND epic_number = ?3
                      AND document_type = 'plan_epic'",
                params![tenant_id.to_string(), project_id.to_string(), epic],
                |row| row.get(0),
            )?
        } else {
            conn.query_row(
                "SELECT COALESCE(MAX(version), 0) + 1 FROM document_versions
                    WHERE tenant_id = ?1 AND project_id = ?2 AND document_type = ?3
                      AND epic_number IS NULL",
                params![tenant_id.to_string(), project_id.to_string(), document_type.as_str()],
                |row| row.get(0),
            )?
        };

        let doc = DocumentVersion {
            id: Uuid::new_v4(),
            tenant_id,
            project_id,
            document_type,
            version,
            title: title.to_string(),
            content: content.to_string(),
            epic_number,
            epic_name,
            metadata,
            created_by,
            created_at: Utc::now(),
            is_deleted: false,
        };
        conn.execute(
            "INSERT INTO document_versions
                (id, tenant_id, project_id, document_type, version, title, content,
                 epic_number, epic_name, metadata, created_by, created_at, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0)",
            params![
                doc.id.to_string(),
                doc.tenant_id.to_string(),
                doc.project_id.to_string(),
                doc.document_type.as_str(),
                doc.version,
                doc.title,
                doc.content,
                doc.epic_number,
                doc.epic_name,
                serde_json::to_string(&doc.metadata)?,
                doc.created_by.to_string(),
                doc.created_at.to_rfc3339(),
            ],
        )?;
        Ok(doc)
    }

    /// Latest non-deleted version of a document type. For `plan_epic`, pass
    /// the target `epic_number`; otherwise pass `None`.
    pub async fn latest(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        document_type: DocumentType,
        epic_number: Option<i64>,
    ) -> DocumentResult<Option<DocumentVersion>> {
        let conn = self.conn.lock().await;
        let row = if let Some(epic) = epic_number {
            conn.query_row(
                "SELECT * FROM document_versions
                    WHERE tenant_id = ?1 AND project_id = ?2 AND document_type = ?3
                      AND epic_number = ?4 AND is_deleted = 0
                    ORDER BY version DESC LIMIT 1",
                params![tenant_id.to_string(), project_id.to_string(), document_type.as_str(), epic],
                row_to_document,
            )
            .optional()?
        } else {
            conn.query_row(
                "SELECT * FROM document_versions
                    WHERE tenant_id = ?1 AND project_id = ?2 AND document_type = ?3
                      AND epic_number IS NULL AND is_deleted = 0
                    ORDER BY version DESC LIMIT 1",
                params![tenant_id.to_string(), project_id.to_string(), document_type.as_str()],
                row_to_document,
            )
            .optional()?
        };
        Ok(row)
    }

    /// All non-deleted documents in a project, most recently created first.
    pub async fn list_by_project(&self, tenant_id: Uuid, project_id: Uuid) -> DocumentResult<Vec<DocumentVersion>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT * FROM document_versions
                WHERE tenant_id = ?1 AND project_id = ?2 AND is_deleted = 0
                ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map(params![tenant_id.to_string(), project_id.to_string()], row_to_document)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Full version history for a document type (or epic), oldest first.
    pub async fn history(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        document_type: DocumentType,
        epic_number: Option<i64>,
    ) -> DocumentResult<Vec<DocumentVersion>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT * FROM document_versions
                WHERE tenant_id = ?1 AND project_id = ?2 AND document_type = ?3
                  AND epic_number IS ?4 AND is_deleted = 0
                ORDER BY version ASC",
        )?;
        let rows = stmt
            .query_map(
                params![tenant_id.to_string(), project_id.to_string(), document_type.as_str(), epic_number],
                row_to_document,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub async fn soft_delete(&self, tenant_id: Uuid, project_id: Uuid, id: Uuid) -> DocumentResult<bool> {
        let conn = self.conn.lock().await;
        let updated = conn.execute(
            "UPDATE document_versions SET is_deleted = 1
                WHERE id = ?1 AND tenant_id = ?2 AND project_id = ?3 AND is_deleted = 0",
            params![id.to_string(), tenant_id.to_string(), project_id.to_string()],
        )?;
        Ok(updated > 0)
    }
}

fn row_to_document(row: &Row) -> rusqlite::Result<DocumentVersion> {
    let id: String = row.get("id")?;
    let tenant_id: String = row.get("tenant_id")?;
    let project_id: String = row.get("project_id")?;
    let document_type: String = row.get("document_type")?;
    let version: i64 = row.get("version")?;
    let title: String = row.get("title")?;
    let content: String = row.get("content")?;
    let epic_number: Option<i64> = row.get("epic_number")?;
    let epic_name: Option<String> = row.get("epic_name")?;
    let metadata: String = row.get("metadata")?;
    let created_by: String = row.get("created_by")?;
    let created_at: String = row.get("created_at")?;
    let is_deleted: i64 = row.get("is_deleted")?;

    Ok(DocumentVersion {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        tenant_id: Uuid::parse_str(&tenant_id).unwrap_or_default(),
        project_id: Uuid::parse_str(&project_id).unwrap_or_default(),
        document_type: parse_document_type(&document_type),
        version,
        title,
        content,
        epic_number,
        epic_name,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
        created_by: Uuid::parse_str(&created_by).unwrap_or_default(),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        is_deleted: is_deleted != 0,
    })
}

fn parse_document_type(s: &str) -> DocumentType {
    match s {
        "about" => DocumentType::About,
        "specs" => DocumentType::Specs,
        "architecture" => DocumentType::Architecture,
        "plan_overview" => DocumentType::PlanOverview,
        _ => DocumentType::PlanEpic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("docforge-documents-{name}-{}.sqlite3", Uuid::new_v4()));
        path
    }

    #[tokio::test]
    async fn create_version_starts_at_one_and_increments() {
        let path = temp_db_path("versions");
        let repo = DocumentRepository::new(&path).await.unwrap();
        let tenant_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let first = repo
            .create_version(
                tenant_id,
                project_id,
                DocumentType::About,
                "About",
                "v1",
                None,
                None,
                serde_json::json!({}),
                user_id,
            )
            .await
            .unwrap();
        assert_eq!(first.version, 1);

        let second = repo
            .create_version(
                tenant_id,
                project_id,
                DocumentType::About,
                "About",
                "v2",
                None,
                None,
                serde_json::json!({}),
                user_id,
            )
            .await
            .unwrap();
        assert_eq!(second.version, 2);

        let latest = repo.latest(tenant_id, project_id, DocumentType::About, None).await.unwrap();
        assert_eq!(latest.unwrap().content, "v2");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn epic_versions_are_independent_per_epic_number() {
        let path = temp_db_path("epics");
        let repo = DocumentRepository::new(&path).await.unwrap();
        let tenant_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let epic_one = repo
            .create_version(
                tenant_id,
                project_id,
                DocumentType::PlanEpic,
                "Epic 1",
                "content",
                Some(1),
                Some("Onboarding".to_string()),
                serde_json::json!({}),
                user_id,
            )
            .await
            .unwrap();
        assert_eq!(epic_one.version, 1);

        let epic_two = repo
            .create_version(
                tenant_id,
                project_id,
                DocumentType::PlanEpic,
                "Epic 2",
                "content",
                Some(2),
                Some("Billing".to_string()),
                serde_json::json!({}),
                user_id,
            )
            .await
            .unwrap();
        assert_eq!(epic_two.version, 1, "different epic_number starts its own version sequence");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn create_version_without_epic_number_for_plan_epic_is_rejected() {
        let path = temp_db_path("missing-epic");
        let repo = DocumentRepository::new(&path).await.unwrap();
        let err = repo
            .create_version(
                Uuid::new_v4(),
                Uuid::new_v4(),
                DocumentType::PlanEpic,
                "Epic",
                "content",
                None,
                None,
                serde_json::json!({}),
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::MissingEpicNumber));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn soft_deleted_versions_are_excluded_from_latest() {
        let path = temp_db_path("soft-delete");
        let repo = DocumentRepository::new(&path).await.unwrap();
        let tenant_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let doc = repo
            .create_version(
                tenant_id,
                project_id,
                DocumentType::Specs,
                "Specs",
                "content",
                None,
                None,
                serde_json::json!({}),
                user_id,
            )
            .await
            .unwrap();

        assert!(repo.soft_delete(tenant_id, project_id, doc.id).await.unwrap());
        let latest = repo.latest(tenant_id, project_id, DocumentType::Specs, None).await.unwrap();
        assert!(latest.is_none());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn version_numbers_are_never_reused_after_soft_delete() {
        let path = temp_db_path("version-no-reuse");
        let repo = DocumentRepository::new(&path).await.unwrap();
        let tenant_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let v1 = repo
            .create_version(tenant_id, project_id, DocumentType::Specs, "Specs", "v1", None, None, serde_json::json!({}), user_id)
            .await
            .unwrap();
        assert_eq!(v1.version, 1);
        assert!(repo.soft_delete(tenant_id, project_id, v1.id).await.unwrap());

        let v2 = repo
            .create_version(tenant_id, project_id, DocumentType::Specs, "Specs", "v2", None, None, serde_json::json!({}), user_id)
            .await
            .unwrap();
        assert_eq!(v2.version, 2);

        let _ = std::fs::remove_file(&path);
    }
}
