//! SQLite + sqlite-vec storage for embedded chunks, keyed by
//! `(tenant_id, project_id)` on every row.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use docforge_types::execution::Stage;
use docforge_types::vector::{PointType, Visibility};
use docforge_types::CorrelationId;
use rusqlite::{ffi::sqlite3_auto_extension, params, Connection, Row};
use sqlite_vec::sqlite3_vec_init;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::types::{SearchFilters, VectorError, VectorPoint, VectorResult, VectorSearchResult};

#[derive(Clone)]
pub struct VectorDatabase {
    conn: Arc<Mutex<Connection>>,
    embedding_dimension: usize,
}

impl VectorDatabase {
    pub async fn new(db_path: &Path, embedding_dimension: usize) -> VectorResult<Self> {
        unsafe {
            sqlite3_auto_extension(Some(std::mem::transmute::<
                *const (),
                unsafe extern "C" fn(
                    *mut rusqlite::ffi::sqlite3,
                    *mut *mut i8,
                    *const rusqlite::ffi::sqlite3_api_routines,
                ) -> i32,
            >(sqlite3_vec_init as *const ())));
        }

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(10))?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute("PRAGMA synchronous = NORMAL", [])?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            embedding_dimension,
        };
        db.init_schema().await?;
        Ok(db)
    }

    async fn init_schema(&self) -> VectorResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS vector_points (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                project_id TEXT NOT NULL,
                point_type TEXT NOT NULL,
                visibility TEXT NOT NULL,
                stage TEXT,
                correlation_id TEXT,
                content TEXT NOT NULL,
                token_count INTEGER NOT NULL,
                lang TEXT NOT NULL DEFAULT 'en',
                version INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_vector_points_scope
                ON vector_points(tenant_id, project_id, point_type, visibility, lang, version)",
            [],
        )?;
        conn.execute(
            &format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS vector_embeddings USING vec0(
                    embedding float[{}]
                )",
                self.embedding_dimension
            ),
            [],
        )?;
        Ok(())
    }

    pub async fn insert(&self, point: &VectorPoint, embedding: &[f32]) -> VectorResult<()> {
        if embedding.len() != self.embedding_dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.embedding_dimension,
                actual: embedding.len(),
            });
        }
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO vector_points
                (id, tenant_id, project_id, point_type, visibility, stage, correlation_id, content, token_count, lang, version, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                point.id.to_string(),
                point.tenant_id.to_string(),
                point.project_id.to_string(),
                serde_json::to_value(point.point_type)?.as_str().unwrap_or_default(),
                serde_json::to_value(point.visibility)?.as_str().unwrap_or_default(),
                point.stage.map(|s| s.agent_type().to_string()),
                point.correlation_id.as_ref().map(|c| c.0.to_string()),
                point.content,
                point.token_count,
                point.lang,
                point.version,
                point.created_at.to_rfc3339(),
            ],
        )?;
        conn.execute(
            "INSERT INTO vector_embeddings(rowid, embedding)
                VALUES ((SELECT rowid FROM vector_points WHERE id = ?1), ?2)",
            params![point.id.to_string(), bytemuck_cast(embedding)],
        )?;
        Ok(())
    }

    /// Conjunctive search over the mandatory tenant/project scope plus an
    /// optional `point_type`, an optional similarity floor, and an optional
    /// set of equality filters over `{point_type, visibility, lang, version}`
    /// (a `point_type` key here must agree with the dedicated parameter).
    pub async fn search(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        point_type: Option<PointType>,
        query_embedding: &[f32],
        limit: usize,
        score_threshold: Option<f64>,
        filters: Option<&SearchFilters>,
    ) -> VectorResult<Vec<VectorSearchResult>> {
        let conn = self.conn.lock().await;

        let point_type_str = point_type.map(|pt| {
            serde_json::to_value(pt)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default()
        });

        let mut conjuncts: Vec<(String, String)> = Vec::new();
        if let Some(pt) = &point_type_str {
            conjuncts.push(("p.point_type".to_string(), pt.clone()));
        }
        if let Some(filters) = filters {
            for (key, value) in filters {
                let column = match key.as_str() {
                    "point_type" => "p.point_type",
                    "visibility" => "p.visibility",
                    "lang" => "p.lang",
                    "version" => "p.version",
                    other => return Err(VectorError::InvalidFilter(other.to_string())),
                };
                conjuncts.push((column.to_string(), value.clone()));
            }
        }

        let mut sql = String::from(
            "SELECT p.id, p.tenant_id, p.project_id, p.point_type, p.visibility, p.stage,
                    p.correlation_id, p.content, p.token_count, p.lang, p.version, p.created_at,
                    vec_distance_cosine(e.embedding, ?1) AS distance
             FROM vector_points p
             JOIN vector_embeddings e ON e.rowid = p.rowid
             WHERE p.tenant_id = ?2 AND p.project_id = ?3",
        );
        let mut bind_values: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(bytemuck_cast(query_embedding)),
            Box::new(tenant_id.to_string()),
            Box::new(project_id.to_string()),
        ];
        for (column, value) in &conjuncts {
            bind_values.push(Box::new(value.clone()));
            sql.push_str(&format!(" AND {column} = ?{}", bind_values.len()));
        }
        sql.push_str(" ORDER BY distance ASC LIMIT ");
        sql.push_str(&limit.to_string());

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = bind_values.iter().map(|b| b.as_ref()).collect();
        let rows: Vec<VectorSearchResult> = stmt
            .query_map(param_refs.as_slice(), row_to_result)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match score_threshold {
            Some(threshold) => rows.into_iter().filter(|r| r.similarity >= threshold).collect(),
            None => rows,
        })
    }

    pub async fn delete_project(&self, tenant_id: Uuid, project_id: Uuid) -> VectorResult<i64> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute(
            "DELETE FROM vector_embeddings WHERE rowid IN
                (SELECT rowid FROM vector_points WHERE tenant_id = ?1 AND project_id = ?2)",
            params![tenant_id.to_string(), project_id.to_string()],
        )?;
        conn.execute(
            "DELETE FROM vector_points WHERE tenant_id = ?1 AND project_id = ?2",
            params![tenant_id.to_string(), project_id.to_string()],
        )?;
        Ok(deleted as i64)
    }

    /// Deletes exactly the given point ids, still scoped to the caller's
    /// tenant/project so an id from another tenant can't be deleted by guess.
    pub async fn delete(&self, tenant_id: Uuid, project_id: Uuid, point_ids: &[Uuid]) -> VectorResult<i64> {
        if point_ids.is_empty() {
            return Ok(0);
        }
        let conn = self.conn.lock().await;
        let placeholders = point_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let mut params: Vec<String> = vec![tenant_id.to_string(), project_id.to_string()];
        params.extend(point_ids.iter().map(|id| id.to_string()));
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p as &dyn rusqlite::ToSql).collect();

        conn.execute(
            &format!(
                "DELETE FROM vector_embeddings WHERE rowid IN
                    (SELECT rowid FROM vector_points WHERE tenant_id = ?1 AND project_id = ?2 AND id IN ({placeholders}))"
            ),
            param_refs.as_slice(),
        )?;
        let deleted = conn.execute(
            &format!("DELETE FROM vector_points WHERE tenant_id = ?1 AND project_id = ?2 AND id IN ({placeholders})"),
            param_refs.as_slice(),
        )?;
        Ok(deleted as i64)
    }

    pub async fn count(&self, tenant_id: Uuid, project_id: Uuid) -> VectorResult<i64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vector_points WHERE tenant_id = ?1 AND project_id = ?2",
            params![tenant_id.to_string(), project_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_result(row: &Row) -> rusqlite::Result<VectorSearchResult> {
    let id: String = row.get(0)?;
    let tenant_id: String = row.get(1)?;
    let project_id: String = row.get(2)?;
    let point_type: String = row.get(3)?;
    let visibility: String = row.get(4)?;
    let stage: Option<String> = row.get(5)?;
    let correlation_id: Option<String> = row.get(6)?;
    let content: String = row.get(7)?;
    let token_count: i64 = row.get(8)?;
    let lang: String = row.get(9)?;
    let version: i32 = row.get(10)?;
    let created_at: String = row.get(11)?;
    let distance: f64 = row.get(12)?;

    let point = VectorPoint {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        tenant_id: Uuid::parse_str(&tenant_id).unwrap_or_default(),
        project_id: Uuid::parse_str(&project_id).unwrap_or_default(),
        point_type: serde_json::from_value(serde_json::Value::String(point_type)).unwrap_or(PointType::Knowledge),
        visibility: serde_json::from_value(serde_json::Value::String(visibility)).unwrap_or(Visibility::Private),
        stage: stage.and_then(|s| Stage::ORDER.into_iter().find(|st| st.agent_type() == s)),
        correlation_id: correlation_id.and_then(|c| c.parse::<CorrelationId>().ok()),
        content,
        token_count,
        lang,
        version,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    };
    Ok(VectorSearchResult {
        point,
        similarity: 1.0 - distance,
    })
}

fn bytemuck_cast(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("docforge-vector-{name}-{}.sqlite3", Uuid::new_v4()));
        path
    }

    fn point(tenant_id: Uuid, project_id: Uuid) -> VectorPoint {
        VectorPoint {
            id: Uuid::new_v4(),
            tenant_id,
            project_id,
            point_type: PointType::Knowledge,
            visibility: Visibility::Private,
            stage: None,
            correlation_id: None,
            content: "near".to_string(),
            token_count: 1,
            lang: "en".to_string(),
            version: 1,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_then_search_returns_closest_first() {
        let path = temp_db_path("search");
        let db = VectorDatabase::new(&path, 3).await.unwrap();
        let tenant_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();

        let near = point(tenant_id, project_id);
        let far = VectorPoint {
            id: Uuid::new_v4(),
            ..near.clone()
        };
        db.insert(&near, &[1.0, 0.0, 0.0]).await.unwrap();
        db.insert(&far, &[0.0, 1.0, 0.0]).await.unwrap();

        let results = db
            .search(tenant_id, project_id, None, &[1.0, 0.0, 0.0], 2, None, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].point.id, near.id);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn search_is_scoped_to_tenant_and_project() {
        let path = temp_db_path("scope");
        let db = VectorDatabase::new(&path, 2).await.unwrap();
        let mut p = point(Uuid::new_v4(), Uuid::new_v4());
        p.point_type = PointType::Memory;
        db.insert(&p, &[1.0, 0.0]).await.unwrap();

        let other_tenant_results = db
            .search(Uuid::new_v4(), p.project_id, None, &[1.0, 0.0], 5, None, None)
            .await
            .unwrap();
        assert!(other_tenant_results.is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn score_threshold_excludes_dissimilar_matches() {
        let path = temp_db_path("threshold");
        let db = VectorDatabase::new(&path, 2).await.unwrap();
        let tenant_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let near = point(tenant_id, project_id);
        let far = VectorPoint {
            id: Uuid::new_v4(),
            ..near.clone()
        };
        db.insert(&near, &[1.0, 0.0]).await.unwrap();
        db.insert(&far, &[0.0, 1.0]).await.unwrap();

        let results = db
            .search(tenant_id, project_id, None, &[1.0, 0.0], 10, Some(0.99), None)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].point.id, near.id);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn filters_narrow_by_lang_and_version() {
        let path = temp_db_path("filters");
        let db = VectorDatabase::new(&path, 2).await.unwrap();
        let tenant_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let mut en = point(tenant_id, project_id);
        en.lang = "en".to_string();
        let mut fr = point(tenant_id, project_id);
        fr.lang = "fr".to_string();
        db.insert(&en, &[1.0, 0.0]).await.unwrap();
        db.insert(&fr, &[1.0, 0.0]).await.unwrap();

        let mut filters = HashMap::new();
        filters.insert("lang".to_string(), "fr".to_string());
        let results = db
            .search(tenant_id, project_id, None, &[1.0, 0.0], 10, None, Some(&filters))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].point.id, fr.id);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn unrecognized_filter_key_is_rejected() {
        let path = temp_db_path("bad-filter");
        let db = VectorDatabase::new(&path, 2).await.unwrap();
        let mut filters = HashMap::new();
        filters.insert("bogus".to_string(), "x".to_string());
        let err = db
            .search(Uuid::new_v4(), Uuid::new_v4(), None, &[1.0, 0.0], 10, None, Some(&filters))
            .await
            .unwrap_err();
        assert!(matches!(err, VectorError::InvalidFilter(_)));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn delete_removes_only_the_given_ids() {
        let path = temp_db_path("delete");
        let db = VectorDatabase::new(&path, 2).await.unwrap();
        let tenant_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let keep = point(tenant_id, project_id);
        let drop = point(tenant_id, project_id);
        db.insert(&keep, &[1.0, 0.0]).await.unwrap();
        db.insert(&drop, &[0.0, 1.0]).await.unwrap();

        let deleted = db.delete(tenant_id, project_id, &[drop.id]).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(db.count(tenant_id, project_id).await.unwrap(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn count_reflects_inserted_points_per_scope() {
        let path = temp_db_path("count");
        let db = VectorDatabase::new(&path, 2).await.unwrap();
        let tenant_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        assert_eq!(db.count(tenant_id, project_id).await.unwrap(), 0);
        db.insert(&point(tenant_id, project_id), &[1.0, 0.0]).await.unwrap();
        assert_eq!(db.count(tenant_id, project_id).await.unwrap(), 1);

        let _ = std::fs::remove_file(&path);
    }
}
