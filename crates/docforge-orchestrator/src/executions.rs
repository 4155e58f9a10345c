use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tokio::sync::Mutex;
use uuid::Uuid;

use docforge_types::execution::{AgentExecution, ExecutionStatus, Stage};
use docforge_types::CorrelationId;

use crate::error::{OrchestratorError, OrchestratorResult};

/// Durable log of `AgentExecution` rows: the workflow's actual state
/// machine. A run is `Pending` at creation, moves to `Running`, then to
/// exactly one terminal status. Rows are never deleted.
#[derive(Clone)]
pub struct ExecutionLog {
    conn: Arc<Mutex<Connection>>,
}

impl ExecutionLog {
    pub fn new(db_path: &Path) -> OrchestratorResult<Self> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(10))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> OrchestratorResult<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS agent_executions (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                project_id TEXT NOT NULL,
                agent_type TEXT NOT NULL,
                correlation_id TEXT NOT NULL,
                stage TEXT NOT NULL,
                status TEXT NOT NULL,
                input TEXT NOT NULL,
                output TEXT,
                error TEXT,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                initiated_by TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_agent_executions_correlation
                ON agent_executions(correlation_id);
            CREATE INDEX IF NOT EXISTS idx_agent_executions_project
                ON agent_executions(tenant_id, project_id);",
        )?;
        Ok(())
    }

    pub async fn start(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        stage: Stage,
        correlation_id: CorrelationId,
        input: serde_json::Value,
        initiated_by: Uuid,
    ) -> OrchestratorResult<AgentExecution> {
        let execution = AgentExecution {
            id: Uuid::new_v4(),
            tenant_id,
            project_id,
            agent_type: stage.agent_type().to_string(),
            correlation_id,
            stage,
            status: ExecutionStatus::Running,
            input,
            output: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
            initiated_by,
        };

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO agent_executions
                (id, tenant_id, project_id, agent_type, correlation_id, stage, status, input, output, error, started_at, completed_at, initiated_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, NULL, ?9, NULL, ?10)",
            params![
                execution.id.to_string(),
                execution.tenant_id.to_string(),
                execution.project_id.to_string(),
                execution.agent_type,
                execution.correlation_id.0.to_string(),
                stage_str(stage),
                status_str(ExecutionStatus::Running),
                serde_json::to_string(&execution.input)?,
                execution.started_at.to_rfc3339(),
                execution.initiated_by.to_string(),
            ],
        )?;
        Ok(execution)
    }

    pub async fn complete(&self, id: Uuid, output: serde_json::Value) -> OrchestratorResult<()> {
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            "UPDATE agent_executions SET status = ?1, output = ?2, completed_at = ?3 WHERE id = ?4",
            params![
                status_str(ExecutionStatus::Completed),
                serde_json::to_string(&output)?,
                Utc::now().to_rfc3339(),
                id.to_string(),
            ],
        )?;
        if rows == 0 {
            return Err(OrchestratorError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn fail(&self, id: Uuid, error: &str) -> OrchestratorResult<()> {
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            "UPDATE agent_executions SET status = ?1, error = ?2, completed_at = ?3 WHERE id = ?4",
            params![
                status_str(ExecutionStatus::Failed),
                error,
                Utc::now().to_rfc3339(),
                id.to_string(),
            ],
        )?;
        if rows == 0 {
            return Err(OrchestratorError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn by_correlation(&self, correlation_id: CorrelationId) -> OrchestratorResult<Vec<AgentExecution>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, project_id, agent_type, correlation_id, stage, status, input, output, error, started_at, completed_at, initiated_by
             FROM agent_executions WHERE correlation_id = ?1 ORDER BY started_at ASC",
        )?;
        let rows = stmt.query_map(params![correlation_id.0.to_string()], row_to_execution)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn stage_str(stage: Stage) -> &'static str {
    stage.agent_type()
}

fn status_str(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Pending => "pending",
        ExecutionStatus::Running => "running",
        ExecutionStatus::Completed => "completed",
        ExecutionStatus::Failed => "failed",
        ExecutionStatus::Cancelled => "cancelled",
    }
}

fn row_to_execution(row: &Row) -> rusqlite::Result<AgentExecution> {
    let id: String = row.get("id")?;
    let tenant_id: String = row.get("tenant_id")?;
    let project_id: String = row.get("project_id")?;
    let correlation_id: String = row.get("correlation_id")?;
    let stage: String = row.get("stage")?;
    let status: String = row.get("status")?;
    let input: String = row.get("input")?;
    let output: Option<String> = row.get("output")?;
    let started_at: String = row.get("started_at")?;
    let completed_at: Option<String> = row.get("completed_at")?;
    let initiated_by: String = row.get("initiated_by")?;

    Ok(AgentExecution {
        id: parse_uuid(&id)?,
        tenant_id: parse_uuid(&tenant_id)?,
        project_id: parse_uuid(&project_id)?,
        agent_type: status_to_agent_type(&stage),
        correlation_id: CorrelationId(parse_uuid(&correlation_id)?),
        stage: parse_stage(&stage),
        status: parse_status(&status),
        input: serde_json::from_str(&input).unwrap_or(serde_json::Value::Null),
        output: output.and_then(|s| serde_json::from_str(&s).ok()),
        error: row.get("error")?,
        started_at: chrono::DateTime::parse_from_rfc3339(&started_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        completed_at: completed_at.and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
        initiated_by: parse_uuid(&initiated_by)?,
    })
}

fn status_to_agent_type(stage: &str) -> String {
    stage.to_string()
}

fn parse_stage(s: &str) -> Stage {
    Stage::ORDER.into_iter().find(|stage| stage.agent_type() == s).unwrap_or(Stage::Analyst)
}

fn parse_status(s: &str) -> ExecutionStatus {
    match s {
        "running" => ExecutionStatus::Running,
        "completed" => ExecutionStatus::Completed,
        "failed" => ExecutionStatus::Failed,
        "cancelled" => ExecutionStatus::Cancelled,
        _ => ExecutionStatus::Pending,
    }
}

fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log() -> ExecutionLog {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("executions.db");
        std::mem::forget(dir);
        ExecutionLog::new(&path).unwrap()
    }

    #[tokio::test]
    async fn start_then_complete_round_trips() {
        let log = temp_log();
        let tenant_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let correlation_id = CorrelationId::new();
        let execution = log
            .start(tenant_id, project_id, Stage::Analyst, correlation_id, serde_json::json!({"idea": "x"}), Uuid::new_v4())
            .await
            .unwrap();

        log.complete(execution.id, serde_json::json!({"content": "done"})).await.unwrap();

        let rows = log.by_correlation(correlation_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn fail_records_error_and_terminal_status() {
        let log = temp_log();
        let execution = log
            .start(Uuid::new_v4(), Uuid::new_v4(), Stage::Planner, CorrelationId::new(), serde_json::json!({}), Uuid::new_v4())
            .await
            .unwrap();
        log.fail(execution.id, "provider timed out").await.unwrap();
        let rows = log.by_correlation(execution.correlation_id).await.unwrap();
        assert_eq!(rows[0].status, ExecutionStatus::Failed);
        assert_eq!(rows[0].error.as_deref(), Some("provider timed out"));
    }
}
