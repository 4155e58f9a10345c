use docforge_types::execution::{ExecutionStatus, Stage};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StageProgress {
    pub stage: Stage,
    pub status: ExecutionStatus,
    pub document_version: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressResponse {
    pub project_id: uuid::Uuid,
    pub overall_percent: f64,
    pub stages: Vec<StageProgress>,
}
