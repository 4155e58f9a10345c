use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `knowledge` = ingested reference material; `memory` = system-generated
/// agent output persisted for later retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointType {
    Knowledge,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Public,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPointPayload {
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    #[serde(rename = "type")]
    pub point_type: PointType,
    pub visibility: Visibility,
    pub lang: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub vector_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub content: String,
}
