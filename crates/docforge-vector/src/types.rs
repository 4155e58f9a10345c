use chrono::{DateTime, Utc};
use docforge_types::execution::Stage;
use docforge_types::vector::{PointType, Visibility};
use docforge_types::CorrelationId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A stored, embedded slice of text. Every row carries `tenant_id` and
/// `project_id`; there is no code path that queries across either without
/// both present, by construction of the store's public API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub point_type: PointType,
    pub visibility: Visibility,
    pub stage: Option<Stage>,
    pub correlation_id: Option<CorrelationId>,
    pub content: String,
    pub token_count: i64,
    pub lang: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchResult {
    pub point: VectorPoint,
    pub similarity: f64,
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub point_type: Option<PointType>,
    pub limit: usize,
}

/// Conjunctive equality filters applied on top of the mandatory
/// tenant/project scoping. Recognized keys: `point_type`, `visibility`,
/// `lang`, `version`. Unrecognized keys are rejected with `InvalidFilter`
/// rather than silently ignored.
pub type SearchFilters = std::collections::HashMap<String, String>;

#[derive(Error, Debug)]
pub enum VectorError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("chunking error: {0}")]
    Chunking(String),
    #[error("tokenization error: {0}")]
    Tokenization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("invalid search filter key: {0}")]
    InvalidFilter(String),
}

pub type VectorResult<T> = Result<T, VectorError>;

pub const MIN_CHUNK_LENGTH: usize = 50;
pub const MAX_CHUNK_LENGTH: usize = 4000;
