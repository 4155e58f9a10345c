//! Request/response shapes for the `POST /projects/{id}/step{N}` surface.
//! Each stage accepts a different subset of fields (C12); callers send
//! whichever ones apply to the stage being invoked and leave the rest
//! absent rather than sending four distinct endpoint schemas.

use docforge_types::execution::{ExecutionStatus, Stage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageExecuteRequest {
    /// Stage 1 only: the idea being analyzed.
    #[serde(default)]
    pub idea_description: Option<String>,
    /// Stage 1 only.
    #[serde(default)]
    pub target_audience: Option<String>,
    /// Stage 1 only.
    #[serde(default)]
    pub user_clarifications: Vec<String>,
    /// Stage 2 only: defaults from config when absent.
    #[serde(default)]
    pub technology_stack: Option<Vec<String>>,
    /// Stage 3 only.
    #[serde(default)]
    pub user_tech_preferences: Option<Vec<String>>,
    /// Stage 4 only.
    #[serde(default)]
    pub team_size: Option<u32>,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    /// Shared across the stage{1..4} calls of one run so `/events` and
    /// `/progress` can be correlated to it; a fresh one is minted when absent.
    #[serde(default)]
    pub correlation_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageExecuteResponse {
    pub stage: Stage,
    pub status: ExecutionStatus,
    pub document_id: Uuid,
    pub document_version: i64,
    pub confidence_score: f64,
    pub correlation_id: Uuid,
}
