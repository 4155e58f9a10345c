//! Shapes for the cross-project agents surface: the full 4-stage workflow
//! driven end to end over one SSE connection, and the health probe.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowExecuteRequest {
    pub project_id: Uuid,
    /// Accepted for wire compatibility with callers that send the full
    /// tenant/user pair alongside the request; the authenticated bearer
    /// token is the source of truth for both, never this field.
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub idea_description: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub user_clarifications: Vec<String>,
    #[serde(default)]
    pub technology_stack: Option<Vec<String>>,
    #[serde(default)]
    pub user_tech_preferences: Option<Vec<String>>,
    #[serde(default)]
    pub team_size: Option<u32>,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealthEntry {
    pub id: String,
    pub name: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentsHealthResponse {
    pub status: String,
    pub providers: Vec<ProviderHealthEntry>,
}
