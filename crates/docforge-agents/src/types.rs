use uuid::Uuid;

use docforge_types::execution::Stage;
use docforge_types::CorrelationId;

/// Everything a capability record needs to build a prompt for one stage
/// invocation, independent of the LLM call itself.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub correlation_id: CorrelationId,
    pub stage: Stage,
    pub language: String,
    pub user_id: Uuid,
}

/// Free-form input collected from the caller for one stage run. Earlier
/// stage documents are not threaded through here; the orchestrator fetches
/// relevant excerpts from prior stages and passes them as `context_excerpts`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct StageInput {
    pub primary_text: String,
    pub goals: Vec<String>,
    pub constraints: Vec<String>,
    pub clarifications: Vec<String>,
}

/// Content pulled out of a raw stage response, keyed the way the original
/// per-stage parsers named their fields.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ParsedOutput {
    pub content: String,
    pub sections: std::collections::HashMap<String, String>,
    pub list_sections: std::collections::HashMap<String, Vec<String>>,
    pub key_facts: Vec<String>,
}
