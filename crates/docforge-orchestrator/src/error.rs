use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("execution not found: {0}")]
    NotFound(String),
    #[error("agent execution failed: {0}")]
    Agent(#[from] docforge_agents::AgentError),
    #[error("document persistence failed: {0}")]
    Document(#[from] docforge_documents::DocumentError),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
