use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("input rejected: {0}")]
    InvalidInput(String),
    #[error("agent execution timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("provider call failed: {0}")]
    Provider(#[from] anyhow::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;
