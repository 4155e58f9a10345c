pub mod document;
pub mod execution;
pub mod export;
pub mod permissions;
pub mod provider;
pub mod tenant;
pub mod vector;

pub use document::{DocumentType, DocumentVersion};
pub use execution::{AgentExecution, ExecutionStatus, Stage};
pub use export::{Export, ExportFormat, ExportManifest, ExportManifestEntry, ExportStatus};
pub use permissions::{Permission, Role};
pub use provider::{ModelInfo, ModelSpec, ProviderInfo};
pub use tenant::{Project, ProjectMember, ProjectStatus, Tenant, User};
pub use vector::{PointType, VectorPointPayload, Visibility};

/// Correlation id scoping one workflow execution. A newtype instead of a bare
/// `Uuid` so handlers can't accidentally thread a project id or user id where
/// a correlation id is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub uuid::Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CorrelationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(uuid::Uuid::parse_str(s)?))
    }
}
