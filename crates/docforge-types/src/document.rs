use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document type enumeration for the four-stage workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Stage 1: Business Analysis.
    About,
    /// Stage 2: Engineering Standards.
    Specs,
    /// Stage 3: Solution Architecture.
    Architecture,
    /// Stage 4: Implementation Planning (overview).
    PlanOverview,
    /// Stage 4: Implementation Planning (individual epic).
    PlanEpic,
}

impl DocumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::About => "about",
            DocumentType::Specs => "specs",
            DocumentType::Architecture => "architecture",
            DocumentType::PlanOverview => "plan_overview",
            DocumentType::PlanEpic => "plan_epic",
        }
    }

    /// `plan_epic` is the only type keyed by `epic_number` instead of by type alone.
    pub fn is_epic(self) -> bool {
        matches!(self, DocumentType::PlanEpic)
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub document_type: DocumentType,
    pub version: i64,
    pub title: String,
    pub content: String,
    pub epic_number: Option<i64>,
    pub epic_name: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}
