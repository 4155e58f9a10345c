use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CorrelationId;

/// One stage in the fixed four-stage workflow. Numbering is fixed as
/// `1 Analyst, 2 Standards, 3 Architect, 4 Planner` everywhere in this crate;
/// no code path is allowed to renumber them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analyst,
    Standards,
    Architect,
    Planner,
}

impl Stage {
    pub const ORDER: [Stage; 4] = [
        Stage::Analyst,
        Stage::Standards,
        Stage::Architect,
        Stage::Planner,
    ];

    /// 1-based step number, matching the external `step{N}` HTTP surface.
    pub fn step_number(self) -> u32 {
        match self {
            Stage::Analyst => 1,
            Stage::Standards => 2,
            Stage::Architect => 3,
            Stage::Planner => 4,
        }
    }

    pub fn from_step_number(n: u32) -> Option<Self> {
        Self::ORDER.into_iter().find(|s| s.step_number() == n)
    }

    pub fn previous(self) -> Option<Self> {
        let idx = Self::ORDER.iter().position(|s| *s == self)?;
        idx.checked_sub(1).map(|i| Self::ORDER[i])
    }

    pub fn agent_type(self) -> &'static str {
        match self {
            Stage::Analyst => "business_analyst",
            Stage::Standards => "engineering_standards",
            Stage::Architect => "solution_architect",
            Stage::Planner => "project_planner",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Stage::Analyst => "Business Analysis",
            Stage::Standards => "Engineering Standards",
            Stage::Architect => "Solution Architecture",
            Stage::Planner => "Implementation Planning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecution {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub agent_type: String,
    pub correlation_id: CorrelationId,
    pub stage: Stage,
    pub status: ExecutionStatus,
    pub input: serde_json::Value,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub initiated_by: Uuid,
}
