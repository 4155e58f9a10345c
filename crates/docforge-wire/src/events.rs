//! Server-sent event envelope for the workflow streaming surface (C13).
//!
//! `start` always precedes any `step_*` for a given correlation id; at most
//! one of `{complete, error}` terminates the sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEventPayload {
    Start {
        workflow_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    StepStart {
        step: u32,
        name: String,
        status: String,
    },
    StepComplete {
        step: u32,
        status: String,
        confidence: f64,
    },
    StepError {
        step: u32,
        message: String,
        correlation_id: Uuid,
    },
    Complete {
        workflow_id: Uuid,
        status: String,
        results: serde_json::Value,
    },
    Progress {
        stage: String,
        progress: f64,
        message: String,
    },
    Error {
        workflow_id: Uuid,
        message: String,
    },
}

/// The envelope actually written to the wire as `data: <json>\n\n`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(flatten)]
    pub payload: StreamEventPayload,
}

impl StreamEvent {
    pub fn start(workflow_id: Uuid) -> Self {
        Self {
            payload: StreamEventPayload::Start {
                workflow_id,
                timestamp: Utc::now(),
            },
        }
    }

    pub fn step_start(step: u32, name: impl Into<String>) -> Self {
        Self {
            payload: StreamEventPayload::StepStart {
                step,
                name: name.into(),
                status: "running".to_string(),
            },
        }
    }

    pub fn step_complete(step: u32, confidence: f64) -> Self {
        Self {
            payload: StreamEventPayload::StepComplete {
                step,
                status: "completed".to_string(),
                confidence,
            },
        }
    }

    pub fn step_error(step: u32, message: impl Into<String>, correlation_id: Uuid) -> Self {
        Self {
            payload: StreamEventPayload::StepError {
                step,
                message: message.into(),
                correlation_id,
            },
        }
    }

    pub fn complete(workflow_id: Uuid, results: serde_json::Value) -> Self {
        Self {
            payload: StreamEventPayload::Complete {
                workflow_id,
                status: "completed".to_string(),
                results,
            },
        }
    }

    pub fn progress(stage: impl Into<String>, progress: f64, message: impl Into<String>) -> Self {
        Self {
            payload: StreamEventPayload::Progress {
                stage: stage.into(),
                progress,
                message: message.into(),
            },
        }
    }

    pub fn error(workflow_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            payload: StreamEventPayload::Error {
                workflow_id,
                message: message.into(),
            },
        }
    }

    /// Serialize to the exact `data: <json>` line this event occupies in an
    /// SSE frame, without the trailing blank line `axum::response::sse::Event`
    /// already appends.
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_then_step_serializes_with_type_tag() {
        let wf = Uuid::new_v4();
        let ev = StreamEvent::start(wf);
        let json = ev.to_sse_data();
        assert!(json.contains("\"type\":\"start\""));
        assert!(json.contains(&wf.to_string()));
    }

    #[test]
    fn step_complete_carries_confidence() {
        let ev = StreamEvent::step_complete(2, 0.82);
        let json = ev.to_sse_data();
        assert!(json.contains("\"confidence\":0.82"));
        assert!(json.contains("\"step\":2"));
    }
}
