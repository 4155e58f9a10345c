//! Synchronous per-stage invocation: `POST /projects/{id}/step{N}` (C11/C12).
//! Each stage's input is derived from the request body plus whichever prior
//! stage documents it depends on; calling a stage before its dependencies
//! exist is a 409, not a 400, since the request shape itself is valid.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use docforge_core::tenant::AuthContext;
use docforge_types::document::DocumentType;
use docforge_types::execution::Stage;
use docforge_types::permissions::Permission;
use docforge_types::CorrelationId;
use docforge_wire::stage::{StageExecuteRequest, StageExecuteResponse};
use docforge_orchestrator::StageRequest;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_TECHNOLOGY_STACK: &[&str] = &["Rust", "PostgreSQL", "React"];
const DEFAULT_LANGUAGE: &str = "en";

pub(crate) fn document_type_for(stage: Stage) -> DocumentType {
    match stage {
        Stage::Analyst => DocumentType::About,
        Stage::Standards => DocumentType::Specs,
        Stage::Architect => DocumentType::Architecture,
        Stage::Planner => DocumentType::PlanOverview,
    }
}

/// Which prior stage documents stage's input is built from (4.11), not just
/// `stage.previous()`: the Architect stage skips Standards and reads the
/// Analyst's output directly, and the Planner stage reads both Analyst and
/// Architect.
fn required_predecessors(stage: Stage) -> &'static [Stage] {
    match stage {
        Stage::Analyst => &[],
        Stage::Standards => &[Stage::Analyst],
        Stage::Architect => &[Stage::Analyst],
        Stage::Planner => &[Stage::Analyst, Stage::Architect],
    }
}

pub(crate) async fn require_predecessor_documents(
    state: &AppState,
    tenant_id: Uuid,
    project_id: Uuid,
    stage: Stage,
) -> Result<std::collections::HashMap<Stage, String>, AppError> {
    let mut content = std::collections::HashMap::new();
    for predecessor in required_predecessors(stage) {
        let doc = state
            .documents
            .latest(tenant_id, project_id, document_type_for(*predecessor), None)
            .await?
            .ok_or_else(|| AppError::Conflict(format!("{} has not produced a document yet", predecessor.display_name())))?;
        content.insert(*predecessor, doc.content);
    }
    Ok(content)
}

pub(crate) fn build_stage_input(stage: Stage, body: &StageExecuteRequest, predecessors: &std::collections::HashMap<Stage, String>) -> docforge_agents::StageInput {
    match stage {
        Stage::Analyst => docforge_agents::StageInput {
            primary_text: body.idea_description.clone().unwrap_or_default(),
            goals: body
                .target_audience
                .as_ref()
                .map(|a| vec![format!("Target audience: {a}")])
                .unwrap_or_default(),
            constraints: Vec::new(),
            clarifications: body.user_clarifications.clone(),
        },
        Stage::Standards => {
            let stack = body
                .technology_stack
                .clone()
                .unwrap_or_else(|| DEFAULT_TECHNOLOGY_STACK.iter().map(|s| s.to_string()).collect());
            docforge_agents::StageInput {
                primary_text: predecessors.get(&Stage::Analyst).cloned().unwrap_or_default(),
                goals: Vec::new(),
                constraints: stack,
                clarifications: Vec::new(),
            }
        }
        Stage::Architect => docforge_agents::StageInput {
            primary_text: predecessors.get(&Stage::Analyst).cloned().unwrap_or_default(),
            goals: body.user_tech_preferences.clone().unwrap_or_default(),
            constraints: Vec::new(),
            clarifications: Vec::new(),
        },
        Stage::Planner => {
            let analyst = predecessors.get(&Stage::Analyst).cloned().unwrap_or_default();
            let architect = predecessors.get(&Stage::Architect).cloned().unwrap_or_default();
            docforge_agents::StageInput {
                primary_text: format!("{analyst}\n\n{architect}"),
                goals: Vec::new(),
                constraints: body.team_size.map(|n| vec![format!("Team size: {n}")]).unwrap_or_default(),
                clarifications: Vec::new(),
            }
        }
    }
}

pub async fn execute_stage(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path((project_id, step)): Path<(Uuid, u32)>,
    Json(body): Json<StageExecuteRequest>,
) -> Result<Json<StageExecuteResponse>, AppError> {
    let stage = Stage::from_step_number(step).ok_or_else(|| AppError::InvalidArgument(format!("no such stage: step{step}")))?;

    let role = state.accounts.get_member_role(ctx.tenant_id, project_id, ctx.user_id).await?;
    let resolved = AuthContext {
        role,
        project_id: Some(project_id),
        ..ctx.clone()
    };
    resolved.require(Permission::AgentExecute)?;

    let predecessors = require_predecessor_documents(&state, ctx.tenant_id, project_id, stage).await?;
    let input = build_stage_input(stage, &body, &predecessors);

    let correlation_id = body.correlation_id.map(CorrelationId).unwrap_or_else(CorrelationId::new);
    state.streaming.register_correlation(correlation_id, ctx.tenant_id, project_id);

    let result = state
        .workflow
        .execute_stage(StageRequest {
            tenant_id: ctx.tenant_id,
            project_id,
            correlation_id,
            stage,
            language: DEFAULT_LANGUAGE.to_string(),
            user_id: ctx.user_id,
            input,
            provider_id: body.provider_id.clone(),
            model_id: body.model_id.clone(),
        })
        .await?;

    Ok(Json(StageExecuteResponse {
        stage,
        status: result.execution.status,
        document_id: result.document.id,
        document_version: result.document.version,
        confidence_score: result.validation.score,
        correlation_id: correlation_id.0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn architect_depends_on_analyst_not_standards() {
        assert_eq!(required_predecessors(Stage::Architect), &[Stage::Analyst]);
    }

    #[test]
    fn planner_depends_on_analyst_and_architect() {
        assert_eq!(required_predecessors(Stage::Planner), &[Stage::Analyst, Stage::Architect]);
    }

    #[test]
    fn analyst_has_no_predecessors() {
        assert!(required_predecessors(Stage::Analyst).is_empty());
    }

    #[test]
    fn document_type_for_matches_each_stage() {
        assert_eq!(document_type_for(Stage::Analyst), DocumentType::About);
        assert_eq!(document_type_for(Stage::Standards), DocumentType::Specs);
        assert_eq!(document_type_for(Stage::Architect), DocumentType::Architecture);
        assert_eq!(document_type_for(Stage::Planner), DocumentType::PlanOverview);
    }

    #[test]
    fn standards_input_falls_back_to_default_stack_when_absent() {
        let body = StageExecuteRequest::default();
        let mut predecessors = std::collections::HashMap::new();
        predecessors.insert(Stage::Analyst, "analyst output".to_string());
        let input = build_stage_input(Stage::Standards, &body, &predecessors);
        assert_eq!(
            input.constraints,
            DEFAULT_TECHNOLOGY_STACK.iter().map(|s| s.to_string()).collect::<Vec<_>>()
        );
        assert_eq!(input.primary_text, "analyst output");
    }

    #[test]
    fn planner_input_combines_analyst_and_architect_content() {
        let body = StageExecuteRequest::default();
        let mut predecessors = std::collections::HashMap::new();
        predecessors.insert(Stage::Analyst, "analyst output".to_string());
        predecessors.insert(Stage::Architect, "architect output".to_string());
        let input = build_stage_input(Stage::Planner, &body, &predecessors);
        assert!(input.primary_text.contains("analyst output"));
        assert!(input.primary_text.contains("architect output"));
    }
}
