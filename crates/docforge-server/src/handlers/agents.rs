//! Cross-project agent surface: drive all four stages back to back over one
//! SSE connection, and report provider health (C9/C13).

use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{Extension, Json};
use docforge_core::tenant::AuthContext;
use docforge_types::execution::Stage;
use docforge_types::permissions::Permission;
use docforge_types::CorrelationId;
use docforge_wire::agents::{AgentsHealthResponse, ProviderHealthEntry, WorkflowExecuteRequest};
use docforge_wire::stage::StageExecuteRequest;
use docforge_wire::StreamEvent;
use docforge_orchestrator::StageRequest;
use futures::Stream;
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::error::AppError;
use crate::handlers::stages::{build_stage_input, require_predecessor_documents};
use crate::state::AppState;

const STAGE_PAUSE: Duration = Duration::from_secs(1);
const DEFAULT_LANGUAGE: &str = "en";

pub async fn execute_workflow_stream(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<WorkflowExecuteRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>>, AppError> {
    let project_id = body.project_id;
    let role = state.accounts.get_member_role(ctx.tenant_id, project_id, ctx.user_id).await?;
    let resolved = AuthContext {
        role,
        project_id: Some(project_id),
        ..ctx.clone()
    };
    resolved.require(Permission::AgentExecute)?;

    state
        .accounts
        .get_project(ctx.tenant_id, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("project not found".to_string()))?;

    let correlation_id = CorrelationId::new();
    state.streaming.register_correlation(correlation_id, ctx.tenant_id, project_id);
    let rx = state.streaming.subscribe(ctx.tenant_id, project_id);

    let request_as_stage_fields = StageExecuteRequest {
        idea_description: body.idea_description.clone(),
        target_audience: body.target_audience.clone(),
        user_clarifications: body.user_clarifications.clone(),
        technology_stack: body.technology_stack.clone(),
        user_tech_preferences: body.user_tech_preferences.clone(),
        team_size: body.team_size,
        provider_id: body.provider_id.clone(),
        model_id: body.model_id.clone(),
        correlation_id: Some(correlation_id.0),
    };
    let language = body.language.clone().unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    let tenant_id = ctx.tenant_id;
    let user_id = ctx.user_id;
    let state_for_task = state.clone();

    tokio::spawn(async move {
        run_workflow(state_for_task, tenant_id, project_id, user_id, correlation_id, request_as_stage_fields, language).await;
    });

    let stream = BroadcastStream::new(rx).filter_map(|message| match message {
        Ok(event) => Some(Ok(Event::default().data(event.to_sse_data()))),
        Err(_lagged) => None,
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(10))))
}

/// Drives stage 1 through 4 in order, publishing progress to whichever
/// clients are subscribed to this project's stream. Stops at the first
/// failing stage; later stages never run against a partial predecessor set.
async fn run_workflow(
    state: AppState,
    tenant_id: Uuid,
    project_id: Uuid,
    user_id: Uuid,
    correlation_id: CorrelationId,
    body: StageExecuteRequest,
    language: String,
) {
    state.streaming.publish(tenant_id, project_id, StreamEvent::start(correlation_id.0));

    let mut last_confidence = 0.0;
    for (index, stage) in Stage::ORDER.iter().copied().enumerate() {
        let step = stage.step_number();
        state
            .streaming
            .publish(tenant_id, project_id, StreamEvent::step_start(step, stage.display_name()));

        let outcome = run_stage(&state, tenant_id, project_id, user_id, correlation_id, stage, &body, &language).await;
        match outcome {
            Ok(confidence) => {
                last_confidence = confidence;
                state.streaming.publish(tenant_id, project_id, StreamEvent::step_complete(step, confidence));
            }
            Err(err) => {
                state
                    .streaming
                    .publish(tenant_id, project_id, StreamEvent::step_error(step, err.to_string(), correlation_id.0));
                return;
            }
        }

        if index + 1 < Stage::ORDER.len() {
            tokio::time::sleep(STAGE_PAUSE).await;
        }
    }

    state.streaming.publish(
        tenant_id,
        project_id,
        StreamEvent::complete(correlation_id.0, json!({ "final_confidence": last_confidence })),
    );
}

async fn run_stage(
    state: &AppState,
    tenant_id: Uuid,
    project_id: Uuid,
    user_id: Uuid,
    correlation_id: CorrelationId,
    stage: Stage,
    body: &StageExecuteRequest,
    language: &str,
) -> Result<f64, AppError> {
    let predecessors = require_predecessor_documents(state, tenant_id, project_id, stage).await?;
    let input = build_stage_input(stage, body, &predecessors);

    let result = state
        .workflow
        .execute_stage(StageRequest {
            tenant_id,
            project_id,
            correlation_id,
            stage,
            language: language.to_string(),
            user_id,
            input,
            provider_id: body.provider_id.clone(),
            model_id: body.model_id.clone(),
        })
        .await?;

    Ok(result.validation.score)
}

/// 503 only when every configured provider's breaker is open, i.e. the
/// workflow engine has nowhere left to fail over to. A single open breaker
/// among several providers is `degraded` but still a 200.
pub async fn agents_health(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let health = state.providers.health().await;
    let any_available = health.iter().any(|h| !matches!(h.state, docforge_providers::BreakerState::Open));
    let all_closed = health.iter().all(|h| matches!(h.state, docforge_providers::BreakerState::Closed));

    let status = if !any_available {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    } else {
        axum::http::StatusCode::OK
    };
    let body = AgentsHealthResponse {
        status: if all_closed { "healthy".to_string() } else if any_available { "degraded".to_string() } else { "unavailable".to_string() },
        providers: health
            .into_iter()
            .map(|h| ProviderHealthEntry {
                id: h.id,
                name: h.name,
                state: format!("{:?}", h.state).to_lowercase(),
            })
            .collect(),
    };
    (status, Json(body))
}
