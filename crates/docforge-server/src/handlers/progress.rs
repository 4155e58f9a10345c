//! Snapshot of per-stage progress (`GET /projects/{id}/progress`), derived
//! from which stage documents already exist rather than from a live event
//! stream — a point-in-time read, unlike `/events`.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use docforge_core::tenant::AuthContext;
use docforge_types::execution::{ExecutionStatus, Stage};
use docforge_types::permissions::Permission;
use docforge_wire::progress::{ProgressResponse, StageProgress};
use uuid::Uuid;

use crate::error::AppError;
use crate::handlers::stages::document_type_for;
use crate::state::AppState;

pub async fn get_progress(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProgressResponse>, AppError> {
    let role = state.accounts.get_member_role(ctx.tenant_id, project_id, ctx.user_id).await?;
    let resolved = AuthContext {
        role,
        project_id: Some(project_id),
        ..ctx.clone()
    };
    resolved.require(Permission::ProjectRead)?;

    state
        .accounts
        .get_project(ctx.tenant_id, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("project not found".to_string()))?;

    let mut stages = Vec::with_capacity(Stage::ORDER.len());
    let mut completed = 0u32;
    for stage in Stage::ORDER {
        let doc = state.documents.latest(ctx.tenant_id, project_id, document_type_for(stage), None).await?;
        let status = if doc.is_some() {
            completed += 1;
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Pending
        };
        stages.push(StageProgress {
            stage,
            status,
            document_version: doc.map(|d| d.version),
        });
    }

    let overall_percent = (completed as f64 / Stage::ORDER.len() as f64) * 100.0;
    Ok(Json(ProgressResponse {
        project_id,
        overall_percent,
        stages,
    }))
}
