//! Export lifecycle: `POST /projects/{id}/export` kicks off generation and
//! returns immediately with a Pending export; `GET /exports/{id}` serves the
//! archive once it's done. Generation runs in the background so the create
//! call doesn't block on zipping every document in the project.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use docforge_core::tenant::AuthContext;
use docforge_types::export::ExportStatus;
use docforge_types::permissions::Permission;
use docforge_wire::export::{CreateExportRequest, ExportResponse};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

fn status_str(status: ExportStatus) -> &'static str {
    match status {
        ExportStatus::Pending => "PENDING",
        ExportStatus::Generating => "GENERATING",
        ExportStatus::Completed => "COMPLETED",
        ExportStatus::Failed => "FAILED",
        ExportStatus::Expired => "EXPIRED",
    }
}

pub async fn create_export(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<CreateExportRequest>,
) -> Result<(StatusCode, Json<ExportResponse>), AppError> {
    let role = state.accounts.get_member_role(ctx.tenant_id, project_id, ctx.user_id).await?;
    let resolved = AuthContext {
        role,
        project_id: Some(project_id),
        ..ctx.clone()
    };
    resolved.require(Permission::ExportDocuments)?;

    state
        .accounts
        .get_project(ctx.tenant_id, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("project not found".to_string()))?;

    let export = state
        .exports
        .create_export(ctx.tenant_id, project_id, ctx.user_id, body.expires_in_hours)
        .await?;

    let exports = state.exports.clone();
    let export_id = export.id;
    tokio::spawn(async move {
        if let Err(err) = exports.generate_export(export_id).await {
            tracing::warn!(export_id = %export_id, error = %err, "export generation failed");
        }
    });

    Ok((
        StatusCode::OK,
        Json(ExportResponse {
            export_id: export.id,
            status: status_str(export.status).to_string(),
            expires_at: Some(export.expires_at),
            manifest: None,
        }),
    ))
}

/// Not project-scoped in the path, so authorization is resolved from the
/// export record's own tenant/project rather than a path segment.
pub async fn download_export(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(export_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let export = state.exports.get(export_id).await?;
    if export.tenant_id != ctx.tenant_id {
        return Err(AppError::NotFound("export not found".to_string()));
    }
    let role = state.accounts.get_member_role(ctx.tenant_id, export.project_id, ctx.user_id).await?;
    let resolved = AuthContext {
        role,
        project_id: Some(export.project_id),
        ..ctx.clone()
    };
    resolved.require(Permission::ExportDocuments)?;

    if !export.is_downloadable(Utc::now()) {
        return Err(AppError::NotFound("export is not ready or has expired".to_string()));
    }
    let file_path = export.file_path.as_deref().expect("is_downloadable checked file_path is present");
    let bytes = tokio::fs::read(file_path).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"export-{export_id}.zip\"")),
        ],
        Body::from(bytes),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_str_matches_the_wire_uppercase_convention() {
        assert_eq!(status_str(ExportStatus::Pending), "PENDING");
        assert_eq!(status_str(ExportStatus::Completed), "COMPLETED");
        assert_eq!(status_str(ExportStatus::Expired), "EXPIRED");
    }
}
