//! Project CRUD. Every handler resolves the caller's role from project
//! membership before checking `AuthContext::require`, since the bearer
//! auth layer only proves identity, not project membership (C1/C3).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use docforge_core::tenant::AuthContext;
use docforge_types::permissions::Permission;
use docforge_wire::projects::{CreateProjectRequest, ListProjectsQuery, ProjectResponse, UpdateProjectRequest};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

fn project_response(project: &docforge_types::tenant::Project) -> ProjectResponse {
    ProjectResponse {
        id: project.id,
        tenant_id: project.tenant_id,
        owner_id: project.owner_id,
        name: project.name.clone(),
        description: project.description.clone(),
        status: project.status,
        created_at: project.created_at,
        updated_at: project.updated_at,
    }
}

/// Resolves the caller's role within `project_id` and checks it against
/// `permission`, failing closed (no membership row = no access) the same
/// way `AuthContext::require` does for an unresolved role.
async fn authorize(state: &AppState, ctx: &AuthContext, project_id: Uuid, permission: Permission) -> Result<(), AppError> {
    let role = state.accounts.get_member_role(ctx.tenant_id, project_id, ctx.user_id).await?;
    let resolved = AuthContext {
        role,
        project_id: Some(project_id),
        ..ctx.clone()
    };
    resolved.require(permission)?;
    Ok(())
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Json<Vec<ProjectResponse>>, AppError> {
    let mut projects = state.accounts.list_projects(ctx.tenant_id).await?;
    if let Some(status) = query.status {
        projects.retain(|p| p.status == status);
    }
    Ok(Json(projects.iter().map(project_response).collect()))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), AppError> {
    let project = state
        .accounts
        .create_project(ctx.tenant_id, ctx.user_id, &body.name, body.description)
        .await?;
    Ok((StatusCode::CREATED, Json(project_response(&project))))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectResponse>, AppError> {
    authorize(&state, &ctx, project_id, Permission::ProjectRead).await?;
    let project = state
        .accounts
        .get_project(ctx.tenant_id, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("project not found".to_string()))?;
    Ok(Json(project_response(&project)))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectResponse>, AppError> {
    authorize(&state, &ctx, project_id, Permission::ProjectWrite).await?;
    let project = state
        .accounts
        .update_project(ctx.tenant_id, project_id, body.name, body.description, body.status)
        .await?;
    Ok(Json(project_response(&project)))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    authorize(&state, &ctx, project_id, Permission::ProjectDelete).await?;
    let deleted = state.accounts.soft_delete_project(ctx.tenant_id, project_id).await?;
    if !deleted {
        return Err(AppError::NotFound("project not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
