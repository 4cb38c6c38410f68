use std::sync::Arc;

use axum::extract::{Json, State};
use tower_sessions::Session;
use validator::Validate;

use crate::data::models::{ApiError, CreateWorkspaceRequest, SharedWorkspace, Workspace};
use crate::features::sharing::ShareRegistry;
use crate::features::workspaces::WorkspaceService;
use crate::utils::get_current_user_id;

pub async fn create_workspace(
    State((service, _)): State<(Arc<WorkspaceService>, Arc<ShareRegistry>)>,
    session: Session,
    Json(payload): Json<CreateWorkspaceRequest>,
) -> Result<Json<Workspace>, ApiError> {
    let user_id = get_current_user_id(&session)
        .await
        .ok_or(ApiError::Unauthorized)?;
    payload.validate()?;

    let workspace = service.create_workspace(user_id, &payload.name).await?;
    Ok(Json(workspace))
}

pub async fn list_workspaces(
    State((service, _)): State<(Arc<WorkspaceService>, Arc<ShareRegistry>)>,
    session: Session,
) -> Result<Json<Vec<Workspace>>, ApiError> {
    let user_id = get_current_user_id(&session)
        .await
        .ok_or(ApiError::Unauthorized)?;

    let workspaces = service.list_workspaces(user_id).await?;
    Ok(Json(workspaces))
}

pub async fn list_shared_workspaces(
    State((_, registry)): State<(Arc<WorkspaceService>, Arc<ShareRegistry>)>,
    session: Session,
) -> Result<Json<Vec<SharedWorkspace>>, ApiError> {
    let user_id = get_current_user_id(&session)
        .await
        .ok_or(ApiError::Unauthorized)?;

    let shared = registry.list_shared_workspaces(user_id).await?;
    Ok(Json(shared))
}
