use std::sync::Arc;

use axum::extract::{Json, Path, State};
use tower_sessions::Session;
use validator::Validate;

use crate::data::models::{
    AddShareRequest, ApiError, ApiResponse, RevokeShareRequest, ShareDetails, UpdateShareRequest,
};
use crate::features::access::{ParseRoleError, Role};
use crate::features::sharing::ShareRegistry;
use crate::utils::get_current_user_id;

/// Only the grantable roles are accepted over the API; ownership is not
/// transferable through sharing.
fn parse_grantable_role(raw: &str) -> Result<Role, ApiError> {
    let role: Role = raw
        .parse()
        .map_err(|e: ParseRoleError| ApiError::Validation(e.to_string()))?;
    if !Role::GRANTABLE.contains(&role) {
        return Err(ApiError::Validation(
            "Role must be viewer, reviewer or editor".into(),
        ));
    }
    Ok(role)
}

pub async fn add_share(
    State(registry): State<Arc<ShareRegistry>>,
    session: Session,
    Json(payload): Json<AddShareRequest>,
) -> Result<Json<ShareDetails>, ApiError> {
    let user_id = get_current_user_id(&session)
        .await
        .ok_or(ApiError::Unauthorized)?;
    payload.validate()?;
    let role = parse_grantable_role(&payload.role)?;

    let share = registry
        .add_share(user_id, payload.workspace_id, &payload.email, role)
        .await?;
    Ok(Json(share))
}

pub async fn update_share(
    State(registry): State<Arc<ShareRegistry>>,
    session: Session,
    Json(payload): Json<UpdateShareRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let user_id = get_current_user_id(&session)
        .await
        .ok_or(ApiError::Unauthorized)?;
    let role = parse_grantable_role(&payload.role)?;

    registry
        .update_share(user_id, payload.workspace_id, payload.user_id, role)
        .await?;
    Ok(Json(ApiResponse {
        success: true,
        message: "Share updated".to_string(),
    }))
}

pub async fn revoke_share(
    State(registry): State<Arc<ShareRegistry>>,
    session: Session,
    Json(payload): Json<RevokeShareRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let user_id = get_current_user_id(&session)
        .await
        .ok_or(ApiError::Unauthorized)?;

    registry
        .revoke_share(user_id, payload.workspace_id, payload.user_id)
        .await?;
    Ok(Json(ApiResponse {
        success: true,
        message: "Share revoked".to_string(),
    }))
}

pub async fn list_shares(
    State(registry): State<Arc<ShareRegistry>>,
    session: Session,
    Path(workspace_id): Path<i32>,
) -> Result<Json<Vec<ShareDetails>>, ApiError> {
    let user_id = get_current_user_id(&session)
        .await
        .ok_or(ApiError::Unauthorized)?;

    let shares = registry.list_shares(user_id, workspace_id).await?;
    Ok(Json(shares))
}
