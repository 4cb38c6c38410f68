use axum::extract::{Json, State};
use serde::Deserialize;
use tower_sessions::Session;

use crate::data::models::{ApiError, ApiResponse, ServiceError, User};
use crate::data::repositories::UserRepository;
use crate::utils::set_user_session;
use crate::DbPool;

#[derive(Deserialize)]
pub struct AttachSessionRequest {
    pub user_id: i32,
}

/// Binds an identity-provider user id to the session. The id is trusted
/// as given; credential checks belong to the identity provider upstream.
pub async fn attach_session(
    State(pool): State<DbPool>,
    session: Session,
    Json(payload): Json<AttachSessionRequest>,
) -> Result<Json<User>, ApiError> {
    let user = {
        let mut conn = pool.get().map_err(ServiceError::from)?;
        UserRepository::find_by_id(&mut conn, payload.user_id)
            .map_err(ServiceError::from)?
            .ok_or(ServiceError::NotFound("User"))?
    };

    set_user_session(&session, user.user_id, &user.email).await?;
    Ok(Json(user))
}

pub async fn detach_session(session: Session) -> Result<Json<ApiResponse>, ApiError> {
    session.delete().await.map_err(|e| {
        log::error!("Failed to delete session: {}", e);
        ApiError::Service(ServiceError::StorageFailure(e.to_string()))
    })?;
    Ok(Json(ApiResponse {
        success: true,
        message: "Logged out".to_string(),
    }))
}
