use std::sync::Arc;

use axum::extract::{Json, Path, State};
use tower_sessions::Session;
use validator::Validate;

use crate::data::models::{
    AddProblemRequest, ApiError, ProblemBoard, ReviewLog, ReviewRequest, TrackedProblem,
};
use crate::features::scheduling::{SchedulingService, Score};
use crate::utils::get_current_user_id;

pub async fn add_problem(
    State(service): State<Arc<SchedulingService>>,
    session: Session,
    Json(payload): Json<AddProblemRequest>,
) -> Result<Json<TrackedProblem>, ApiError> {
    let user_id = get_current_user_id(&session)
        .await
        .ok_or(ApiError::Unauthorized)?;
    payload.validate()?;

    let item = service
        .add_tracked_problem(user_id, payload.workspace_id, &payload.problem_ref)
        .await?;
    Ok(Json(item))
}

pub async fn review_problem(
    State(service): State<Arc<SchedulingService>>,
    session: Session,
    Path(tracked_problem_id): Path<i32>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<TrackedProblem>, ApiError> {
    let user_id = get_current_user_id(&session)
        .await
        .ok_or(ApiError::Unauthorized)?;
    payload.validate()?;
    let score = Score::from_rating(payload.score)
        .ok_or_else(|| ApiError::Validation("Score must be between 0 and 3".into()))?;

    let item = service
        .submit_review(user_id, tracked_problem_id, score)
        .await?;
    Ok(Json(item))
}

pub async fn list_problems(
    State(service): State<Arc<SchedulingService>>,
    session: Session,
    Path(workspace_id): Path<i32>,
) -> Result<Json<ProblemBoard>, ApiError> {
    let user_id = get_current_user_id(&session)
        .await
        .ok_or(ApiError::Unauthorized)?;

    let board = service.list_tracked_problems(user_id, workspace_id).await?;
    Ok(Json(board))
}

pub async fn review_history(
    State(service): State<Arc<SchedulingService>>,
    session: Session,
    Path(tracked_problem_id): Path<i32>,
) -> Result<Json<Vec<ReviewLog>>, ApiError> {
    let user_id = get_current_user_id(&session)
        .await
        .ok_or(ApiError::Unauthorized)?;

    let history = service.review_history(user_id, tracked_problem_id).await?;
    Ok(Json(history))
}
