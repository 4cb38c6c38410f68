pub mod error_models;
pub mod problem_models;
pub mod user_models;
pub mod workspace_models;

pub use error_models::{ApiError, ServiceError};
pub use problem_models::{
    AddProblemRequest, NewReviewLog, NewTrackedProblem, ProblemBoard, ReviewLog, ReviewRequest,
    TrackedProblem,
};
pub use user_models::User;
pub use workspace_models::{
    AddShareRequest, ApiResponse, CreateWorkspaceRequest, NewWorkspace, NewWorkspaceShare,
    RevokeShareRequest, ShareDetails, SharedWorkspace, UpdateShareRequest, Workspace,
    WorkspaceShare,
};
