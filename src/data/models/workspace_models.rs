use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schema::{workspace_shares, workspaces};

/// A container of tracked problems, exclusively owned by its creator.
/// `owner_user_id` is recorded once at creation and never changes.
#[derive(Debug, Queryable, Selectable, Serialize)]
#[diesel(table_name = workspaces)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Workspace {
    pub workspace_id: i32,
    pub owner_user_id: i32,
    pub workspace_name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = workspaces)]
pub struct NewWorkspace<'a> {
    pub owner_user_id: i32,
    pub workspace_name: &'a str,
    pub created_at: NaiveDateTime,
}

/// One active role per user per workspace. The owner is never
/// represented here.
#[derive(Debug, Queryable, Selectable, Serialize)]
#[diesel(table_name = workspace_shares)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WorkspaceShare {
    pub workspace_id: i32,
    pub shared_user_id: i32,
    pub role: String,
    pub granted_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = workspace_shares)]
pub struct NewWorkspaceShare<'a> {
    pub workspace_id: i32,
    pub shared_user_id: i32,
    pub role: &'a str,
    pub granted_at: NaiveDateTime,
}

/// Request payload for creating a workspace
#[derive(Deserialize, Validate)]
pub struct CreateWorkspaceRequest {
    #[validate(length(min = 1, message = "Workspace name must not be empty"))]
    pub name: String,
}

/// Request payload for granting a role on a workspace
#[derive(Deserialize, Validate)]
pub struct AddShareRequest {
    pub workspace_id: i32,
    #[validate(email)]
    pub email: String,
    pub role: String,
}

/// Request payload for replacing a grantee's role
#[derive(Deserialize)]
pub struct UpdateShareRequest {
    pub workspace_id: i32,
    pub user_id: i32,
    pub role: String,
}

/// Request payload for revoking a grant
#[derive(Deserialize)]
pub struct RevokeShareRequest {
    pub workspace_id: i32,
    pub user_id: i32,
}

/// Standard API response format
#[derive(Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

/// A share row joined with the grantee's email, for the sharing table.
#[derive(Debug, Serialize)]
pub struct ShareDetails {
    pub shared_user_id: i32,
    pub email: String,
    pub role: String,
    pub granted_at: NaiveDateTime,
}

/// A workspace someone else shared with the caller.
#[derive(Debug, Serialize)]
pub struct SharedWorkspace {
    pub workspace_id: i32,
    pub workspace_name: String,
    pub owner_user_id: i32,
    pub role: String,
}
