use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::data::models::{NewWorkspaceShare, Workspace, WorkspaceShare};
use crate::schema::{users, workspace_shares, workspaces};

pub struct ShareRepository;

impl ShareRepository {
    pub fn find(
        conn: &mut SqliteConnection,
        workspace_id: i32,
        shared_user_id: i32,
    ) -> Result<Option<WorkspaceShare>, diesel::result::Error> {
        workspace_shares::table
            .filter(workspace_shares::workspace_id.eq(workspace_id))
            .filter(workspace_shares::shared_user_id.eq(shared_user_id))
            .select(WorkspaceShare::as_select())
            .first(conn)
            .optional()
    }

    pub fn count_for_workspace(
        conn: &mut SqliteConnection,
        workspace_id: i32,
    ) -> Result<i64, diesel::result::Error> {
        workspace_shares::table
            .filter(workspace_shares::workspace_id.eq(workspace_id))
            .count()
            .get_result(conn)
    }

    pub fn insert(
        conn: &mut SqliteConnection,
        workspace_id: i32,
        shared_user_id: i32,
        role: &str,
        granted_at: NaiveDateTime,
    ) -> Result<usize, diesel::result::Error> {
        diesel::insert_into(workspace_shares::table)
            .values(&NewWorkspaceShare {
                workspace_id,
                shared_user_id,
                role,
                granted_at,
            })
            .execute(conn)
    }

    /// Returns the number of rows removed; revoking a share that does
    /// not exist deletes nothing and is not an error.
    pub fn delete(
        conn: &mut SqliteConnection,
        workspace_id: i32,
        shared_user_id: i32,
    ) -> Result<usize, diesel::result::Error> {
        diesel::delete(
            workspace_shares::table
                .filter(workspace_shares::workspace_id.eq(workspace_id))
                .filter(workspace_shares::shared_user_id.eq(shared_user_id)),
        )
        .execute(conn)
    }

    pub fn update_role(
        conn: &mut SqliteConnection,
        workspace_id: i32,
        shared_user_id: i32,
        role: &str,
    ) -> Result<usize, diesel::result::Error> {
        diesel::update(
            workspace_shares::table
                .filter(workspace_shares::workspace_id.eq(workspace_id))
                .filter(workspace_shares::shared_user_id.eq(shared_user_id)),
        )
        .set(workspace_shares::role.eq(role))
        .execute(conn)
    }

    /// Shares on a workspace joined with each grantee's email.
    pub fn list_for_workspace(
        conn: &mut SqliteConnection,
        workspace_id: i32,
    ) -> Result<Vec<(WorkspaceShare, String)>, diesel::result::Error> {
        workspace_shares::table
            .filter(workspace_shares::workspace_id.eq(workspace_id))
            .inner_join(users::table)
            .order_by(workspace_shares::granted_at.asc())
            .select((WorkspaceShare::as_select(), users::email))
            .load(conn)
    }

    /// Workspaces shared with a user, with the granted role.
    pub fn list_for_user(
        conn: &mut SqliteConnection,
        shared_user_id: i32,
    ) -> Result<Vec<(WorkspaceShare, Workspace)>, diesel::result::Error> {
        workspace_shares::table
            .filter(workspace_shares::shared_user_id.eq(shared_user_id))
            .inner_join(workspaces::table)
            .order_by(workspace_shares::granted_at.asc())
            .select((WorkspaceShare::as_select(), Workspace::as_select()))
            .load(conn)
    }
}
