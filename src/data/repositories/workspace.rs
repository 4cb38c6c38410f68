use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::data::models::{NewWorkspace, Workspace};
use crate::data::repositories::last_insert_rowid;
use crate::schema::workspaces;

pub struct WorkspaceRepository;

impl WorkspaceRepository {
    pub fn create(
        conn: &mut SqliteConnection,
        owner_user_id: i32,
        workspace_name: &str,
        created_at: NaiveDateTime,
    ) -> Result<Workspace, diesel::result::Error> {
        diesel::insert_into(workspaces::table)
            .values(&NewWorkspace {
                owner_user_id,
                workspace_name,
                created_at,
            })
            .execute(conn)?;

        let workspace_id = last_insert_rowid(conn)?;
        workspaces::table
            .filter(workspaces::workspace_id.eq(workspace_id))
            .select(Workspace::as_select())
            .first(conn)
    }

    pub fn find(
        conn: &mut SqliteConnection,
        workspace_id: i32,
    ) -> Result<Option<Workspace>, diesel::result::Error> {
        workspaces::table
            .filter(workspaces::workspace_id.eq(workspace_id))
            .select(Workspace::as_select())
            .first(conn)
            .optional()
    }

    pub fn delete(
        conn: &mut SqliteConnection,
        workspace_id: i32,
    ) -> Result<usize, diesel::result::Error> {
        diesel::delete(workspaces::table.filter(workspaces::workspace_id.eq(workspace_id)))
            .execute(conn)
    }

    pub fn list_owned(
        conn: &mut SqliteConnection,
        owner_user_id: i32,
    ) -> Result<Vec<Workspace>, diesel::result::Error> {
        workspaces::table
            .filter(workspaces::owner_user_id.eq(owner_user_id))
            .order_by(workspaces::created_at.asc())
            .select(Workspace::as_select())
            .load(conn)
    }
}
