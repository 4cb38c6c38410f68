use std::sync::Arc;

use chrono::Utc;

use crate::data::models::{ServiceError, Workspace};
use crate::data::repositories::WorkspaceRepository;
use crate::features::access::policy::{PolicyClient, ResourceInstance};
use crate::features::access::Role;
use crate::DbPool;

/// Creates and lists workspaces. Ownership is recorded once at creation,
/// both locally and as an `owner` grant in the policy store.
pub struct WorkspaceService {
    pool: DbPool,
    policy: Arc<dyn PolicyClient>,
}

impl WorkspaceService {
    pub fn new(pool: DbPool, policy: Arc<dyn PolicyClient>) -> Self {
        WorkspaceService { pool, policy }
    }

    pub async fn create_workspace(
        &self,
        caller_id: i32,
        name: &str,
    ) -> Result<Workspace, ServiceError> {
        let workspace = {
            let mut conn = self.pool.get()?;
            WorkspaceRepository::create(&mut conn, caller_id, name, Utc::now().naive_utc())?
        };

        let resource = ResourceInstance::workspace(workspace.workspace_id);
        let propagated: Result<(), _> = async {
            self.policy.sync_resource(&resource).await?;
            self.policy
                .assign_role(&caller_id.to_string(), &resource, Role::Owner)
                .await
        }
        .await;

        if let Err(e) = propagated {
            log::error!(
                "owner grant failed for workspace {}: {}",
                workspace.workspace_id,
                e
            );
            // A workspace nobody owns is unusable; take it back.
            let mut conn = self.pool.get()?;
            if let Err(rollback) = WorkspaceRepository::delete(&mut conn, workspace.workspace_id) {
                log::error!("workspace rollback also failed: {}", rollback);
            }
            return Err(ServiceError::PropagationFailure(
                "Failed to assign owner role in policy store".into(),
            ));
        }

        Ok(workspace)
    }

    pub async fn list_workspaces(&self, caller_id: i32) -> Result<Vec<Workspace>, ServiceError> {
        let mut conn = self.pool.get()?;
        Ok(WorkspaceRepository::list_owned(&mut conn, caller_id)?)
    }
}
