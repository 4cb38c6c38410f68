use std::sync::Arc;

use chrono::Utc;

use crate::data::models::{ServiceError, ShareDetails, SharedWorkspace};
use crate::data::repositories::{ShareRepository, UserRepository};
use crate::features::access::policy::{PolicyClient, ResourceInstance};
use crate::features::access::{CapabilityChecker, Role};
use crate::DbPool;

/// Active shares a single workspace may hold.
pub const MAX_WORKSPACE_SHARES: i64 = 5;

/// Maintains (workspace, user, role) grants and mirrors every local
/// mutation into the policy store. All operations are owner-only.
///
/// The registry is the source of truth for "is this share active"; the
/// policy store follows it. When the two cannot be kept consistent the
/// local write is rolled back on `add_share`, force-kept on
/// `update_share`, and kept on `revoke_share` unless
/// `rollback_on_revoke_failure` is enabled.
pub struct ShareRegistry {
    pool: DbPool,
    policy: Arc<dyn PolicyClient>,
    checker: CapabilityChecker,
    rollback_on_revoke_failure: bool,
}

impl ShareRegistry {
    pub fn new(pool: DbPool, policy: Arc<dyn PolicyClient>) -> Self {
        let checker = CapabilityChecker::new(policy.clone());
        ShareRegistry {
            pool,
            policy,
            checker,
            rollback_on_revoke_failure: false,
        }
    }

    /// Tightens `revoke_share` to restore the local row when the policy
    /// store cannot be updated. Off by default: a drifted external grant
    /// is harmless until it is next checked against the local registry.
    pub fn with_rollback_on_revoke_failure(mut self, enabled: bool) -> Self {
        self.rollback_on_revoke_failure = enabled;
        self
    }

    pub async fn add_share(
        &self,
        caller_id: i32,
        workspace_id: i32,
        target_email: &str,
        role: Role,
    ) -> Result<ShareDetails, ServiceError> {
        self.checker.require_owner(caller_id, workspace_id).await?;

        let granted_at = Utc::now().naive_utc();
        let target = {
            let mut conn = self.pool.get()?;

            let current = ShareRepository::count_for_workspace(&mut conn, workspace_id)?;
            if current >= MAX_WORKSPACE_SHARES {
                return Err(ServiceError::Conflict(format!(
                    "Maximum share limit ({}) reached",
                    MAX_WORKSPACE_SHARES
                )));
            }

            let target = UserRepository::find_by_email(&mut conn, target_email)?
                .ok_or(ServiceError::NotFound("User"))?;

            if ShareRepository::find(&mut conn, workspace_id, target.user_id)?.is_some() {
                return Err(ServiceError::Conflict("Share already exists".into()));
            }

            ShareRepository::insert(
                &mut conn,
                workspace_id,
                target.user_id,
                role.as_str(),
                granted_at,
            )?;
            target
        };

        let resource = ResourceInstance::workspace(workspace_id);
        if let Err(e) = self
            .policy
            .assign_role(&target.user_id.to_string(), &resource, role)
            .await
        {
            log::error!(
                "role assignment failed for user {} on workspace {}: {}",
                target.user_id,
                workspace_id,
                e
            );
            // The two stores must not diverge: take the local grant back.
            let mut conn = self.pool.get()?;
            if let Err(rollback) = ShareRepository::delete(&mut conn, workspace_id, target.user_id)
            {
                log::error!("share rollback also failed: {}", rollback);
            }
            return Err(ServiceError::PropagationFailure(
                "Failed to assign role in policy store".into(),
            ));
        }

        Ok(ShareDetails {
            shared_user_id: target.user_id,
            email: target.email,
            role: role.as_str().to_string(),
            granted_at,
        })
    }

    pub async fn revoke_share(
        &self,
        caller_id: i32,
        workspace_id: i32,
        target_user_id: i32,
    ) -> Result<(), ServiceError> {
        self.checker.require_owner(caller_id, workspace_id).await?;

        let prior = {
            let mut conn = self.pool.get()?;
            let prior = ShareRepository::find(&mut conn, workspace_id, target_user_id)?;
            ShareRepository::delete(&mut conn, workspace_id, target_user_id)?;
            prior
        };

        // The stored role is not trusted to match the policy store, so
        // every grantable role is unassigned; absent grants are no-ops.
        let resource = ResourceInstance::workspace(workspace_id);
        let mut propagation_error = None;
        for role in Role::GRANTABLE {
            if let Err(e) = self
                .policy
                .unassign_role(&target_user_id.to_string(), &resource, role)
                .await
            {
                propagation_error.get_or_insert(e);
            }
        }

        let Some(e) = propagation_error else {
            return Ok(());
        };

        if self.rollback_on_revoke_failure {
            if let Some(prior) = prior {
                let mut conn = self.pool.get()?;
                ShareRepository::insert(
                    &mut conn,
                    workspace_id,
                    target_user_id,
                    &prior.role,
                    prior.granted_at,
                )?;
            }
            return Err(ServiceError::PropagationFailure(
                "Failed to unassign role in policy store".into(),
            ));
        }

        // Local deletion is authoritative; a stale external grant is
        // tolerated until next checked against the registry.
        log::error!(
            "failed to unassign policy roles for user {} on workspace {}: {}",
            target_user_id,
            workspace_id,
            e
        );
        Ok(())
    }

    pub async fn update_share(
        &self,
        caller_id: i32,
        workspace_id: i32,
        target_user_id: i32,
        new_role: Role,
    ) -> Result<(), ServiceError> {
        self.checker.require_owner(caller_id, workspace_id).await?;

        {
            let mut conn = self.pool.get()?;
            ShareRepository::find(&mut conn, workspace_id, target_user_id)?
                .ok_or(ServiceError::NotFound("Share"))?;
            ShareRepository::update_role(&mut conn, workspace_id, target_user_id, new_role.as_str())?;
        }

        let resource = ResourceInstance::workspace(workspace_id);
        let target_key = target_user_id.to_string();
        let result: Result<(), _> = async {
            for role in Role::GRANTABLE {
                self.policy.unassign_role(&target_key, &resource, role).await?;
            }
            self.policy.assign_role(&target_key, &resource, new_role).await
        }
        .await;

        if let Err(e) = result {
            log::error!(
                "role update propagation failed for user {} on workspace {}: {}",
                target_user_id,
                workspace_id,
                e
            );
            // Keep the local row on the new role; the caller is told the
            // policy store may be stale.
            let mut conn = self.pool.get()?;
            if let Err(retry) =
                ShareRepository::update_role(&mut conn, workspace_id, target_user_id, new_role.as_str())
            {
                log::error!("local role force-set also failed: {}", retry);
            }
            return Err(ServiceError::PropagationFailure(
                "Failed to update role in policy store".into(),
            ));
        }

        Ok(())
    }

    pub async fn list_shares(
        &self,
        caller_id: i32,
        workspace_id: i32,
    ) -> Result<Vec<ShareDetails>, ServiceError> {
        self.checker.require_owner(caller_id, workspace_id).await?;

        let mut conn = self.pool.get()?;
        let shares = ShareRepository::list_for_workspace(&mut conn, workspace_id)?
            .into_iter()
            .map(|(share, email)| ShareDetails {
                shared_user_id: share.shared_user_id,
                email,
                role: share.role,
                granted_at: share.granted_at,
            })
            .collect();
        Ok(shares)
    }

    /// Workspaces other users shared with the caller. Self-scoped, so no
    /// policy round-trip is needed: holding a share row implies read.
    pub async fn list_shared_workspaces(
        &self,
        caller_id: i32,
    ) -> Result<Vec<SharedWorkspace>, ServiceError> {
        let mut conn = self.pool.get()?;
        let shares = ShareRepository::list_for_user(&mut conn, caller_id)?
            .into_iter()
            .map(|(share, workspace)| SharedWorkspace {
                workspace_id: workspace.workspace_id,
                workspace_name: workspace.workspace_name,
                owner_user_id: workspace.owner_user_id,
                role: share.role,
            })
            .collect();
        Ok(shares)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::data::models::ServiceError;
    use crate::features::access::policy::{MemoryPolicyClient, PolicyError};
    use crate::features::access::Action;
    use crate::features::workspaces::WorkspaceService;
    use crate::test_support::{insert_user, test_db, TestDb};

    struct Fixture {
        db: TestDb,
        policy: Arc<MemoryPolicyClient>,
        registry: ShareRegistry,
        owner_id: i32,
        workspace_id: i32,
    }

    async fn fixture() -> Fixture {
        let db = test_db();
        let policy: Arc<MemoryPolicyClient> = Arc::new(MemoryPolicyClient::new());
        let owner_id = insert_user(&db.pool, "owner@example.com");

        let workspaces = WorkspaceService::new(db.pool.clone(), policy.clone());
        let workspace = workspaces.create_workspace(owner_id, "grind").await.unwrap();

        let registry = ShareRegistry::new(db.pool.clone(), policy.clone());
        Fixture {
            db,
            policy,
            registry,
            owner_id,
            workspace_id: workspace.workspace_id,
        }
    }

    #[tokio::test]
    async fn add_share_grants_role_in_both_stores() {
        let f = fixture().await;
        let bob = insert_user(&f.db.pool, "bob@example.com");

        let share = f
            .registry
            .add_share(f.owner_id, f.workspace_id, "bob@example.com", Role::Reviewer)
            .await
            .unwrap();
        assert_eq!(share.shared_user_id, bob);
        assert_eq!(share.role, "reviewer");

        let resource = ResourceInstance::workspace(f.workspace_id);
        assert!(f
            .policy
            .check(&bob.to_string(), Action::Review, &resource)
            .await
            .unwrap());
        assert!(!f
            .policy
            .check(&bob.to_string(), Action::Create, &resource)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn only_the_owner_may_share() {
        let f = fixture().await;
        let bob = insert_user(&f.db.pool, "bob@example.com");
        insert_user(&f.db.pool, "carol@example.com");

        let result = f
            .registry
            .add_share(bob, f.workspace_id, "carol@example.com", Role::Viewer)
            .await;
        assert!(matches!(result, Err(ServiceError::PermissionDenied)));
    }

    #[tokio::test]
    async fn sharing_with_an_unknown_email_is_not_found() {
        let f = fixture().await;
        let result = f
            .registry
            .add_share(f.owner_id, f.workspace_id, "ghost@example.com", Role::Viewer)
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound("User"))));
    }

    #[tokio::test]
    async fn duplicate_share_is_a_conflict() {
        let f = fixture().await;
        insert_user(&f.db.pool, "bob@example.com");

        f.registry
            .add_share(f.owner_id, f.workspace_id, "bob@example.com", Role::Viewer)
            .await
            .unwrap();
        let result = f
            .registry
            .add_share(f.owner_id, f.workspace_id, "bob@example.com", Role::Editor)
            .await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn sixth_share_is_a_conflict() {
        let f = fixture().await;
        for i in 0..5 {
            let email = format!("user{}@example.com", i);
            insert_user(&f.db.pool, &email);
            f.registry
                .add_share(f.owner_id, f.workspace_id, &email, Role::Viewer)
                .await
                .unwrap();
        }

        insert_user(&f.db.pool, "overflow@example.com");
        let result = f
            .registry
            .add_share(f.owner_id, f.workspace_id, "overflow@example.com", Role::Viewer)
            .await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn revoke_removes_the_share_and_the_policy_grant() {
        let f = fixture().await;
        let bob = insert_user(&f.db.pool, "bob@example.com");
        f.registry
            .add_share(f.owner_id, f.workspace_id, "bob@example.com", Role::Editor)
            .await
            .unwrap();

        f.registry
            .revoke_share(f.owner_id, f.workspace_id, bob)
            .await
            .unwrap();

        assert!(f
            .registry
            .list_shares(f.owner_id, f.workspace_id)
            .await
            .unwrap()
            .is_empty());
        let resource = ResourceInstance::workspace(f.workspace_id);
        assert!(!f
            .policy
            .check(&bob.to_string(), Action::Read, &resource)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn revoking_a_nonexistent_share_is_a_no_op() {
        let f = fixture().await;
        let bob = insert_user(&f.db.pool, "bob@example.com");
        f.registry
            .revoke_share(f.owner_id, f.workspace_id, bob)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_replaces_the_role_everywhere() {
        let f = fixture().await;
        let bob = insert_user(&f.db.pool, "bob@example.com");
        f.registry
            .add_share(f.owner_id, f.workspace_id, "bob@example.com", Role::Viewer)
            .await
            .unwrap();

        f.registry
            .update_share(f.owner_id, f.workspace_id, bob, Role::Editor)
            .await
            .unwrap();

        let shares = f.registry.list_shares(f.owner_id, f.workspace_id).await.unwrap();
        assert_eq!(shares[0].role, "editor");

        let resource = ResourceInstance::workspace(f.workspace_id);
        assert_eq!(
            f.policy.user_roles(&bob.to_string(), &resource).await.unwrap(),
            vec![Role::Editor]
        );
    }

    #[tokio::test]
    async fn updating_a_nonexistent_share_is_not_found() {
        let f = fixture().await;
        let bob = insert_user(&f.db.pool, "bob@example.com");
        let result = f
            .registry
            .update_share(f.owner_id, f.workspace_id, bob, Role::Editor)
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound("Share"))));
    }

    #[tokio::test]
    async fn shared_workspaces_are_listed_for_the_grantee() {
        let f = fixture().await;
        let bob = insert_user(&f.db.pool, "bob@example.com");
        f.registry
            .add_share(f.owner_id, f.workspace_id, "bob@example.com", Role::Reviewer)
            .await
            .unwrap();

        let shared = f.registry.list_shared_workspaces(bob).await.unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].workspace_id, f.workspace_id);
        assert_eq!(shared[0].role, "reviewer");

        assert!(f
            .registry
            .list_shared_workspaces(f.owner_id)
            .await
            .unwrap()
            .is_empty());
    }

    /// Policy double whose mutations can be switched to fail while
    /// decisions keep working, for exercising the propagation paths.
    struct FlakyPolicyClient {
        inner: MemoryPolicyClient,
        fail_assign: AtomicBool,
        fail_unassign: AtomicBool,
    }

    impl FlakyPolicyClient {
        fn new() -> Self {
            FlakyPolicyClient {
                inner: MemoryPolicyClient::new(),
                fail_assign: AtomicBool::new(false),
                fail_unassign: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl PolicyClient for FlakyPolicyClient {
        async fn check(
            &self,
            user_key: &str,
            action: Action,
            resource: &ResourceInstance,
        ) -> Result<bool, PolicyError> {
            self.inner.check(user_key, action, resource).await
        }

        async fn user_roles(
            &self,
            user_key: &str,
            resource: &ResourceInstance,
        ) -> Result<Vec<Role>, PolicyError> {
            self.inner.user_roles(user_key, resource).await
        }

        async fn sync_resource(&self, resource: &ResourceInstance) -> Result<(), PolicyError> {
            self.inner.sync_resource(resource).await
        }

        async fn assign_role(
            &self,
            user_key: &str,
            resource: &ResourceInstance,
            role: Role,
        ) -> Result<(), PolicyError> {
            if self.fail_assign.load(Ordering::SeqCst) {
                return Err(PolicyError::Api(500));
            }
            self.inner.assign_role(user_key, resource, role).await
        }

        async fn unassign_role(
            &self,
            user_key: &str,
            resource: &ResourceInstance,
            role: Role,
        ) -> Result<(), PolicyError> {
            if self.fail_unassign.load(Ordering::SeqCst) {
                return Err(PolicyError::Api(500));
            }
            self.inner.unassign_role(user_key, resource, role).await
        }
    }

    async fn flaky_fixture() -> (TestDb, Arc<FlakyPolicyClient>, ShareRegistry, i32, i32) {
        let db = test_db();
        let policy = Arc::new(FlakyPolicyClient::new());
        let owner_id = insert_user(&db.pool, "owner@example.com");

        let workspaces = WorkspaceService::new(db.pool.clone(), policy.clone());
        let workspace = workspaces.create_workspace(owner_id, "grind").await.unwrap();

        let registry = ShareRegistry::new(db.pool.clone(), policy.clone());
        (db, policy, registry, owner_id, workspace.workspace_id)
    }

    #[tokio::test]
    async fn failed_assignment_rolls_the_share_back() {
        let (db, policy, registry, owner_id, workspace_id) = flaky_fixture().await;
        insert_user(&db.pool, "bob@example.com");
        policy.fail_assign.store(true, Ordering::SeqCst);

        let result = registry
            .add_share(owner_id, workspace_id, "bob@example.com", Role::Editor)
            .await;
        assert!(matches!(result, Err(ServiceError::PropagationFailure(_))));

        // The local write must not survive the failed mirror.
        assert!(registry
            .list_shares(owner_id, workspace_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn failed_revoke_propagation_keeps_the_deletion() {
        let (db, policy, registry, owner_id, workspace_id) = flaky_fixture().await;
        let bob = insert_user(&db.pool, "bob@example.com");
        registry
            .add_share(owner_id, workspace_id, "bob@example.com", Role::Viewer)
            .await
            .unwrap();

        policy.fail_unassign.store(true, Ordering::SeqCst);
        registry.revoke_share(owner_id, workspace_id, bob).await.unwrap();

        // The registry is authoritative: the share stays gone even
        // though the policy grant drifted.
        assert!(registry
            .list_shares(owner_id, workspace_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn failed_revoke_propagation_restores_the_share_when_configured() {
        let (db, policy, registry, owner_id, workspace_id) = flaky_fixture().await;
        let registry = registry.with_rollback_on_revoke_failure(true);
        let bob = insert_user(&db.pool, "bob@example.com");
        registry
            .add_share(owner_id, workspace_id, "bob@example.com", Role::Viewer)
            .await
            .unwrap();

        policy.fail_unassign.store(true, Ordering::SeqCst);
        let result = registry.revoke_share(owner_id, workspace_id, bob).await;
        assert!(matches!(result, Err(ServiceError::PropagationFailure(_))));

        let shares = registry.list_shares(owner_id, workspace_id).await.unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].role, "viewer");
    }

    #[tokio::test]
    async fn failed_update_propagation_keeps_the_new_role_and_reports() {
        let (db, policy, registry, owner_id, workspace_id) = flaky_fixture().await;
        let bob = insert_user(&db.pool, "bob@example.com");
        registry
            .add_share(owner_id, workspace_id, "bob@example.com", Role::Viewer)
            .await
            .unwrap();

        policy.fail_assign.store(true, Ordering::SeqCst);
        let result = registry
            .update_share(owner_id, workspace_id, bob, Role::Editor)
            .await;
        assert!(matches!(result, Err(ServiceError::PropagationFailure(_))));

        // Local row keeps the requested role so the UI can warn that
        // policy may be stale.
        let shares = registry.list_shares(owner_id, workspace_id).await.unwrap();
        assert_eq!(shares[0].role, "editor");
    }
}
