use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::data::models::ServiceError;
use crate::features::access::policy::{PolicyClient, ResourceInstance};

/// Actions that can be attempted against a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Review,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Review,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Review => "review",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access level a user holds on a single workspace. `Owner` is implicit
/// (inferred from the workspace creator, never stored as a share row);
/// the other three are grantable through the share registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Viewer,
    Reviewer,
    Editor,
    Owner,
}

impl Role {
    /// Roles that can be granted to another user on a shared workspace.
    pub const GRANTABLE: [Role; 3] = [Role::Viewer, Role::Reviewer, Role::Editor];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Reviewer => "reviewer",
            Role::Editor => "editor",
            Role::Owner => "owner",
        }
    }

    /// The capability table. Every permission decision in the system
    /// reduces to this mapping.
    pub fn allows(self, action: Action) -> bool {
        match self {
            Role::Owner => true,
            Role::Editor => matches!(
                action,
                Action::Create | Action::Read | Action::Update | Action::Review
            ),
            Role::Reviewer => {
                matches!(action, Action::Read | Action::Update | Action::Review)
            }
            Role::Viewer => matches!(action, Action::Read),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("Unknown role: {0}")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(Role::Viewer),
            "reviewer" => Ok(Role::Reviewer),
            "editor" => Ok(Role::Editor),
            "owner" => Ok(Role::Owner),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// Answers "can user U perform action A on workspace W?" by asking the
/// policy decision service. Side-effect free; safe to call redundantly.
#[derive(Clone)]
pub struct CapabilityChecker {
    policy: Arc<dyn PolicyClient>,
}

impl CapabilityChecker {
    pub fn new(policy: Arc<dyn PolicyClient>) -> Self {
        CapabilityChecker { policy }
    }

    pub async fn check(
        &self,
        user_id: i32,
        action: Action,
        workspace_id: i32,
    ) -> Result<bool, ServiceError> {
        let resource = ResourceInstance::workspace(workspace_id);
        Ok(self
            .policy
            .check(&user_id.to_string(), action, &resource)
            .await?)
    }

    /// Gate used before every state-mutating or data-revealing operation.
    /// A negative answer always surfaces as `PermissionDenied`, never as
    /// any other error class.
    pub async fn require(
        &self,
        user_id: i32,
        action: Action,
        workspace_id: i32,
    ) -> Result<(), ServiceError> {
        if self.check(user_id, action, workspace_id).await? {
            Ok(())
        } else {
            log::warn!(
                "denied: user {} lacks '{}' on workspace {}",
                user_id,
                action,
                workspace_id
            );
            Err(ServiceError::PermissionDenied)
        }
    }

    /// Ownership test for owner-only operations. Owner is not a share
    /// row, so this resolves the role set instead of checking an action.
    pub async fn is_owner(&self, user_id: i32, workspace_id: i32) -> Result<bool, ServiceError> {
        let resource = ResourceInstance::workspace(workspace_id);
        let roles = self
            .policy
            .user_roles(&user_id.to_string(), &resource)
            .await?;
        Ok(roles.contains(&Role::Owner))
    }

    pub async fn require_owner(&self, user_id: i32, workspace_id: i32) -> Result<(), ServiceError> {
        if self.is_owner(user_id, workspace_id).await? {
            Ok(())
        } else {
            log::warn!("denied: user {} is not owner of workspace {}", user_id, workspace_id);
            Err(ServiceError::PermissionDenied)
        }
    }
}
