use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::access::capability::{Action, Role};

/// A single workspace instance as the policy service addresses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInstance {
    pub kind: &'static str,
    pub key: String,
}

impl ResourceInstance {
    pub fn workspace(workspace_id: i32) -> Self {
        ResourceInstance {
            kind: "workspace",
            key: workspace_id.to_string(),
        }
    }

    /// Instance key in the `type:key` form the policy service expects.
    pub fn instance_key(&self) -> String {
        format!("{}:{}", self.kind, self.key)
    }
}

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Policy service transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Policy service returned status {0}")]
    Api(u16),
}

/// Narrow contract over the external policy decision service. Role
/// grants and permission checks go through here; the loosely-typed
/// payloads the service speaks never leave this module.
#[async_trait]
pub trait PolicyClient: Send + Sync {
    async fn check(
        &self,
        user_key: &str,
        action: Action,
        resource: &ResourceInstance,
    ) -> Result<bool, PolicyError>;

    /// Effective roles the user holds on one resource instance.
    async fn user_roles(
        &self,
        user_key: &str,
        resource: &ResourceInstance,
    ) -> Result<Vec<Role>, PolicyError>;

    /// Registers the resource instance so roles can be assigned on it.
    async fn sync_resource(&self, resource: &ResourceInstance) -> Result<(), PolicyError>;

    async fn assign_role(
        &self,
        user_key: &str,
        resource: &ResourceInstance,
        role: Role,
    ) -> Result<(), PolicyError>;

    /// Unassigning a role the user never held is a no-op, not an error.
    async fn unassign_role(
        &self,
        user_key: &str,
        resource: &ResourceInstance,
        role: Role,
    ) -> Result<(), PolicyError>;
}

#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub pdp_url: String,
    pub api_key: String,
    pub tenant: String,
}

impl PolicyConfig {
    /// Reads `POLICY_PDP_URL`, `POLICY_API_KEY` and `POLICY_TENANT`.
    /// Returns `None` when no PDP is configured.
    pub fn from_env() -> Option<Self> {
        let pdp_url = std::env::var("POLICY_PDP_URL").ok()?;
        let api_key = std::env::var("POLICY_API_KEY").unwrap_or_default();
        let tenant = std::env::var("POLICY_TENANT").unwrap_or_else(|_| "default".into());
        Some(PolicyConfig {
            pdp_url,
            api_key,
            tenant,
        })
    }
}

// Wire payloads for the policy decision point. Private on purpose.

#[derive(Serialize)]
struct UserKey<'a> {
    key: &'a str,
}

#[derive(Serialize)]
struct ResourceBody<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    key: &'a str,
    tenant: &'a str,
}

#[derive(Serialize)]
struct AllowedRequest<'a> {
    user: UserKey<'a>,
    action: &'a str,
    resource: ResourceBody<'a>,
}

#[derive(Deserialize)]
struct AllowedResponse {
    allow: bool,
}

#[derive(Serialize)]
struct UserPermissionsRequest<'a> {
    user: UserKey<'a>,
    resources: Vec<String>,
}

#[derive(Deserialize)]
struct ResourcePermissions {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Serialize)]
struct ResourceInstanceBody<'a> {
    key: &'a str,
    resource: &'a str,
    tenant: &'a str,
}

#[derive(Serialize)]
struct RoleAssignmentBody<'a> {
    user: &'a str,
    role: &'a str,
    tenant: &'a str,
    resource_instance: String,
}

/// HTTP adapter to a policy decision point. Constructed once in `main`
/// and injected; never a module-level singleton.
pub struct HttpPolicyClient {
    http: reqwest::Client,
    config: PolicyConfig,
}

impl HttpPolicyClient {
    pub fn new(config: PolicyConfig) -> Self {
        HttpPolicyClient {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.pdp_url.trim_end_matches('/'), path)
    }

    fn resource_body<'a>(&'a self, resource: &'a ResourceInstance) -> ResourceBody<'a> {
        ResourceBody {
            kind: resource.kind,
            key: &resource.key,
            tenant: &self.config.tenant,
        }
    }
}

#[async_trait]
impl PolicyClient for HttpPolicyClient {
    async fn check(
        &self,
        user_key: &str,
        action: Action,
        resource: &ResourceInstance,
    ) -> Result<bool, PolicyError> {
        let request = AllowedRequest {
            user: UserKey { key: user_key },
            action: action.as_str(),
            resource: self.resource_body(resource),
        };

        let response = self
            .http
            .post(self.url("allowed"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PolicyError::Api(response.status().as_u16()));
        }

        let decision: AllowedResponse = response.json().await?;
        Ok(decision.allow)
    }

    async fn user_roles(
        &self,
        user_key: &str,
        resource: &ResourceInstance,
    ) -> Result<Vec<Role>, PolicyError> {
        let request = UserPermissionsRequest {
            user: UserKey { key: user_key },
            resources: vec![resource.instance_key()],
        };

        let response = self
            .http
            .post(self.url("user-permissions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PolicyError::Api(response.status().as_u16()));
        }

        let permissions: HashMap<String, ResourcePermissions> = response.json().await?;
        let roles = permissions
            .get(&resource.instance_key())
            .map(|p| {
                p.roles
                    .iter()
                    .filter_map(|r| r.parse::<Role>().ok())
                    .collect()
            })
            .unwrap_or_default();
        Ok(roles)
    }

    async fn sync_resource(&self, resource: &ResourceInstance) -> Result<(), PolicyError> {
        let body = ResourceInstanceBody {
            key: &resource.key,
            resource: resource.kind,
            tenant: &self.config.tenant,
        };

        let response = self
            .http
            .post(self.url("resource_instances"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        // Re-registering a known instance is fine.
        if response.status().is_success() || response.status() == StatusCode::CONFLICT {
            Ok(())
        } else {
            Err(PolicyError::Api(response.status().as_u16()))
        }
    }

    async fn assign_role(
        &self,
        user_key: &str,
        resource: &ResourceInstance,
        role: Role,
    ) -> Result<(), PolicyError> {
        let body = RoleAssignmentBody {
            user: user_key,
            role: role.as_str(),
            tenant: &self.config.tenant,
            resource_instance: resource.instance_key(),
        };

        let response = self
            .http
            .post(self.url("role_assignments"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(PolicyError::Api(response.status().as_u16()))
        }
    }

    async fn unassign_role(
        &self,
        user_key: &str,
        resource: &ResourceInstance,
        role: Role,
    ) -> Result<(), PolicyError> {
        let body = RoleAssignmentBody {
            user: user_key,
            role: role.as_str(),
            tenant: &self.config.tenant,
            resource_instance: resource.instance_key(),
        };

        let response = self
            .http
            .delete(self.url("role_assignments"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        // The grant not existing already satisfies "unassigned".
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(PolicyError::Api(response.status().as_u16()))
        }
    }
}

/// In-process policy store backed by a role-grant map. Stands in for the
/// external decision point in tests and unconfigured local runs; decisions
/// come from the same capability table (`Role::allows`).
#[derive(Default)]
pub struct MemoryPolicyClient {
    grants: Mutex<HashMap<(String, String), HashSet<Role>>>,
}

impl MemoryPolicyClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyClient for MemoryPolicyClient {
    async fn check(
        &self,
        user_key: &str,
        action: Action,
        resource: &ResourceInstance,
    ) -> Result<bool, PolicyError> {
        let grants = self.grants.lock().unwrap();
        Ok(grants
            .get(&(user_key.to_string(), resource.instance_key()))
            .is_some_and(|roles| roles.iter().any(|role| role.allows(action))))
    }

    async fn user_roles(
        &self,
        user_key: &str,
        resource: &ResourceInstance,
    ) -> Result<Vec<Role>, PolicyError> {
        let grants = self.grants.lock().unwrap();
        Ok(grants
            .get(&(user_key.to_string(), resource.instance_key()))
            .map(|roles| roles.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn sync_resource(&self, _resource: &ResourceInstance) -> Result<(), PolicyError> {
        Ok(())
    }

    async fn assign_role(
        &self,
        user_key: &str,
        resource: &ResourceInstance,
        role: Role,
    ) -> Result<(), PolicyError> {
        let mut grants = self.grants.lock().unwrap();
        grants
            .entry((user_key.to_string(), resource.instance_key()))
            .or_default()
            .insert(role);
        Ok(())
    }

    async fn unassign_role(
        &self,
        user_key: &str,
        resource: &ResourceInstance,
        role: Role,
    ) -> Result<(), PolicyError> {
        let mut grants = self.grants.lock().unwrap();
        if let Some(roles) = grants.get_mut(&(user_key.to_string(), resource.instance_key())) {
            roles.remove(&role);
        }
        Ok(())
    }
}
