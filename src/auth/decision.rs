use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::identity::Identity;
use super::policy::RouteAuthPolicy;
use super::roles::RoleHierarchy;
use super::tier::ElevationTier;
use crate::elevation::{ElevationCoordinator, ElevationError};

/// A protected route: a required role and a path whose prefix picks the required tier.
/// The two are independent axes of protection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub path: String,
    #[serde(default)]
    pub required_role: Option<String>,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            required_role: None,
        }
    }

    pub fn requiring(mut self, role: impl Into<String>) -> Self {
        self.required_role = Some(role.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    /// Permanent for the session; elevation cannot help
    RoleInsufficient { required_role: String },
    /// Transient; resolved by a successful elevation round trip
    RequireElevation { tier: ElevationTier },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Role '{}' is insufficient, '{required}' required", .role.as_deref().unwrap_or("none"))]
    RoleInsufficient {
        role: Option<String>,
        required: String,
    },

    #[error("Elevation to '{tier}' not obtained: {reason}")]
    ElevationDenied {
        tier: ElevationTier,
        #[source]
        reason: ElevationError,
    },
}

/// Role hierarchy plus route policy
#[derive(Debug, Clone)]
pub struct Authorizer {
    roles: RoleHierarchy,
    policy: RouteAuthPolicy,
}

impl Default for Authorizer {
    fn default() -> Self {
        Self::new(RoleHierarchy::default(), RouteAuthPolicy::console_default())
    }
}

impl Authorizer {
    pub fn new(roles: RoleHierarchy, policy: RouteAuthPolicy) -> Self {
        Self { roles, policy }
    }

    pub fn roles(&self) -> &RoleHierarchy {
        &self.roles
    }

    pub fn policy(&self) -> &RouteAuthPolicy {
        &self.policy
    }

    /// Synchronous decision; never opens a prompt
    pub fn decide(&self, user: &Identity, route: &Route, elevation: &ElevationCoordinator) -> Decision {
        let required_role = route.required_role.as_deref().unwrap_or_default();

        if !self.roles.has_access(user.role(), required_role) {
            tracing::debug!(
                "Decision for {}@{} on '{}': role {:?} below '{}'",
                user.user,
                user.tenant,
                route.path,
                user.role,
                required_role
            );
            return Decision::RoleInsufficient {
                required_role: required_role.to_string(),
            };
        }

        if user.is_super_admin {
            return Decision::Allow;
        }

        let tier = self.policy.required_tier(&route.path);
        if elevation.is_elevated(tier) {
            Decision::Allow
        } else {
            tracing::debug!(
                "Decision for {}@{} on '{}': elevation '{}' required",
                user.user,
                user.tenant,
                route.path,
                tier
            );
            Decision::RequireElevation { tier }
        }
    }

    /// Decide, and on `RequireElevation` run the elevation round trip and decide again
    pub async fn authorize(
        &self,
        user: &Identity,
        route: &Route,
        elevation: &ElevationCoordinator,
    ) -> Result<(), AuthzError> {
        loop {
            match self.decide(user, route, elevation) {
                Decision::Allow => return Ok(()),
                Decision::RoleInsufficient { required_role } => {
                    return Err(AuthzError::RoleInsufficient {
                        role: user.role.clone(),
                        required: required_role,
                    })
                }
                Decision::RequireElevation { tier } => {
                    elevation
                        .request_elevation(tier)
                        .await
                        .map_err(|reason| AuthzError::ElevationDenied { tier, reason })?;
                }
            }
        }
    }
}
