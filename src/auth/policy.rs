use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::roles::RoleHierarchy;
use super::tier::ElevationTier;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Failed to read policy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid policy document: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// One `(path prefix, minimum tier)` rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    pub prefix: String,
    pub tier: ElevationTier,
}

/// Path prefix → minimum elevation tier, resolved by longest matching prefix
#[derive(Debug, Clone, Default)]
pub struct RouteAuthPolicy {
    rules: Vec<RouteRule>,
}

impl RouteAuthPolicy {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Built-in table for the restaurant console
    pub fn console_default() -> Self {
        Self::new()
            .with_rule("/admin", ElevationTier::Password)
            .with_rule("/admin/finance", ElevationTier::Elevated)
            .with_rule("/finance", ElevationTier::Password)
            .with_rule("/finance/payouts", ElevationTier::Elevated)
            .with_rule("/hr", ElevationTier::Password)
            .with_rule("/hr/payroll", ElevationTier::Elevated)
            .with_rule("/pos/refunds", ElevationTier::Password)
            .with_rule("/inventory/adjustments", ElevationTier::Password)
            .with_rule("/settings", ElevationTier::Password)
            .with_rule("/settings/billing", ElevationTier::Elevated)
    }

    pub fn with_rule(mut self, prefix: impl Into<String>, tier: ElevationTier) -> Self {
        self.insert(prefix, tier);
        self
    }

    /// Register a rule; re-registering a prefix replaces its tier
    pub fn insert(&mut self, prefix: impl Into<String>, tier: ElevationTier) {
        let prefix = prefix.into();
        match self.rules.iter_mut().find(|rule| rule.prefix == prefix) {
            Some(rule) => rule.tier = tier,
            None => self.rules.push(RouteRule { prefix, tier }),
        }
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Tier of the longest registered prefix of `path`, or `None` when nothing matches
    pub fn required_tier(&self, path: &str) -> ElevationTier {
        self.rules
            .iter()
            .filter(|rule| path.starts_with(rule.prefix.as_str()))
            .max_by_key(|rule| rule.prefix.chars().count())
            .map(|rule| rule.tier)
            .unwrap_or(ElevationTier::None)
    }
}

/// YAML policy document
///
/// ```yaml
/// routes:
///   - prefix: /admin
///     tier: password
///   - prefix: /admin/finance
///     tier: elevated
/// roles:
///   SOUS_CHEF: 1.5
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub routes: Vec<RouteRule>,
    /// Extra or overridden role levels, merged over the default hierarchy
    #[serde(default)]
    pub roles: HashMap<String, f64>,
}

impl PolicyDocument {
    pub fn from_yaml(source: &str) -> Result<Self, PolicyError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let content = fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn route_policy(&self) -> RouteAuthPolicy {
        let mut policy = RouteAuthPolicy::new();
        for rule in &self.routes {
            policy.insert(rule.prefix.clone(), rule.tier);
        }
        policy
    }

    pub fn role_hierarchy(&self) -> RoleHierarchy {
        let mut roles = RoleHierarchy::default();
        for (role, level) in &self.roles {
            roles.insert(role, *level);
        }
        roles
    }
}
