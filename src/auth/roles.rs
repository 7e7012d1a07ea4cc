//! Role hierarchy for console access control
//!
//! Roles are ranked by a numeric level; a user can reach anything whose
//! required role sits at or below their own level.
//!
//! | Role              | Level |
//! |-------------------|-------|
//! | `STAFF`           | 1     |
//! | `MANAGER`         | 2     |
//! | `GENERAL_MANAGER` | 2.5   |
//! | `OWNER`           | 3     |
//! | `SUPER_ADMIN`     | 99    |
//!
//! Role names are matched case-insensitively. Unknown roles sit at level 0.

use std::collections::HashMap;

pub const STAFF: &str = "STAFF";
pub const MANAGER: &str = "MANAGER";
pub const GENERAL_MANAGER: &str = "GENERAL_MANAGER";
pub const OWNER: &str = "OWNER";
pub const SUPER_ADMIN: &str = "SUPER_ADMIN";

/// Level reported for roles missing from the table
pub const UNKNOWN_LEVEL: f64 = 0.0;

#[derive(Debug, Clone)]
pub struct RoleHierarchy {
    levels: HashMap<String, f64>,
}

impl Default for RoleHierarchy {
    fn default() -> Self {
        Self::from_entries([
            (STAFF, 1.0),
            (MANAGER, 2.0),
            (GENERAL_MANAGER, 2.5),
            (OWNER, 3.0),
            (SUPER_ADMIN, 99.0),
        ])
    }
}

impl RoleHierarchy {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let levels = entries
            .into_iter()
            .map(|(name, level)| (normalize(name.as_ref()), level))
            .collect();
        Self { levels }
    }

    /// Add or override a role level
    pub fn insert(&mut self, role: &str, level: f64) {
        self.levels.insert(normalize(role), level);
    }

    pub fn role_level(&self, role: &str) -> f64 {
        self.levels
            .get(&normalize(role))
            .copied()
            .unwrap_or(UNKNOWN_LEVEL)
    }

    /// Whether `user_role` dominates `required_role`. A missing user role never has access.
    pub fn has_access(&self, user_role: Option<&str>, required_role: &str) -> bool {
        match user_role {
            Some(role) => self.role_level(role) >= self.role_level(required_role),
            None => false,
        }
    }

    /// Known role names, highest level first
    pub fn roles(&self) -> Vec<(&str, f64)> {
        let mut roles: Vec<(&str, f64)> = self
            .levels
            .iter()
            .map(|(name, level)| (name.as_str(), *level))
            .collect();
        roles.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        roles
    }
}

fn normalize(role: &str) -> String {
    role.trim().to_ascii_uppercase()
}
