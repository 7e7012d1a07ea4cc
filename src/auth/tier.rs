use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Step-up requirement above the base login session (ordered: none < password < elevated)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElevationTier {
    /// Base session is enough
    None,
    /// Password re-entry
    Password,
    /// Second-factor confirmation
    Elevated,
}

/// Lifetime of each grantable tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierTtls {
    pub password: Duration,
    pub elevated: Duration,
}

impl Default for TierTtls {
    fn default() -> Self {
        Self {
            password: Duration::minutes(30),
            elevated: Duration::minutes(15),
        }
    }
}

fn minutes(value: u64) -> Option<Duration> {
    i64::try_from(value).ok().and_then(Duration::try_minutes)
}

impl TierTtls {
    /// Minute counts that do not fit a `Duration` keep the default for that tier
    pub fn from_minutes(password: u64, elevated: u64) -> Self {
        let defaults = Self::default();
        Self {
            password: minutes(password).unwrap_or(defaults.password),
            elevated: minutes(elevated).unwrap_or(defaults.elevated),
        }
    }

    /// TTL for a tier; `None` never expires so it has no TTL
    pub fn ttl(&self, tier: ElevationTier) -> Option<Duration> {
        match tier {
            ElevationTier::None => None,
            ElevationTier::Password => Some(self.password),
            ElevationTier::Elevated => Some(self.elevated),
        }
    }
}

impl ElevationTier {
    pub const ALL: [ElevationTier; 3] = [Self::None, Self::Password, Self::Elevated];

    /// Parse tier from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "base" => Some(Self::None),
            "password" => Some(Self::Password),
            "elevated" | "mfa" | "2fa" => Some(Self::Elevated),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Password => "password",
            Self::Elevated => "elevated",
        }
    }

    /// Tiers that a grant of this tier also satisfies.
    ///
    /// | granted    | satisfies              |
    /// |------------|------------------------|
    /// | `none`     | nothing to record      |
    /// | `password` | `password`             |
    /// | `elevated` | `password`, `elevated` |
    pub fn implied_tiers(&self) -> &'static [ElevationTier] {
        match self {
            Self::None => &[],
            Self::Password => &[Self::Password],
            Self::Elevated => &[Self::Password, Self::Elevated],
        }
    }

    /// Whether holding `self` satisfies a requirement for `other`
    pub fn implies(&self, other: ElevationTier) -> bool {
        other == Self::None || self.implied_tiers().contains(&other)
    }
}

impl fmt::Display for ElevationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(ElevationTier::Elevated > ElevationTier::Password);
        assert!(ElevationTier::Password > ElevationTier::None);
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!(ElevationTier::parse("password"), Some(ElevationTier::Password));
        assert_eq!(ElevationTier::parse(" Elevated "), Some(ElevationTier::Elevated));
        assert_eq!(ElevationTier::parse("mfa"), Some(ElevationTier::Elevated));
        assert_eq!(ElevationTier::parse("none"), Some(ElevationTier::None));
        assert_eq!(ElevationTier::parse("root"), None);
    }

    #[test]
    fn test_implication_table() {
        assert!(ElevationTier::Elevated.implies(ElevationTier::Password));
        assert!(ElevationTier::Elevated.implies(ElevationTier::Elevated));
        assert!(ElevationTier::Password.implies(ElevationTier::Password));
        assert!(!ElevationTier::Password.implies(ElevationTier::Elevated));
        assert!(ElevationTier::None.implies(ElevationTier::None));
        assert!(!ElevationTier::None.implies(ElevationTier::Password));
    }

    #[test]
    fn test_default_ttls() {
        let ttls = TierTtls::default();
        assert_eq!(ttls.ttl(ElevationTier::Password), Some(Duration::minutes(30)));
        assert_eq!(ttls.ttl(ElevationTier::Elevated), Some(Duration::minutes(15)));
        assert_eq!(ttls.ttl(ElevationTier::None), None);
    }

    #[test]
    fn test_oversized_minutes_keep_defaults() {
        let ttls = TierTtls::from_minutes(u64::MAX, 10);
        assert_eq!(ttls.password, Duration::minutes(30));
        assert_eq!(ttls.elevated, Duration::minutes(10));

        // fits in i64 but overflows Duration
        let ttls = TierTtls::from_minutes(45, i64::MAX as u64);
        assert_eq!(ttls.password, Duration::minutes(45));
        assert_eq!(ttls.elevated, Duration::minutes(15));
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ElevationTier::Elevated).unwrap();
        assert_eq!(json, "\"elevated\"");
        let tier: ElevationTier = serde_json::from_str("\"password\"").unwrap();
        assert_eq!(tier, ElevationTier::Password);
    }
}
