use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::tier::{ElevationTier, TierTtls};
use crate::session::store::{SessionStore, StoreError, ELEVATED_EXPIRY_KEY, PASSWORD_EXPIRY_KEY};

/// Expiry timestamps of the two grantable tiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ElevationState {
    pub password_until: Option<DateTime<Utc>>,
    pub elevated_until: Option<DateTime<Utc>>,
}

impl ElevationState {
    pub fn until(&self, tier: ElevationTier) -> Option<DateTime<Utc>> {
        match tier {
            ElevationTier::None => None,
            ElevationTier::Password => self.password_until,
            ElevationTier::Elevated => self.elevated_until,
        }
    }

    fn set_until(&mut self, tier: ElevationTier, until: Option<DateTime<Utc>>) {
        match tier {
            ElevationTier::None => {}
            ElevationTier::Password => self.password_until = until,
            ElevationTier::Elevated => self.elevated_until = until,
        }
    }
}

/// Per-session elevation state with best-effort persistence.
///
/// Persistence faults are logged and absorbed; after the first one the store
/// keeps working in memory only for the rest of the session.
pub struct ElevationStateStore {
    state: ElevationState,
    ttls: TierTtls,
    super_admin: bool,
    backend: Option<Arc<dyn SessionStore>>,
}

impl std::fmt::Debug for ElevationStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevationStateStore")
            .field("state", &self.state)
            .field("ttls", &self.ttls)
            .field("super_admin", &self.super_admin)
            .field("persistent", &self.backend.is_some())
            .finish()
    }
}

impl ElevationStateStore {
    pub fn new(ttls: TierTtls, backend: Option<Arc<dyn SessionStore>>) -> Self {
        Self {
            state: ElevationState::default(),
            ttls,
            super_admin: false,
            backend,
        }
    }

    /// In-memory store with default TTLs
    pub fn in_memory() -> Self {
        Self::new(TierTtls::default(), None)
    }

    pub fn with_super_admin(mut self, super_admin: bool) -> Self {
        self.super_admin = super_admin;
        self
    }

    pub fn state(&self) -> ElevationState {
        self.state
    }

    pub fn ttls(&self) -> TierTtls {
        self.ttls
    }

    pub fn is_super_admin(&self) -> bool {
        self.super_admin
    }

    pub fn is_persistent(&self) -> bool {
        self.backend.is_some()
    }

    pub fn is_valid(&self, tier: ElevationTier, now: DateTime<Utc>) -> bool {
        if self.super_admin {
            return true;
        }
        match tier {
            ElevationTier::None => true,
            _ => self.state.until(tier).is_some_and(|until| until > now),
        }
    }

    /// Record a grant of `tier` and every tier it implies. Returns the new expiry.
    pub fn grant(&mut self, tier: ElevationTier, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let expiry = now + self.ttls.ttl(tier)?;
        for implied in tier.implied_tiers() {
            self.state.set_until(*implied, Some(expiry));
        }
        self.persist();
        Some(expiry)
    }

    pub fn clear(&mut self) {
        self.state = ElevationState::default();
        self.persist();
    }

    /// Hydrate from the backend, dropping anything already expired at `now`
    pub fn restore(&mut self, now: DateTime<Utc>) {
        if self.hydrate(now) {
            self.persist();
        }
    }

    /// Like `restore`, but leaves the backend untouched
    pub fn inspect(&mut self, now: DateTime<Utc>) {
        self.hydrate(now);
    }

    /// Load and normalize the persisted slots; `true` when they differ from what was stored
    fn hydrate(&mut self, now: DateTime<Utc>) -> bool {
        let password = self.load_slot(PASSWORD_EXPIRY_KEY);
        let elevated = self.load_slot(ELEVATED_EXPIRY_KEY);

        let mut restored = ElevationState {
            password_until: password.filter(|until| *until > now),
            elevated_until: elevated.filter(|until| *until > now),
        };

        // elevated implies password, so a live elevated grant backfills an absent or older password expiry
        if let Some(elevated_until) = restored.elevated_until {
            if restored.password_until.map_or(true, |until| until < elevated_until) {
                restored.password_until = Some(elevated_until);
            }
        }

        let dirty = restored.password_until != password || restored.elevated_until != elevated;
        self.state = restored;

        tracing::debug!(
            "Restored elevation state: password_until={:?}, elevated_until={:?}",
            self.state.password_until,
            self.state.elevated_until
        );

        dirty
    }

    fn load_slot(&mut self, key: &str) -> Option<DateTime<Utc>> {
        let backend = self.backend.as_ref()?;
        match backend.get(key) {
            Ok(Some(millis)) => Utc.timestamp_millis_opt(millis).single(),
            Ok(None) => None,
            Err(e) => {
                self.degrade(e);
                None
            }
        }
    }

    fn persist(&mut self) {
        let Some(backend) = self.backend.clone() else {
            return;
        };

        let slots = [
            (PASSWORD_EXPIRY_KEY, self.state.password_until),
            (ELEVATED_EXPIRY_KEY, self.state.elevated_until),
        ];

        for (key, until) in slots {
            let result = match until {
                Some(until) => backend.set(key, until.timestamp_millis()),
                None => backend.remove(key),
            };
            if let Err(e) = result {
                self.degrade(e);
                return;
            }
        }
    }

    fn degrade(&mut self, error: StoreError) {
        tracing::warn!(
            "Elevation persistence unavailable, continuing in memory for this session: {}",
            error
        );
        self.backend = None;
    }
}
