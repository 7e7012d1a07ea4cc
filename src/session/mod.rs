//! Per-login authorization sessions
//!
//! An `AuthSession` is created at login (`init`) and torn down at logout
//! (`dispose`). It owns the elevation state for that login and answers the
//! consumer-facing questions: `is_elevated`, `require_elevation`, `decide`
//! and `clear_elevation`.

pub mod store;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

use crate::auth::{Authorizer, AuthzError, Decision, ElevationTier, Identity, Route, TierTtls};
use crate::config::ElevationConfig;
use crate::elevation::{
    Clock, ElevationCoordinator, ElevationError, ElevationStateStore, LoggingPrompt,
    PromptCollaborator, SystemClock,
};
use store::{FileSessionStore, SessionStore};

pub use store::{MemorySessionStore, StoreError};

/// Everything needed to build a session besides the identity
#[derive(Clone)]
pub struct SessionOptions {
    pub ttls: TierTtls,
    pub prompt_timeout: Option<Duration>,
    pub store_dir: Option<PathBuf>,
    pub audit: bool,
    pub prompt: Arc<dyn PromptCollaborator>,
    pub clock: Arc<dyn Clock>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            ttls: TierTtls::default(),
            prompt_timeout: None,
            store_dir: None,
            audit: false,
            prompt: Arc::new(LoggingPrompt),
            clock: Arc::new(SystemClock),
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &ElevationConfig, audit: bool) -> Self {
        Self {
            ttls: config.ttls(),
            prompt_timeout: config.prompt_timeout(),
            store_dir: config.store_dir.clone(),
            audit,
            ..Self::default()
        }
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn PromptCollaborator>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn backend_for(&self, session_id: Uuid) -> Option<Arc<dyn SessionStore>> {
        self.store_dir
            .as_ref()
            .map(|dir| Arc::new(FileSessionStore::for_session(dir, session_id)) as Arc<dyn SessionStore>)
    }
}

pub struct AuthSession {
    identity: Identity,
    authorizer: Arc<Authorizer>,
    elevation: ElevationCoordinator,
    expires_at: Mutex<Option<DateTime<Utc>>>,
}

impl AuthSession {
    /// Start a session for `identity`, restoring any unexpired elevation
    pub fn init(identity: Identity, authorizer: Arc<Authorizer>, options: &SessionOptions) -> Self {
        let backend = options.backend_for(identity.session_id);
        Self::init_with_store(identity, authorizer, options, backend)
    }

    pub fn init_with_store(
        identity: Identity,
        authorizer: Arc<Authorizer>,
        options: &SessionOptions,
        backend: Option<Arc<dyn SessionStore>>,
    ) -> Self {
        let state = ElevationStateStore::new(options.ttls, backend).with_super_admin(identity.is_super_admin);
        let elevation = ElevationCoordinator::new(state, options.prompt.clone())
            .with_clock(options.clock.clone())
            .with_prompt_timeout(options.prompt_timeout)
            .with_audit_logging(options.audit);
        elevation.restore();

        tracing::info!(
            "Session {} started for {}@{} (role {:?})",
            identity.session_id,
            identity.user,
            identity.tenant,
            identity.role
        );

        Self {
            expires_at: Mutex::new(identity.expires_at),
            identity,
            authorizer,
            elevation,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn elevation(&self) -> &ElevationCoordinator {
        &self.elevation
    }

    /// Latest credential expiry seen for this session; `None` never expires
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        *self.expires_at.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }

    /// A refreshed credential pushes the expiry out, never back
    fn extend(&self, expires_at: Option<DateTime<Utc>>) {
        let mut current = self.expires_at.lock().unwrap_or_else(PoisonError::into_inner);
        if let (Some(current_at), Some(new_at)) = (*current, expires_at) {
            if new_at > current_at {
                *current = Some(new_at);
            }
        }
    }

    pub fn is_elevated(&self, tier: ElevationTier) -> bool {
        self.elevation.is_elevated(tier)
    }

    pub async fn require_elevation(&self, tier: ElevationTier) -> bool {
        self.elevation.require_elevation(tier).await
    }

    pub async fn request_elevation(&self, tier: ElevationTier) -> Result<(), ElevationError> {
        self.elevation.request_elevation(tier).await
    }

    pub fn resolve_prompt(&self, granted: bool) -> bool {
        self.elevation.resolve_prompt(granted)
    }

    pub fn decide(&self, route: &Route) -> Decision {
        self.authorizer.decide(&self.identity, route, &self.elevation)
    }

    pub async fn authorize(&self, route: &Route) -> Result<(), AuthzError> {
        self.authorizer.authorize(&self.identity, route, &self.elevation).await
    }

    pub fn clear_elevation(&self) {
        self.elevation.clear();
    }

    /// Logout: withdraw any open prompt and erase elevation
    pub fn dispose(&self) {
        self.elevation.cancel();
        self.elevation.clear();
        tracing::info!("Session {} disposed", self.identity.session_id);
    }
}

/// Live sessions keyed by session id
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Arc<AuthSession>>>,
    authorizer: Arc<Authorizer>,
    options: SessionOptions,
}

impl SessionRegistry {
    pub fn new(authorizer: Arc<Authorizer>, options: SessionOptions) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            authorizer,
            options,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<AuthSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn authorizer(&self) -> &Arc<Authorizer> {
        &self.authorizer
    }

    pub fn get(&self, session_id: Uuid) -> Option<Arc<AuthSession>> {
        self.lock().get(&session_id).cloned()
    }

    /// Session for `identity`, started on first sight.
    ///
    /// A session id re-presented with a different identity disposes the old
    /// session first, so no elevation carries over.
    pub fn get_or_init(&self, identity: Identity) -> Arc<AuthSession> {
        let stale = {
            let mut sessions = self.lock();
            match sessions.get(&identity.session_id) {
                Some(existing) if existing.identity().same_principal(&identity) => {
                    existing.extend(identity.expires_at);
                    return existing.clone();
                }
                Some(_) => sessions.remove(&identity.session_id),
                None => None,
            }
        };

        if let Some(old) = stale {
            tracing::warn!(
                "Session {} re-presented with a different identity; replacing",
                old.identity().session_id
            );
            old.dispose();
        }

        self.evict_expired();

        let session = Arc::new(AuthSession::init(identity, self.authorizer.clone(), &self.options));
        self.lock()
            .entry(session.identity().session_id)
            .or_insert(session)
            .clone()
    }

    /// Dispose every session whose credential has expired, erasing its persisted
    /// elevation. Returns how many were evicted.
    pub fn evict_expired(&self) -> usize {
        let now = self.options.clock.now();
        let expired: Vec<Arc<AuthSession>> = {
            let mut sessions = self.lock();
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, session)| session.is_expired(now))
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for session in &expired {
            tracing::info!("Evicting expired session {}", session.identity().session_id);
            session.dispose();
        }
        expired.len()
    }

    /// Logout. Returns `false` for unknown sessions.
    pub fn dispose(&self, session_id: Uuid) -> bool {
        let removed = self.lock().remove(&session_id);
        match removed {
            Some(session) => {
                session.dispose();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::roles::{MANAGER, OWNER, STAFF, SUPER_ADMIN};
    use crate::auth::RouteAuthPolicy;
    use crate::auth::RoleHierarchy;
    use crate::elevation::{ChannelPrompt, ManualClock, PromptEvent};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn authorizer() -> Arc<Authorizer> {
        Arc::new(Authorizer::new(
            RoleHierarchy::default(),
            RouteAuthPolicy::new()
                .with_rule("/admin/finance", ElevationTier::Elevated)
                .with_rule("/admin", ElevationTier::Password),
        ))
    }

    #[tokio::test]
    async fn test_session_scenarios() {
        let (prompt, mut events) = ChannelPrompt::new();
        let options = SessionOptions::default().with_prompt(Arc::new(prompt));
        let registry = SessionRegistry::new(authorizer(), options);

        // staff on a manager route
        let staff = registry.get_or_init(Identity::new("bistro", "sam", Some(STAFF)));
        let route = Route::new("/admin").requiring(MANAGER);
        assert!(matches!(staff.decide(&route), Decision::RoleInsufficient { .. }));

        // owner steps up
        let owner = Arc::new(AuthSession::init(
            Identity::new("bistro", "ana", Some(OWNER)),
            authorizer(),
            &registry.options,
        ));
        let finance = Route::new("/admin/finance");
        assert_eq!(
            owner.decide(&finance),
            Decision::RequireElevation {
                tier: ElevationTier::Elevated
            }
        );
        let waiter = tokio::spawn({
            let owner = owner.clone();
            async move { owner.require_elevation(ElevationTier::Elevated).await }
        });
        assert!(matches!(events.recv().await, Some(PromptEvent::Opened(_))));
        assert!(owner.resolve_prompt(true));
        assert!(waiter.await.unwrap());
        assert_eq!(owner.decide(&finance), Decision::Allow);

        // super admin never prompts
        let root = registry.get_or_init(Identity::new("bistro", "root", Some(SUPER_ADMIN)));
        assert_eq!(root.decide(&finance.clone().requiring(OWNER)), Decision::Allow);
        assert!(root.is_elevated(ElevationTier::Elevated));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_clear_elevation() {
        let session = Arc::new(AuthSession::init(
            Identity::new("bistro", "ana", Some(OWNER)),
            authorizer(),
            &SessionOptions::default(),
        ));
        let waiter = tokio::spawn({
            let session = session.clone();
            async move { session.require_elevation(ElevationTier::Elevated).await }
        });
        while session.elevation().waiting() == 0 {
            tokio::task::yield_now().await;
        }
        session.resolve_prompt(true);
        assert!(waiter.await.unwrap());
        assert!(session.is_elevated(ElevationTier::Password));

        session.clear_elevation();
        assert!(!session.is_elevated(ElevationTier::Password));
        assert!(!session.is_elevated(ElevationTier::Elevated));
    }

    #[test]
    fn test_registry_reuses_and_disposes() {
        let registry = SessionRegistry::new(authorizer(), SessionOptions::default());
        let identity = Identity::new("bistro", "ana", Some(OWNER));
        let sid = identity.session_id;

        let first = registry.get_or_init(identity.clone());
        let second = registry.get_or_init(identity);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);

        assert!(registry.dispose(sid));
        assert!(!registry.dispose(sid));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_replaces_mismatched_identity() {
        let registry = SessionRegistry::new(authorizer(), SessionOptions::default());
        let ana = Identity::new("bistro", "ana", Some(OWNER));
        let sid = ana.session_id;
        let impostor = Identity::new("bistro", "sam", Some(STAFF)).with_session(sid);

        registry.get_or_init(ana);
        let replaced = registry.get_or_init(impostor);
        assert_eq!(replaced.identity().user, "sam");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_elevation_survives_restart_via_store_dir() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()));
        let options = SessionOptions {
            store_dir: Some(dir.path().to_path_buf()),
            ..SessionOptions::default()
        }
        .with_clock(clock.clone());
        let identity = Identity::new("bistro", "ana", Some(OWNER));

        let session = Arc::new(AuthSession::init(identity.clone(), authorizer(), &options));
        let waiter = tokio::spawn({
            let session = session.clone();
            async move { session.require_elevation(ElevationTier::Password).await }
        });
        while session.elevation().waiting() == 0 {
            tokio::task::yield_now().await;
        }
        session.resolve_prompt(true);
        assert!(waiter.await.unwrap());

        // process restart five minutes later
        clock.advance(chrono::Duration::minutes(5));
        let restored = AuthSession::init(identity.clone(), authorizer(), &options);
        assert!(restored.is_elevated(ElevationTier::Password));
        assert!(!restored.is_elevated(ElevationTier::Elevated));

        // and nothing comes back after expiry
        clock.advance(chrono::Duration::minutes(30));
        let stale = AuthSession::init(identity, authorizer(), &options);
        assert!(!stale.is_elevated(ElevationTier::Password));
    }

    #[tokio::test]
    async fn test_registry_evicts_expired_sessions() {
        let dir = TempDir::new().unwrap();
        let start = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let options = SessionOptions {
            store_dir: Some(dir.path().to_path_buf()),
            ..SessionOptions::default()
        }
        .with_clock(clock.clone());
        let registry = SessionRegistry::new(authorizer(), options);

        let ana = Identity::new("bistro", "ana", Some(OWNER)).with_expiry(start + chrono::Duration::hours(1));
        let ana_sid = ana.session_id;
        let session = registry.get_or_init(ana);
        let waiter = tokio::spawn({
            let session = session.clone();
            async move { session.require_elevation(ElevationTier::Elevated).await }
        });
        while session.elevation().waiting() == 0 {
            tokio::task::yield_now().await;
        }
        session.resolve_prompt(true);
        assert!(waiter.await.unwrap());

        let document = store::FileSessionStore::for_session(dir.path(), ana_sid);
        assert!(document.path().exists());

        // no expiry means the session lives until logout
        let root = Identity::new("bistro", "root", Some(OWNER));
        let root_sid = root.session_id;
        registry.get_or_init(root);

        clock.advance(chrono::Duration::minutes(61));
        let sam = Identity::new("bistro", "sam", Some(STAFF)).with_expiry(clock.now() + chrono::Duration::hours(1));
        registry.get_or_init(sam);

        assert!(registry.get(ana_sid).is_none());
        assert!(registry.get(root_sid).is_some());
        assert_eq!(registry.len(), 2);
        assert!(!document.path().exists());
        assert!(!session.is_elevated(ElevationTier::Password));
    }

    #[test]
    fn test_refreshed_token_extends_session() {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()));
        let registry = SessionRegistry::new(authorizer(), SessionOptions::default().with_clock(clock.clone()));

        let first = Identity::new("bistro", "ana", Some(OWNER)).with_expiry(clock.now() + chrono::Duration::minutes(10));
        let refreshed = first.clone().with_expiry(clock.now() + chrono::Duration::hours(2));

        let session = registry.get_or_init(first);
        let again = registry.get_or_init(refreshed.clone());
        assert!(Arc::ptr_eq(&session, &again));
        assert_eq!(session.expires_at(), refreshed.expires_at);

        clock.advance(chrono::Duration::minutes(30));
        assert_eq!(registry.evict_expired(), 0);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_dispose_cancels_pending_prompt() {
        let (prompt, mut events) = ChannelPrompt::new();
        let options = SessionOptions::default().with_prompt(Arc::new(prompt));
        let session = Arc::new(AuthSession::init(
            Identity::new("bistro", "ana", Some(OWNER)),
            authorizer(),
            &options,
        ));

        let waiter = tokio::spawn({
            let session = session.clone();
            async move { session.request_elevation(ElevationTier::Elevated).await }
        });
        assert!(matches!(events.recv().await, Some(PromptEvent::Opened(_))));

        session.dispose();
        assert_eq!(waiter.await.unwrap(), Err(ElevationError::Cancelled));
        assert!(!session.is_elevated(ElevationTier::Password));
    }
}
