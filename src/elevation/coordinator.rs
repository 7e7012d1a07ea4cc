use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::prompt::{PromptCollaborator, PromptRequest};
use super::state::{ElevationState, ElevationStateStore};
use crate::auth::tier::ElevationTier;

/// How a pending elevation request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Granted,
    Denied,
    TimedOut,
    Cancelled,
}

impl Resolution {
    fn into_result(self) -> Result<(), ElevationError> {
        match self {
            Resolution::Granted => Ok(()),
            Resolution::Denied => Err(ElevationError::Denied),
            Resolution::TimedOut => Err(ElevationError::TimedOut),
            Resolution::Cancelled => Err(ElevationError::Cancelled),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ElevationError {
    #[error("Re-authentication was denied or cancelled by the user")]
    Denied,

    #[error("Re-authentication prompt timed out")]
    TimedOut,

    #[error("Elevation request was cancelled")]
    Cancelled,
}

struct PendingElevationRequest {
    id: Uuid,
    tier: ElevationTier,
    opened_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    deadline: Option<Instant>,
    waiters: Vec<oneshot::Sender<Resolution>>,
}

impl PendingElevationRequest {
    fn prompt_request(&self) -> PromptRequest {
        PromptRequest {
            request_id: self.id,
            tier: self.tier,
            opened_at: self.opened_at,
            expires_at: self.expires_at,
        }
    }
}

enum Signal {
    Open(PromptRequest),
    Escalate(PromptRequest),
}

/// Coordinates step-up re-authentication for one session.
///
/// At most one request is pending at a time. Callers arriving while a request
/// is pending attach to it instead of opening a second prompt; a caller asking
/// for a stronger tier escalates the pending request, so a grant always
/// satisfies every waiter. Lock order is `pending` then `state`.
pub struct ElevationCoordinator {
    state: Mutex<ElevationStateStore>,
    pending: Mutex<Option<PendingElevationRequest>>,
    prompt: Arc<dyn PromptCollaborator>,
    clock: Arc<dyn Clock>,
    prompt_timeout: Option<Duration>,
    audit: bool,
}

impl ElevationCoordinator {
    pub fn new(state: ElevationStateStore, prompt: Arc<dyn PromptCollaborator>) -> Self {
        Self {
            state: Mutex::new(state),
            pending: Mutex::new(None),
            prompt,
            clock: Arc::new(SystemClock),
            prompt_timeout: None,
            audit: false,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Withdraw prompts left unanswered for this long. `None` waits forever.
    pub fn with_prompt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    pub fn with_audit_logging(mut self, audit: bool) -> Self {
        self.audit = audit;
        self
    }

    fn lock_state(&self) -> MutexGuard<'_, ElevationStateStore> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<PendingElevationRequest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn is_elevated(&self, tier: ElevationTier) -> bool {
        let now = self.clock.now();
        self.lock_state().is_valid(tier, now)
    }

    pub fn state(&self) -> ElevationState {
        self.lock_state().state()
    }

    pub fn is_super_admin(&self) -> bool {
        self.lock_state().is_super_admin()
    }

    /// Hydrate persisted elevation state; called once when the session starts
    pub fn restore(&self) {
        let now = self.clock.now();
        self.lock_state().restore(now);
    }

    /// Drop all elevation (logout). A pending prompt is left to the caller.
    pub fn clear(&self) {
        self.lock_state().clear();
        tracing::info!("Elevation cleared");
    }

    /// Currently visible prompt, if any
    pub fn pending_prompt(&self) -> Option<PromptRequest> {
        self.lock_pending()
            .as_ref()
            .map(PendingElevationRequest::prompt_request)
    }

    /// Callers attached to the pending request
    pub fn waiting(&self) -> usize {
        self.lock_pending()
            .as_ref()
            .map_or(0, |pending| pending.waiters.len())
    }

    /// `true` once `tier` is held, `false` on denial, timeout or cancellation
    pub async fn require_elevation(&self, tier: ElevationTier) -> bool {
        self.request_elevation(tier).await.is_ok()
    }

    pub async fn request_elevation(&self, tier: ElevationTier) -> Result<(), ElevationError> {
        let (mut rx, request_id, deadline, signal) = {
            let mut pending = self.lock_pending();
            let now = self.clock.now();

            if self.lock_state().is_valid(tier, now) {
                return Ok(());
            }

            let (tx, rx) = oneshot::channel();
            match pending.as_mut() {
                Some(request) => {
                    request.waiters.push(tx);
                    let signal = if tier > request.tier {
                        tracing::info!(
                            "Escalating pending elevation request {} from '{}' to '{}'",
                            request.id,
                            request.tier,
                            tier
                        );
                        request.tier = tier;
                        Some(Signal::Escalate(request.prompt_request()))
                    } else {
                        tracing::debug!(
                            "Attaching '{}' caller to pending elevation request {}",
                            tier,
                            request.id
                        );
                        None
                    };
                    (rx, request.id, request.deadline, signal)
                }
                None => {
                    let expires_at = self.prompt_timeout.and_then(|timeout| {
                        chrono::Duration::from_std(timeout)
                            .ok()
                            .map(|timeout| now + timeout)
                    });
                    let request = PendingElevationRequest {
                        id: Uuid::new_v4(),
                        tier,
                        opened_at: now,
                        expires_at,
                        deadline: self.prompt_timeout.map(|timeout| Instant::now() + timeout),
                        waiters: vec![tx],
                    };
                    tracing::info!("Opening elevation request {} for tier '{}'", request.id, tier);
                    let signal = Some(Signal::Open(request.prompt_request()));
                    let id = request.id;
                    let deadline = request.deadline;
                    *pending = Some(request);
                    (rx, id, deadline, signal)
                }
            }
        };

        match signal {
            Some(Signal::Open(request)) => self.prompt.open_prompt(&request),
            Some(Signal::Escalate(request)) => self.prompt.escalate_prompt(&request),
            None => {}
        }

        let received = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, &mut rx).await {
                Ok(received) => received.ok(),
                Err(_) => {
                    if self.finish(Some(request_id), Resolution::TimedOut) {
                        tracing::warn!("Elevation request {} timed out", request_id);
                        return Err(ElevationError::TimedOut);
                    }
                    // resolved concurrently with the deadline; the winner sends after releasing `pending`
                    rx.await.ok()
                }
            },
            None => (&mut rx).await.ok(),
        };

        match received {
            Some(resolution) => resolution.into_result(),
            None if self.is_elevated(tier) => Ok(()),
            None => Err(ElevationError::Cancelled),
        }
    }

    /// Credential prompt callback. Returns `false` when no request was pending.
    pub fn resolve_prompt(&self, granted: bool) -> bool {
        self.finish(None, Self::outcome(granted))
    }

    /// Like `resolve_prompt`, but only if `request_id` is still the pending request
    pub fn resolve_request(&self, request_id: Uuid, granted: bool) -> bool {
        self.finish(Some(request_id), Self::outcome(granted))
    }

    /// Withdraw the pending request; all waiters observe `false`
    pub fn cancel(&self) -> bool {
        self.finish(None, Resolution::Cancelled)
    }

    fn outcome(granted: bool) -> Resolution {
        if granted {
            Resolution::Granted
        } else {
            Resolution::Denied
        }
    }

    fn finish(&self, request_id: Option<Uuid>, resolution: Resolution) -> bool {
        let request = {
            let mut pending = self.lock_pending();
            let matches = match (pending.as_ref(), request_id) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(current), Some(id)) => current.id == id,
            };
            if !matches {
                drop(pending);
                tracing::warn!(
                    "Ignoring {:?} resolution: no matching elevation request is pending",
                    resolution
                );
                return false;
            }

            let Some(request) = pending.take() else {
                return false;
            };

            if resolution == Resolution::Granted {
                let now = self.clock.now();
                let expiry = self.lock_state().grant(request.tier, now);
                tracing::info!(
                    "Elevation request {} granted tier '{}' until {:?}",
                    request.id,
                    request.tier,
                    expiry
                );
                if self.audit {
                    tracing::info!(
                        target: "audit",
                        request_id = %request.id,
                        tier = %request.tier,
                        waiters = request.waiters.len(),
                        "elevation granted"
                    );
                }
            } else {
                tracing::info!("Elevation request {} ended: {:?}", request.id, resolution);
            }
            request
        };

        if matches!(resolution, Resolution::TimedOut | Resolution::Cancelled) {
            self.prompt.close_prompt(request.id, resolution);
        }

        for waiter in request.waiters {
            // a waiter that stopped listening does not affect the others
            let _ = waiter.send(resolution);
        }
        true
    }
}
