use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::coordinator::Resolution;
use crate::auth::tier::ElevationTier;

/// What the credential prompt is asked to collect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptRequest {
    pub request_id: Uuid,
    pub tier: ElevationTier,
    pub opened_at: DateTime<Utc>,
    /// `None` when prompts never time out
    pub expires_at: Option<DateTime<Utc>>,
}

/// Credential-prompt UI seam.
///
/// The coordinator signals here; the prompt later reports back through
/// `ElevationCoordinator::resolve_prompt` exactly once per opened prompt.
/// Calls are made outside the coordinator's locks, so an implementation may
/// resolve synchronously.
pub trait PromptCollaborator: Send + Sync {
    fn open_prompt(&self, request: &PromptRequest);

    /// The visible prompt must now collect a stronger tier
    fn escalate_prompt(&self, request: &PromptRequest) {
        self.open_prompt(request);
    }

    /// The prompt was withdrawn without the user answering it
    fn close_prompt(&self, _request_id: Uuid, _reason: Resolution) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
    Opened(PromptRequest),
    Escalated(PromptRequest),
    Closed { request_id: Uuid, reason: Resolution },
}

/// Forwards prompt signals onto an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelPrompt {
    tx: mpsc::UnboundedSender<PromptEvent>,
}

impl ChannelPrompt {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PromptEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: PromptEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Prompt event dropped: no listener attached");
        }
    }
}

impl PromptCollaborator for ChannelPrompt {
    fn open_prompt(&self, request: &PromptRequest) {
        self.send(PromptEvent::Opened(request.clone()));
    }

    fn escalate_prompt(&self, request: &PromptRequest) {
        self.send(PromptEvent::Escalated(request.clone()));
    }

    fn close_prompt(&self, request_id: Uuid, reason: Resolution) {
        self.send(PromptEvent::Closed { request_id, reason });
    }
}

/// Only logs; the HTTP surface exposes the pending prompt through the status endpoint
#[derive(Debug, Clone, Default)]
pub struct LoggingPrompt;

impl PromptCollaborator for LoggingPrompt {
    fn open_prompt(&self, request: &PromptRequest) {
        tracing::info!(
            "Credential prompt {} opened for tier '{}' (expires {:?})",
            request.request_id,
            request.tier,
            request.expires_at
        );
    }

    fn escalate_prompt(&self, request: &PromptRequest) {
        tracing::info!(
            "Credential prompt {} escalated to tier '{}'",
            request.request_id,
            request.tier
        );
    }

    fn close_prompt(&self, request_id: Uuid, reason: Resolution) {
        tracing::info!("Credential prompt {} closed: {:?}", request_id, reason);
    }
}
