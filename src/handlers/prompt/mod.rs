use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

/// Outcome the prompt service reports for one prompt
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub session_id: Uuid,
    pub request_id: Uuid,
    pub granted: bool,
}

#[derive(Debug, Serialize)]
pub struct ResolveResult {
    pub session_id: Uuid,
    pub request_id: Uuid,
    pub granted: bool,
}

/// POST /api/prompt/resolve - Answer a pending prompt on behalf of the credential-prompt service
///
/// Authenticated with the prompt callback secret, never a user session token.
/// A request id that is not the session's pending prompt answers 404, so a
/// late or replayed callback cannot settle a newer prompt.
pub async fn resolve(State(state): State<AppState>, Json(body): Json<ResolveRequest>) -> ApiResult<ResolveResult> {
    let session = state
        .sessions
        .get(body.session_id)
        .ok_or_else(|| ApiError::not_found(format!("Session '{}' not found", body.session_id)))?;

    if !session.elevation().resolve_request(body.request_id, body.granted) {
        return Err(ApiError::not_found(format!("No pending prompt '{}'", body.request_id)));
    }

    tracing::info!(
        "Prompt {} for session {} resolved: granted={}",
        body.request_id,
        body.session_id,
        body.granted
    );

    Ok(ApiResponse::success(ResolveResult {
        session_id: body.session_id,
        request_id: body.request_id,
        granted: body.granted,
    }))
}
