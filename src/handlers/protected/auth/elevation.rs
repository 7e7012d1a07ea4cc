use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::ElevationTier;
use crate::elevation::PromptRequest;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::session::AuthSession;

#[derive(Debug, Serialize)]
pub struct TierStatus {
    pub tier: ElevationTier,
    pub valid: bool,
    pub until: Option<DateTime<Utc>>,
}

/// Snapshot of one session's elevation
#[derive(Debug, Serialize)]
pub struct ElevationStatus {
    pub super_admin: bool,
    pub tiers: Vec<TierStatus>,
    pub pending: Option<PromptRequest>,
}

impl ElevationStatus {
    pub fn of(session: &AuthSession) -> Self {
        let elevation = session.elevation();
        let state = elevation.state();

        Self {
            super_admin: elevation.is_super_admin(),
            tiers: ElevationTier::ALL
                .into_iter()
                .filter(|tier| *tier != ElevationTier::None)
                .map(|tier| TierStatus {
                    tier,
                    valid: elevation.is_elevated(tier),
                    until: state.until(tier),
                })
                .collect(),
            pending: elevation.pending_prompt(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ElevationRequest {
    pub tier: String,
}

/// GET /api/auth/elevation - Validity per tier, expiries and the pending prompt
pub async fn status(Extension(CurrentSession(session)): Extension<CurrentSession>) -> ApiResult<ElevationStatus> {
    Ok(ApiResponse::success(ElevationStatus::of(&session)))
}

/// POST /api/auth/elevation - Require a tier, holding the request until the prompt resolves
///
/// Expected Input:
/// ```json
/// { "tier": "password" | "elevated" }
/// ```
///
/// Returns immediately when the tier is already valid. Otherwise joins (or
/// opens) the session's single prompt and answers once it is resolved:
/// 200 on grant, 403 on denial or cancellation, 408 when the prompt times out.
pub async fn require(
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Json(payload): Json<ElevationRequest>,
) -> ApiResult<ElevationStatus> {
    let tier = ElevationTier::parse(&payload.tier)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown elevation tier '{}'", payload.tier)))?;

    session.request_elevation(tier).await?;

    Ok(ApiResponse::success(ElevationStatus::of(&session)))
}

/// DELETE /api/auth/elevation - Drop back to base privileges
pub async fn clear(Extension(CurrentSession(session)): Extension<CurrentSession>) -> ApiResult<ElevationStatus> {
    session.clear_elevation();
    Ok(ApiResponse::success(ElevationStatus::of(&session)))
}
