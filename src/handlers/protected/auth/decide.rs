use axum::{Extension, Json};
use serde::Deserialize;

use crate::auth::{AuthzError, Decision, Route};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentSession};

#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    #[serde(flatten)]
    pub route: Route,
    /// `false` answers 401 instead of holding the request open for the prompt
    #[serde(default = "default_wait")]
    pub wait: bool,
}

fn default_wait() -> bool {
    true
}

/// POST /api/auth/decide - Decide access to a route without prompting
///
/// Expected Input:
/// ```json
/// { "path": "/admin/finance", "required_role": "MANAGER" }
/// ```
///
/// Expected Output:
/// ```json
/// { "success": true, "data": { "decision": "require_elevation", "tier": "elevated" } }
/// ```
pub async fn decide(
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Json(route): Json<Route>,
) -> ApiResult<Decision> {
    Ok(ApiResponse::success(session.decide(&route)))
}

/// POST /api/auth/authorize - Decide, elevating through the prompt when needed
///
/// Same input as `/api/auth/decide`, plus an optional `wait` flag. Answers
/// `allow` or the error that ended the round trip (403 role insufficient or
/// denied, 408 timed out, 401 elevation required when `wait` is false).
pub async fn authorize(
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Json(payload): Json<AuthorizeRequest>,
) -> ApiResult<Decision> {
    if payload.wait {
        session.authorize(&payload.route).await?;
        return Ok(ApiResponse::success(Decision::Allow));
    }

    match session.decide(&payload.route) {
        Decision::Allow => Ok(ApiResponse::success(Decision::Allow)),
        Decision::RoleInsufficient { required_role } => Err(AuthzError::RoleInsufficient {
            role: session.identity().role.clone(),
            required: required_role,
        }
        .into()),
        Decision::RequireElevation { tier } => Err(ApiError::ElevationRequired(tier)),
    }
}
