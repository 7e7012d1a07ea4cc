use axum::{extract::State, Extension};
use serde::Serialize;
use uuid::Uuid;

use super::elevation::ElevationStatus;
use crate::auth::Identity;
use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    #[serde(flatten)]
    pub identity: Identity,
    pub role_level: f64,
    pub elevation: ElevationStatus,
}

/// GET /api/auth/whoami - Current identity with role level and elevation status
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "tenant": "bistro",
///     "user": "ana",
///     "role": "OWNER",
///     "is_super_admin": false,
///     "session_id": "6f1c...",
///     "role_level": 3.0,
///     "elevation": { "tiers": [...], "pending": null }
///   }
/// }
/// ```
pub async fn whoami(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> ApiResult<WhoAmI> {
    let identity = session.identity().clone();
    let role_level = identity
        .role()
        .map(|role| state.sessions.authorizer().roles().role_level(role))
        .unwrap_or_default();

    Ok(ApiResponse::success(WhoAmI {
        identity,
        role_level,
        elevation: ElevationStatus::of(&session),
    }))
}

#[derive(Debug, Serialize)]
pub struct LogoutResult {
    pub session_id: Uuid,
    pub disposed: bool,
}

/// DELETE /api/auth/session - Log out: dispose the session and erase its elevation
///
/// Any open prompt is withdrawn and its waiters see `Cancelled`.
pub async fn logout(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> ApiResult<LogoutResult> {
    let session_id = session.identity().session_id;
    let disposed = state.sessions.dispose(session_id);

    tracing::info!("Logout for {}@{}", session.identity().user, session.identity().tenant);

    Ok(ApiResponse::success(LogoutResult { session_id, disposed }))
}
