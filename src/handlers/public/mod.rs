use axum::extract::State;
use serde_json::{json, Value};

use crate::middleware::ApiResponse;
use crate::server::AppState;

/// GET / - Service banner and endpoint map
pub async fn root() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": "Brigade Console",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Role and step-up elevation authorization for the restaurant console",
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "whoami": "/api/auth/whoami (protected)",
            "session": "/api/auth/session (protected, DELETE to log out)",
            "elevation": "/api/auth/elevation (protected)",
            "decide": "/api/auth/decide (protected)",
            "authorize": "/api/auth/authorize (protected)",
            "prompt": "/api/prompt/resolve (prompt service)",
        }
    }))
}

/// GET /health - Liveness plus the number of live sessions
pub async fn health(State(state): State<AppState>) -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "sessions": state.sessions.len(),
    }))
}
