// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::{AuthzError, ClaimsError, ElevationTier};
use crate::elevation::ElevationError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 401 Unauthorized, re-authentication round trip needed
    ElevationRequired(ElevationTier),

    // 403 Forbidden
    Forbidden(String),

    // 403 Forbidden, prompt denied or withdrawn
    ElevationDenied(String),

    // 404 Not Found
    NotFound(String),

    // 408 Request Timeout
    RequestTimeout(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::ElevationRequired(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::ElevationDenied(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::RequestTimeout(_) => 408,
            ApiError::InternalServerError(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::ElevationRequired(tier) => format!("Elevation to '{}' required", tier),
            ApiError::Forbidden(msg) => msg.clone(),
            ApiError::ElevationDenied(msg) => msg.clone(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::RequestTimeout(msg) => msg.clone(),
            ApiError::InternalServerError(msg) => msg.clone(),
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::ElevationRequired(_) => "ELEVATION_REQUIRED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::ElevationDenied(_) => "ELEVATION_DENIED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::RequestTimeout(_) => "REQUEST_TIMEOUT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ElevationRequired(tier) = self {
            response["tier"] = json!(tier);
        }

        response
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

impl From<ElevationError> for ApiError {
    fn from(err: ElevationError) -> Self {
        match err {
            ElevationError::TimedOut => ApiError::RequestTimeout(err.to_string()),
            ElevationError::Denied | ElevationError::Cancelled => ApiError::ElevationDenied(err.to_string()),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::RoleInsufficient { .. } => ApiError::forbidden(err.to_string()),
            AuthzError::ElevationDenied { reason, .. } => ApiError::from(reason),
        }
    }
}

impl From<ClaimsError> for ApiError {
    fn from(err: ClaimsError) -> Self {
        match err {
            ClaimsError::InvalidToken(_) => ApiError::unauthorized(err.to_string()),
            ClaimsError::InvalidSecret | ClaimsError::TokenGeneration(_) => {
                // Don't expose signing configuration to clients
                tracing::error!("Token configuration error: {}", err);
                ApiError::internal_server_error("Authentication is not configured")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevation_required_carries_tier() {
        let err = ApiError::ElevationRequired(ElevationTier::Elevated);
        assert_eq!(err.status_code(), 401);
        let body = err.to_json();
        assert_eq!(body["code"], "ELEVATION_REQUIRED");
        assert_eq!(body["tier"], "elevated");
        assert_eq!(body["success"], false);
    }

    #[test]
    fn test_authz_error_mapping() {
        let role = ApiError::from(AuthzError::RoleInsufficient {
            role: Some("STAFF".to_string()),
            required: "OWNER".to_string(),
        });
        assert_eq!(role.status_code(), 403);
        assert_eq!(role.error_code(), "FORBIDDEN");

        let timeout = ApiError::from(AuthzError::ElevationDenied {
            tier: ElevationTier::Password,
            reason: ElevationError::TimedOut,
        });
        assert_eq!(timeout.status_code(), 408);

        let denied = ApiError::from(ElevationError::Denied);
        assert_eq!(denied.error_code(), "ELEVATION_DENIED");
    }
}
