use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::server::AppState;
use crate::session::AuthSession;

/// Session of the authenticated caller, injected by `jwt_auth_middleware`
#[derive(Clone)]
pub struct CurrentSession(pub Arc<AuthSession>);

/// Bearer authentication: resolves the caller's identity and attaches their session
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;

    let identity = state.identity.identify(&token).await?;
    let session = state.sessions.get_or_init(identity);

    request.extensions_mut().insert(CurrentSession(session));

    Ok(next.run(request).await)
}

/// Prompt-service authentication: the bearer must be the configured callback secret.
/// User session tokens are never accepted here.
pub async fn prompt_callback_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;

    if state.prompt_secret.is_empty() || !secrets_match(&token, &state.prompt_secret) {
        tracing::warn!("Rejected prompt callback with an invalid credential");
        return Err(ApiError::unauthorized("Invalid prompt callback credential"));
    }

    Ok(next.run(request).await)
}

/// Compare without short-circuiting on the first differing byte
fn secrets_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc.def");
    }

    #[test]
    fn test_extract_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic Zm9v"));
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert!(extract_jwt_from_headers(&headers).is_err());

        assert!(extract_jwt_from_headers(&HeaderMap::new()).is_err());
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("prompt-secret", "prompt-secret"));
        assert!(!secrets_match("prompt-secreT", "prompt-secret"));
        assert!(!secrets_match("prompt", "prompt-secret"));
        assert!(!secrets_match("", "prompt-secret"));
    }
}
