#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use brigade_console::auth::{generate_jwt, Authorizer, Claims, JwtIdentityProvider};
use brigade_console::config::AppConfig;
use brigade_console::server::{app, AppState};
use brigade_console::session::{AuthSession, SessionOptions, SessionRegistry};

pub const SECRET: &str = "integration-secret";
pub const PROMPT_SECRET: &str = "integration-prompt-secret";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

/// App with the built-in console policy and prompts that never time out
pub fn spawn_app() -> TestApp {
    spawn_app_with(SessionOptions::default())
}

pub fn spawn_app_with(options: SessionOptions) -> TestApp {
    let mut config = AppConfig::development();
    config.api.enable_request_logging = false;
    config.security.jwt_secret = SECRET.to_string();

    let sessions = SessionRegistry::new(Arc::new(Authorizer::default()), options);
    let state = AppState::new(Arc::new(sessions), Arc::new(JwtIdentityProvider::new(SECRET)))
        .with_prompt_secret(PROMPT_SECRET);

    TestApp {
        router: app(state.clone(), &config),
        state,
    }
}

pub fn spawn_app_with_timeout(timeout: Duration) -> TestApp {
    spawn_app_with(SessionOptions {
        prompt_timeout: Some(timeout),
        ..SessionOptions::default()
    })
}

/// A bearer token plus the session id embedded in it
pub struct Login {
    pub token: String,
    pub session_id: Uuid,
}

pub fn login(user: &str, role: Option<&str>) -> Login {
    login_as(user, role, false)
}

pub fn login_as(user: &str, role: Option<&str>, super_admin: bool) -> Login {
    let session_id = Uuid::new_v4();
    let claims = Claims::new(
        "bistro".to_string(),
        user.to_string(),
        role.map(str::to_string),
        super_admin,
        session_id,
        1,
    );
    let token = generate_jwt(&claims, SECRET).expect("token");
    Login { token, session_id }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        send(self.router.clone(), method, uri, token, body).await
    }

    pub fn session(&self, login: &Login) -> Option<Arc<AuthSession>> {
        self.state.sessions.get(login.session_id)
    }

    /// Poll the elevation status until a prompt is pending, returning it
    pub async fn wait_for_prompt(&self, login: &Login) -> Result<Value> {
        for _ in 0..200 {
            let (_, body) = self
                .request(Method::GET, "/api/auth/elevation", Some(&login.token), None)
                .await?;
            if !body["data"]["pending"].is_null() {
                return Ok(body["data"]["pending"].clone());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        anyhow::bail!("no elevation prompt opened for session {}", login.session_id)
    }

    /// Answer a prompt the way the prompt service does, with the callback secret
    pub async fn resolve_request(&self, login: &Login, request_id: &Value, granted: bool) -> Result<(StatusCode, Value)> {
        self.request(
            Method::POST,
            "/api/prompt/resolve",
            Some(PROMPT_SECRET),
            Some(json!({
                "session_id": login.session_id,
                "request_id": request_id,
                "granted": granted,
            })),
        )
        .await
    }

    /// Wait for the session's prompt and answer it
    pub async fn resolve_pending(&self, login: &Login, granted: bool) -> Result<(StatusCode, Value)> {
        let prompt = self.wait_for_prompt(login).await?;
        self.resolve_request(login, &prompt["request_id"], granted).await
    }

    /// Wait until `count` requests are parked on the session's prompt
    pub async fn wait_for_waiters(&self, login: &Login, count: usize) -> Result<()> {
        for _ in 0..200 {
            if let Some(session) = self.session(login) {
                if session.elevation().waiting() >= count {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        anyhow::bail!("expected {} waiters on session {}", count, login.session_id)
    }
}

pub async fn send(
    router: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = router.oneshot(request).await.context("router failed")?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body for {}", uri))?
    };

    Ok((status, json))
}
