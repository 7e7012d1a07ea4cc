use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{Authorizer, IdentityProvider, JwtIdentityProvider, PolicyDocument};
use crate::config::AppConfig;
use crate::handlers::{prompt, protected, public};
use crate::middleware::{jwt_auth_middleware, prompt_callback_middleware};
use crate::session::{SessionOptions, SessionRegistry};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Credential the prompt service presents on callbacks; empty rejects every callback
    pub prompt_secret: Arc<str>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionRegistry>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            sessions,
            identity,
            prompt_secret: Arc::from(""),
        }
    }

    pub fn with_prompt_secret(mut self, secret: impl AsRef<str>) -> Self {
        self.prompt_secret = Arc::from(secret.as_ref());
        self
    }

    /// Build state from configuration, loading the YAML policy when one is configured
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let authorizer = match &config.elevation.policy_file {
            Some(path) => {
                let document = PolicyDocument::load(path)?;
                tracing::info!("Loaded authorization policy from {}", path.display());
                Authorizer::new(document.role_hierarchy(), document.route_policy())
            }
            None => Authorizer::default(),
        };

        let options = SessionOptions::from_config(&config.elevation, config.security.enable_audit_logging);
        let sessions = SessionRegistry::new(Arc::new(authorizer), options);
        let identity = JwtIdentityProvider::new(config.security.jwt_secret.clone());

        Ok(Self::new(Arc::new(sessions), Arc::new(identity))
            .with_prompt_secret(&config.security.prompt_callback_secret))
    }
}

/// Full application router with global middleware
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        .merge(public_routes(state.clone()))
        // Protected API
        .merge(auth_routes(state.clone()))
        // Prompt service callbacks
        .merge(prompt_routes(state));

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }

    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router
}

fn public_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .with_state(state)
}

fn auth_routes(state: AppState) -> Router {
    use protected::auth;

    Router::new()
        // Session
        .route("/api/auth/whoami", get(auth::session_whoami))
        .route("/api/auth/session", axum::routing::delete(auth::session_logout))
        // Elevation lifecycle
        .route(
            "/api/auth/elevation",
            get(auth::elevation_status)
                .post(auth::elevation_require)
                .delete(auth::elevation_clear),
        )
        // Authorization decisions
        .route("/api/auth/decide", post(auth::decide_post))
        .route("/api/auth/authorize", post(auth::authorize_post))
        .layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware))
        .with_state(state)
}

fn prompt_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/prompt/resolve", post(prompt::resolve))
        .layer(middleware::from_fn_with_state(state.clone(), prompt_callback_middleware))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|origin| origin.parse().ok()).collect();

    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
