use tracing_subscriber::EnvFilter;

use brigade_console::config::{config, Environment};
use brigade_console::server::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up JWT_SECRET, ELEVATION_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config();
    tracing::info!("Starting Brigade Console in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        match config.environment {
            Environment::Development => {}
            _ => anyhow::bail!("JWT_SECRET must be set outside development"),
        }
    }

    if config.security.prompt_callback_secret.is_empty() {
        match config.environment {
            Environment::Development => tracing::warn!("PROMPT_CALLBACK_SECRET is empty; prompt callbacks are disabled"),
            _ => anyhow::bail!("PROMPT_CALLBACK_SECRET must be set outside development"),
        }
    }

    let state = AppState::from_config(config)?;
    let app = app(state, config);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Brigade Console listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
