use clap::Subcommand;
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::ElevationTier;
use crate::cli::utils::{format_until, output_success, output_table};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::elevation::ElevationStateStore;
use crate::session::store::{FileSessionStore, SessionStore};

#[derive(Subcommand)]
pub enum ElevationCommands {
    #[command(about = "Show unexpired elevation persisted for a session")]
    Status {
        #[arg(long, help = "Session id")]
        session: Uuid,
        #[arg(long, help = "Session store directory (defaults to ELEVATION_STORE_DIR)")]
        dir: Option<PathBuf>,
    },

    #[command(about = "Erase persisted elevation for a session")]
    Clear {
        #[arg(long, help = "Session id")]
        session: Uuid,
        #[arg(long, help = "Session store directory (defaults to ELEVATION_STORE_DIR)")]
        dir: Option<PathBuf>,
    },
}

/// Load a session's persisted state without rewriting the stored document
fn open_state(session: Uuid, dir: Option<PathBuf>) -> anyhow::Result<ElevationStateStore> {
    let elevation = &config().elevation;
    let dir = dir
        .or_else(|| elevation.store_dir.clone())
        .ok_or_else(|| anyhow::anyhow!("No session store directory; pass --dir or set ELEVATION_STORE_DIR"))?;

    let backend = FileSessionStore::for_session(&dir, session);
    tracing::debug!("Reading elevation state from {}", backend.path().display());

    let backend: Arc<dyn SessionStore> = Arc::new(backend);
    let mut state = ElevationStateStore::new(elevation.ttls(), Some(backend));
    state.inspect(Utc::now());
    Ok(state)
}

pub fn handle(cmd: ElevationCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ElevationCommands::Status { session, dir } => {
            let store = open_state(session, dir)?;
            let state = store.state();
            let now = Utc::now();

            let rows: Vec<_> = [ElevationTier::Password, ElevationTier::Elevated]
                .into_iter()
                .map(|tier| {
                    let status = if store.is_valid(tier, now) {
                        format!("valid until {}", format_until(state.until(tier)))
                    } else {
                        "not elevated".to_string()
                    };
                    (tier.to_string(), status)
                })
                .collect();

            output_table(
                output_format,
                &rows,
                json!({
                    "session_id": session,
                    "password_until": state.password_until,
                    "elevated_until": state.elevated_until,
                }),
            )
        }
        ElevationCommands::Clear { session, dir } => {
            let mut store = open_state(session, dir)?;
            store.clear();
            output_success(
                output_format,
                &format!("Cleared elevation for session {}", session),
                json!({ "session_id": session, "cleared": true }),
            )
        }
    }
}
