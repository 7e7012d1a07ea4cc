use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a signed session token using JWT_SECRET")]
    Issue {
        #[arg(long, help = "Tenant (restaurant) name")]
        tenant: String,
        #[arg(long, help = "User name")]
        user: String,
        #[arg(long, help = "Role name, omitted for a role-less user")]
        role: Option<String>,
        #[arg(long, help = "Mark the user as super-admin")]
        super_admin: bool,
        #[arg(long, help = "Session id to embed (random if omitted)")]
        session: Option<Uuid>,
        #[arg(long, help = "Token lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },
}

pub fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue {
            tenant,
            user,
            role,
            super_admin,
            session,
            hours,
        } => {
            let security = &config().security;
            if security.jwt_secret.is_empty() {
                anyhow::bail!("JWT_SECRET is not set");
            }

            let sid = session.unwrap_or_else(Uuid::new_v4);
            let hours = hours.unwrap_or(security.jwt_expiry_hours);
            let claims = Claims::new(tenant, user, role, super_admin, sid, hours);
            let token = generate_jwt(&claims, &security.jwt_secret)?;

            output_success(
                output_format,
                &token,
                json!({
                    "token": token,
                    "session_id": sid,
                    "expires_at": claims.exp,
                }),
            )
        }
    }
}
