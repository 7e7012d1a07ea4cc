pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::auth::{Authorizer, PolicyDocument};
use crate::config::config;

#[derive(Parser)]
#[command(name = "brigade")]
#[command(about = "Brigade CLI - Inspect roles, route policy and elevation sessions")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "YAML policy file (defaults to ELEVATION_POLICY_FILE or the built-in policy)")]
    pub policy: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Route elevation policy")]
    Policy {
        #[command(subcommand)]
        cmd: commands::policy::PolicyCommands,
    },

    #[command(about = "Role hierarchy")]
    Role {
        #[command(subcommand)]
        cmd: commands::role::RoleCommands,
    },

    #[command(about = "Development session tokens")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },

    #[command(about = "Persisted elevation state of a session")]
    Elevation {
        #[command(subcommand)]
        cmd: commands::elevation::ElevationCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Role hierarchy and route policy from `--policy`, the configured file, or the built-ins
pub fn load_authorizer(policy: Option<&Path>) -> anyhow::Result<Authorizer> {
    let path = policy.or(config().elevation.policy_file.as_deref());

    match path {
        Some(path) => {
            let document = PolicyDocument::load(path)?;
            Ok(Authorizer::new(document.role_hierarchy(), document.route_policy()))
        }
        None => Ok(Authorizer::default()),
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let policy = cli.policy.as_deref();

    match cli.command {
        Commands::Policy { cmd } => commands::policy::handle(cmd, &load_authorizer(policy)?, output_format),
        Commands::Role { cmd } => commands::role::handle(cmd, &load_authorizer(policy)?, output_format),
        Commands::Token { cmd } => commands::token::handle(cmd, output_format),
        Commands::Elevation { cmd } => commands::elevation::handle(cmd, output_format),
    }
}
