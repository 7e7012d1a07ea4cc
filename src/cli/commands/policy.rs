use clap::Subcommand;
use serde_json::json;

use crate::auth::Authorizer;
use crate::cli::utils::{output_success, output_table};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum PolicyCommands {
    #[command(about = "Show the elevation tier required for a path")]
    Tier {
        #[arg(help = "Route path, e.g. /admin/finance/export")]
        path: String,
    },

    #[command(about = "List route prefixes and their tiers")]
    List,
}

pub fn handle(cmd: PolicyCommands, authorizer: &Authorizer, output_format: OutputFormat) -> anyhow::Result<()> {
    let policy = authorizer.policy();

    match cmd {
        PolicyCommands::Tier { path } => {
            let tier = policy.required_tier(&path);
            output_success(
                output_format,
                &format!("{} requires '{}'", path, tier),
                json!({ "path": path, "tier": tier }),
            )
        }
        PolicyCommands::List => {
            let mut rules = policy.rules().to_vec();
            rules.sort_by(|a, b| a.prefix.cmp(&b.prefix));

            let rows: Vec<_> = rules
                .iter()
                .map(|rule| (rule.prefix.clone(), rule.tier.to_string()))
                .collect();
            output_table(output_format, &rows, json!(rules))
        }
    }
}
