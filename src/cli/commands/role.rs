use clap::Subcommand;
use serde_json::json;

use crate::auth::Authorizer;
use crate::cli::utils::{output_success, output_table};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum RoleCommands {
    #[command(about = "Show the numeric level of a role")]
    Level {
        #[arg(help = "Role name, case-insensitive")]
        role: String,
    },

    #[command(about = "Check whether a role satisfies a required role")]
    Check {
        #[arg(help = "Role held by the user")]
        user_role: String,
        #[arg(help = "Role the route requires")]
        required_role: String,
    },

    #[command(about = "List known roles, highest first")]
    List,
}

pub fn handle(cmd: RoleCommands, authorizer: &Authorizer, output_format: OutputFormat) -> anyhow::Result<()> {
    let roles = authorizer.roles();

    match cmd {
        RoleCommands::Level { role } => {
            let level = roles.role_level(&role);
            output_success(
                output_format,
                &format!("{}: {}", role, level),
                json!({ "role": role, "level": level }),
            )
        }
        RoleCommands::Check { user_role, required_role } => {
            let access = roles.has_access(Some(user_role.as_str()), &required_role);
            let verdict = if access { "satisfies" } else { "does not satisfy" };
            output_success(
                output_format,
                &format!("{} {} {}", user_role, verdict, required_role),
                json!({
                    "user_role": user_role,
                    "required_role": required_role,
                    "access": access,
                }),
            )
        }
        RoleCommands::List => {
            let entries = roles.roles();
            let rows: Vec<_> = entries
                .iter()
                .map(|(role, level)| (role.to_string(), level.to_string()))
                .collect();
            let data: Vec<_> = entries
                .iter()
                .map(|(role, level)| json!({ "role": role, "level": level }))
                .collect();
            output_table(output_format, &rows, json!(data))
        }
    }
}
