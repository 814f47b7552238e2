use anyhow::Context;
use clap::Subcommand;

use crate::cli::utils::{output_collection, output_record};
use crate::cli::OutputFormat;
use crate::door::DoorApi;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Show one DOOR user")]
    Get {
        #[arg(help = "DOOR user id")]
        id: String,
    },

    #[command(about = "List the roles of a user")]
    Roles {
        #[arg(help = "DOOR user id")]
        id: String,
    },
}

pub async fn handle(cmd: UserCommands, api: &DoorApi, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Get { id } => {
            let user = api
                .get_user(&id)
                .await
                .with_context(|| format!("User {} could not be retrieved from DOOR", id))?;
            output_record(&output_format, "user", &id, &user)
        }
        UserCommands::Roles { id } => {
            // no roles is a valid answer, not an error
            let roles = api.get_user_roles(&id).await.unwrap_or_default();
            output_collection(&output_format, "roles", &roles, |role| role.name.clone())
        }
    }
}
