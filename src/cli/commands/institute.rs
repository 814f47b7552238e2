use anyhow::Context;
use clap::Subcommand;

use crate::cli::utils::{keyed_records, output_collection, output_record};
use crate::cli::OutputFormat;
use crate::door::DoorApi;

#[derive(Subcommand)]
pub enum InstituteCommands {
    #[command(about = "Show one institute (name cut to 45 characters)")]
    Get {
        #[arg(help = "DOOR institute id")]
        id: String,
    },

    #[command(about = "List all institutes")]
    List,
}

pub async fn handle(
    cmd: InstituteCommands,
    api: &DoorApi,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        InstituteCommands::Get { id } => {
            let institute = api
                .get_institute(&id)
                .await
                .with_context(|| format!("Institute {} could not be retrieved from DOOR", id))?;
            output_record(&output_format, "institute", &id, &institute)
        }
        InstituteCommands::List => {
            let institutes = api
                .get_institute_list()
                .await
                .context("Institute list could not be retrieved from DOOR")?;
            let keyed = keyed_records("institute", &institutes, |institute| institute.id.as_str())?;
            output_collection(&output_format, "institutes", &keyed, |entry| {
                format!(
                    "{}  {}",
                    entry["id"].as_str().unwrap_or_default(),
                    entry["institute"]["name"].as_str().unwrap_or_default()
                )
            })
        }
    }
}
