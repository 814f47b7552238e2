pub mod commands;
pub mod sync;
pub mod utils;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::DoorConfig;
use crate::door::{DoorApi, DoorAuthClient};

#[derive(Parser)]
#[command(name = "door")]
#[command(about = "door - inspect DESY DOOR records and their ISPyB renderings")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Proposal lookups")]
    Proposal {
        #[command(subcommand)]
        cmd: commands::proposal::ProposalCommands,
    },

    #[command(about = "Experiment session lookups")]
    Session {
        #[command(subcommand)]
        cmd: commands::session::SessionCommands,
    },

    #[command(about = "User and role lookups")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },

    #[command(about = "Institute lookups")]
    Institute {
        #[command(subcommand)]
        cmd: commands::institute::InstituteCommands,
    },

    #[command(about = "DOOR user authentication")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Render a proposal for one of the ISPyB flavours")]
    Export {
        #[command(subcommand)]
        cmd: commands::export::ExportCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
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

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = DoorConfig::from_env().context("DOOR configuration")?;

    let api = || DoorApi::from_config(&config);

    match cli.command {
        Commands::Proposal { cmd } => commands::proposal::handle(cmd, &api()?, output_format).await,
        Commands::Session { cmd } => commands::session::handle(cmd, &api()?, output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, &api()?, output_format).await,
        Commands::Institute { cmd } => {
            commands::institute::handle(cmd, &api()?, output_format).await
        }
        Commands::Auth { cmd } => {
            let auth = DoorAuthClient::from_config(&config)?;
            commands::auth::handle(cmd, &auth, output_format).await
        }
        Commands::Export { cmd } => {
            commands::export::handle(cmd, &api()?, &config, output_format).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_export_with_window() {
        let cli = Cli::try_parse_from([
            "door", "--json", "export", "pyispyb", "20010001", "--start", "2022-01-01", "--end",
            "2022-12-31",
        ])
        .unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Commands::Export {
                cmd: commands::export::ExportCommands::Pyispyb { id, window },
            } => {
                assert_eq!(id, "20010001");
                assert_eq!(window.beamline, "P11");
                assert_eq!(window.start.as_deref(), Some("2022-01-01"));
            }
            _ => panic!("expected export pyispyb"),
        }
    }
}
