use anyhow::{bail, Context};
use clap::{Args, Subcommand};

use crate::cli::utils::output_error;
use crate::cli::OutputFormat;
use crate::config::DoorConfig;
use crate::door::filter::SessionFilter;
use crate::door::DoorApi;
use crate::transform::{ispyb, ispyb_java, pyispyb};

/// Beamline window applied to the exported sessions.
#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    #[arg(long, help = "Beamline to keep sessions of", default_value = "P11")]
    pub beamline: String,
    #[arg(long, requires = "end", help = "Window start (YYYY-MM-DD)")]
    pub start: Option<String>,
    #[arg(long, requires = "start", help = "Window end (YYYY-MM-DD)")]
    pub end: Option<String>,
}

impl WindowArgs {
    pub fn filter(&self) -> anyhow::Result<Option<SessionFilter>> {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => Ok(Some(SessionFilter::parse(&self.beamline, start, end)?)),
            (None, None) => Ok(None),
            _ => bail!("--start and --end must be given together"),
        }
    }
}

#[derive(Subcommand)]
pub enum ExportCommands {
    #[command(about = "Legacy ISPyB proposal document")]
    Ispyb {
        #[arg(help = "DOOR proposal id")]
        id: String,
    },

    #[command(about = "py-ISPyB sync document, as syncdoor would push it")]
    Pyispyb {
        #[arg(help = "DOOR proposal id")]
        id: String,
        #[command(flatten)]
        window: WindowArgs,
    },

    #[command(name = "java-proposers", about = "Java ISPyB proposer list")]
    JavaProposers {
        #[arg(help = "DOOR proposal id")]
        id: String,
    },

    #[command(name = "java-labcontacts", about = "Java ISPyB lab contact list")]
    JavaLabcontacts {
        #[arg(help = "DOOR proposal id")]
        id: String,
    },

    #[command(name = "java-sessions", about = "Java ISPyB session list")]
    JavaSessions {
        #[arg(help = "DOOR proposal id")]
        id: String,
        #[command(flatten)]
        window: WindowArgs,
    },
}

/// Documents are printed as rendered; the output flags only shape errors.
pub async fn handle(
    cmd: ExportCommands,
    api: &DoorApi,
    config: &DoorConfig,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let (what, id, rendered) = match cmd {
        ExportCommands::Ispyb { id } => {
            let rendered = ispyb::full_proposal_to_ispyb_json(api, &id, &ispyb::IspybOptions::default())
                .await
                .with_context(|| format!("Could not build the ISPyB document for {}", id))?;
            ("ISPyB document", id, rendered)
        }
        ExportCommands::Pyispyb { id, window } => {
            let options = pyispyb::PyIspybOptions {
                filter: window.filter()?,
                fallback_person_id: config.fallback_person_id.clone(),
                ..Default::default()
            };
            let rendered = pyispyb::full_proposal_to_pyispyb_json(api, &id, &options)
                .await
                .with_context(|| format!("Could not build the py-ISPyB document for {}", id))?;
            ("py-ISPyB document", id, Some(rendered))
        }
        ExportCommands::JavaProposers { id } => {
            let rendered = ispyb_java::proposers(api, &id).await?;
            ("proposers", id, rendered)
        }
        ExportCommands::JavaLabcontacts { id } => {
            let rendered = ispyb_java::labcontacts(api, &id).await?;
            ("lab contacts", id, rendered)
        }
        ExportCommands::JavaSessions { id, window } => {
            let filter = window.filter()?;
            let rendered = ispyb_java::sessions(api, &id, filter.as_ref()).await?;
            ("sessions", id, rendered)
        }
    };

    match rendered {
        Some(document) => {
            println!("{}", document);
            Ok(())
        }
        None => {
            let message = format!("No {} for proposal {}", what, id);
            output_error(&output_format, &message, Some("EMPTY"))?;
            bail!(message)
        }
    }
}
