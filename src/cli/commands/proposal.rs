use anyhow::Context;
use clap::Subcommand;

use crate::cli::commands::{Period, PeriodArgs};
use crate::cli::utils::{output_collection, output_record};
use crate::cli::OutputFormat;
use crate::door::models::Proposal;
use crate::door::DoorApi;

#[derive(Subcommand)]
pub enum ProposalCommands {
    #[command(about = "Show one proposal")]
    Get {
        #[arg(help = "DOOR proposal id, e.g. 20210009")]
        id: String,
    },

    #[command(about = "List the proposals of a beamline")]
    Beamline {
        #[arg(help = "Beamline name, e.g. P11")]
        beamline: String,
        #[command(flatten)]
        period: PeriodArgs,
    },
}

pub async fn handle(
    cmd: ProposalCommands,
    api: &DoorApi,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        ProposalCommands::Get { id } => {
            let proposal = api
                .get_proposal(&id)
                .await
                .with_context(|| format!("Proposal {} could not be retrieved from DOOR", id))?;
            output_record(&output_format, "proposal", &id, &proposal)
        }
        ProposalCommands::Beamline { beamline, period } => {
            let proposals = match period.period()? {
                Period::All => api.get_beamline_proposals(&beamline).await,
                Period::Year(year) => api.get_beamline_proposals_by_year(&beamline, year).await,
                Period::Range(from, to) => {
                    api.get_beamline_proposals_by_date_range(&beamline, from, to).await
                }
            }
            .with_context(|| format!("Proposals of beamline {} could not be retrieved", beamline))?;

            output_collection(&output_format, "proposals", &proposals, summary)
        }
    }
}

fn summary(proposal: &Proposal) -> String {
    format!(
        "{}-{}  {}  (PI {})",
        proposal.code,
        proposal.number,
        proposal.title,
        proposal.pi.as_deref().unwrap_or("-")
    )
}
