use anyhow::{bail, Context};
use clap::Subcommand;

use crate::cli::commands::{Period, PeriodArgs};
use crate::cli::utils::{output_collection, output_record};
use crate::cli::OutputFormat;
use crate::door::filter::SessionFilter;
use crate::door::models::Session;
use crate::door::DoorApi;

#[derive(Subcommand)]
pub enum SessionCommands {
    #[command(about = "Show one experiment session")]
    Get {
        #[arg(help = "DOOR session id")]
        id: String,
    },

    #[command(about = "List the sessions of a proposal")]
    Proposal {
        #[arg(help = "DOOR proposal id")]
        id: String,
        #[arg(long, help = "Keep only sessions on this beamline (needs --start/--end)")]
        beamline: Option<String>,
        #[arg(long, help = "Window start (YYYY-MM-DD)")]
        start: Option<String>,
        #[arg(long, help = "Window end (YYYY-MM-DD)")]
        end: Option<String>,
    },

    #[command(about = "List the sessions of a beamline")]
    Beamline {
        #[arg(help = "Beamline name, e.g. P11")]
        beamline: String,
        #[command(flatten)]
        period: PeriodArgs,
    },
}

pub async fn handle(
    cmd: SessionCommands,
    api: &DoorApi,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        SessionCommands::Get { id } => {
            let session = api
                .get_session(&id)
                .await
                .with_context(|| format!("Session {} could not be retrieved from DOOR", id))?;
            output_record(&output_format, "session", &id, &session)
        }
        SessionCommands::Proposal {
            id,
            beamline,
            start,
            end,
        } => {
            let sessions = match (beamline, start, end) {
                (None, None, None) => api.get_proposal_sessions(&id).await,
                (Some(beamline), Some(start), Some(end)) => {
                    let filter = SessionFilter::parse(&beamline, &start, &end)?;
                    api.get_proposal_sessions_filtered(&id, &filter).await
                }
                _ => bail!("--beamline, --start and --end must be given together"),
            }
            .with_context(|| format!("Sessions of proposal {} could not be retrieved", id))?;

            output_collection(&output_format, "sessions", &sessions, summary)
        }
        SessionCommands::Beamline { beamline, period } => {
            let sessions = match period.period()? {
                Period::All => api.get_beamline_sessions(&beamline).await,
                Period::Year(year) => api.get_beamline_sessions_by_year(&beamline, year).await,
                Period::Range(from, to) => {
                    api.get_beamline_sessions_by_date_range(&beamline, from, to).await
                }
            }
            .with_context(|| format!("Sessions of beamline {} could not be retrieved", beamline))?;

            output_collection(&output_format, "sessions", &sessions, summary)
        }
    }
}

fn summary(session: &Session) -> String {
    format!(
        "{}  {}  {} - {}",
        session.id, session.beamline_name, session.start_date, session.end_date
    )
}
