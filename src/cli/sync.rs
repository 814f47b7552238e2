//! `syncdoor`: push one DOOR proposal into py-ISPyB.

use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use crate::config::{AppConfig, DoorConfig};
use crate::door::filter::SessionFilter;
use crate::door::DoorApi;
use crate::sync::PyIspybClient;
use crate::transform::pyispyb::{full_proposal_to_pyispyb_json, PyIspybOptions};

#[derive(Parser, Debug)]
#[command(name = "syncdoor")]
#[command(about = "Synchronise a DESY DOOR proposal with py-ISPyB")]
#[command(version)]
#[command(arg_required_else_help = true)]
pub struct SyncArgs {
    #[arg(
        short = 'p',
        long = "proposal_id",
        visible_alias = "proposal",
        help = "DOOR proposal id, e.g. 20210002"
    )]
    pub proposal_id: String,

    #[arg(long, help = "Sessions starting on or after this day (YYYY-MM-DD)")]
    pub start: Option<String>,

    #[arg(long, help = "Sessions ending on or before this day (YYYY-MM-DD)")]
    pub end: Option<String>,

    #[arg(long, default_value = "P11", help = "Beamline the date window applies to")]
    pub beamline: String,

    #[arg(long, help = "Only fetch from DOOR and print the document")]
    pub door: bool,
}

impl SyncArgs {
    /// The session window, required for the commissioning proposal.
    pub fn session_filter(&self, config: &DoorConfig) -> anyhow::Result<Option<SessionFilter>> {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => {
                Ok(Some(SessionFilter::parse(&self.beamline, start, end)?))
            }
            (None, None) if self.proposal_id == config.commissioning_proposal_id => bail!(
                "Proposal {} is the commissioning proposal; --start and --end are required",
                self.proposal_id
            ),
            (None, None) => Ok(None),
            _ => bail!("--start and --end must be given together"),
        }
    }
}

pub async fn run(args: SyncArgs) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Configuration")?;
    let filter = args.session_filter(&config.door)?;

    let api = DoorApi::from_config(&config.door)?;
    let options = PyIspybOptions {
        filter,
        fallback_person_id: config.door.fallback_person_id.clone(),
        ..Default::default()
    };

    let started = Instant::now();
    let document = full_proposal_to_pyispyb_json(&api, &args.proposal_id, &options)
        .await
        .with_context(|| {
            format!(
                "There was an error retrieving proposal {} from the DOOR API. \
                 Probably the proposal Id does not exist within the DOOR API environment.",
                args.proposal_id
            )
        })?;
    println!(
        "Retrieving proposal {} from the DOOR API took {:.3}",
        args.proposal_id,
        started.elapsed().as_secs_f64()
    );

    if args.door {
        println!("{}", document);
        return Ok(());
    }

    let client = PyIspybClient::new(config.pyispyb)?;
    let token = client.login().await?;
    let reply = client
        .sync_proposal(&token, &args.proposal_id, &document)
        .await?;
    info!(proposal_id = %args.proposal_id, "Proposal synchronised with py-ispyb");
    println!("{}", reply);
    Ok(())
}
