//! Proposer, lab contact and session entries for the Java ISPyB API.
//!
//! The Java API wants flat "scientist + laboratory" rows per person and
//! dates broken into calendar fields rather than ISO strings.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::door::filter::SessionFilter;
use crate::door::models::{Proposal, Session};
use crate::door::DoorApi;
use crate::error::TransformError;
use crate::transform::{fetch_proposal, fetch_sessions, fetch_user, proposal_people, render_json, ProposalRole};

/// Java ISPyB proposal type id for MX proposals.
const JAVA_PROPOSAL_TYPE: u8 = 3;
const JAVA_PROPOSAL_GROUP: u16 = 103;

#[derive(Debug, Clone, Serialize)]
pub struct JavaProposer {
    #[serde(rename = "categoryCode")]
    pub category_code: String,
    #[serde(rename = "categoryCounter")]
    pub category_counter: String,
    #[serde(rename = "labAddress")]
    pub lab_address: [Option<String>; 5],
    #[serde(rename = "labAddress1")]
    pub lab_address1: Option<String>,
    #[serde(rename = "labAddress2")]
    pub lab_address2: Option<String>,
    #[serde(rename = "labCity")]
    pub lab_city: Option<String>,
    #[serde(rename = "labCountryCode")]
    pub lab_country_code: Option<String>,
    #[serde(rename = "labName")]
    pub lab_name: Option<String>,
    #[serde(rename = "labPostalCode")]
    pub lab_postal_code: Option<String>,
    #[serde(rename = "laboratoryPk")]
    pub laboratory_pk: Option<String>,
    #[serde(rename = "scientistEmail")]
    pub scientist_email: Option<String>,
    #[serde(rename = "scientistFirstName")]
    pub scientist_first_name: String,
    #[serde(rename = "scientistName")]
    pub scientist_name: String,
    #[serde(rename = "scientistPk")]
    pub scientist_pk: String,
    #[serde(rename = "siteId")]
    pub site_id: String,
    pub bllogin: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "proposalTitle")]
    pub proposal_title: String,
    #[serde(rename = "proposalType")]
    pub proposal_type: u8,
    #[serde(rename = "proposalGroup")]
    pub proposal_group: u16,
    #[serde(rename = "mainProposer")]
    pub main_proposer: bool,
    pub user: bool,
    pub proposer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JavaDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl From<&NaiveDateTime> for JavaDate {
    fn from(value: &NaiveDateTime) -> Self {
        Self {
            year: value.year(),
            month: value.month(),
            day: value.day(),
            hour: value.hour(),
            minute: value.minute(),
            second: value.second(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JavaLocalContact {
    #[serde(rename = "siteId")]
    pub site_id: String,
    #[serde(rename = "scientistFirstName")]
    pub scientist_first_name: String,
    #[serde(rename = "scientistName")]
    pub scientist_name: String,
    #[serde(rename = "scientistEmail")]
    pub scientist_email: Option<String>,
    pub bllogin: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JavaSession {
    #[serde(rename = "proposalPk")]
    pub proposal_pk: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "beamlineName")]
    pub beamline_name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "startDate")]
    pub start_date: JavaDate,
    #[serde(rename = "endDate")]
    pub end_date: JavaDate,
    #[serde(rename = "nbShifts")]
    pub nb_shifts: Value,
    pub scheduled: Value,
    #[serde(rename = "firstLocalContact")]
    pub first_local_contact: Option<JavaLocalContact>,
}

/// `"{code}-{number} {beamline} {dd.mm.yyyy}/{dd.mm.yyyy}"`
pub fn session_display_name(proposal: &Proposal, session: &Session) -> String {
    format!(
        "{}-{} {} {}/{}",
        proposal.code,
        proposal.number,
        session.beamline_name,
        session.start_date.format("%d.%m.%Y"),
        session.end_date.format("%d.%m.%Y")
    )
}

pub async fn ispyb_user(
    api: &DoorApi,
    user_id: &str,
    role: ProposalRole,
    proposal: &Proposal,
) -> Result<JavaProposer, TransformError> {
    let user = fetch_user(api, user_id).await?;
    let laboratory = match &user.laboratory_id {
        Some(lab_id) => api.get_institute(lab_id).await,
        None => None,
    };
    if laboratory.is_none() {
        warn!(user_id, "No laboratory found for proposer");
    }

    let address = laboratory.as_ref().and_then(|lab| lab.address.clone());

    Ok(JavaProposer {
        category_code: proposal.code.clone(),
        category_counter: proposal.number.to_string(),
        lab_address: [None, address.clone(), None, None, None],
        lab_address1: address,
        lab_address2: None,
        lab_city: laboratory
            .as_ref()
            .and_then(|lab| lab.city.as_ref())
            .map(|city| city.to_uppercase()),
        lab_country_code: laboratory.as_ref().and_then(|lab| lab.country.clone()),
        lab_name: laboratory.as_ref().map(|lab| lab.name.clone()),
        lab_postal_code: None,
        laboratory_pk: user.laboratory_id.clone(),
        scientist_email: user.email_address,
        scientist_first_name: user.given_name,
        scientist_name: user.family_name,
        scientist_pk: user_id.to_string(),
        site_id: user_id.to_string(),
        bllogin: user.login.clone(),
        user_name: user.login,
        proposal_title: proposal.title.clone(),
        proposal_type: JAVA_PROPOSAL_TYPE,
        proposal_group: JAVA_PROPOSAL_GROUP,
        main_proposer: role == ProposalRole::Pi,
        user: true,
        proposer: true,
    })
}

/// The PI as the single proposer, `None` without a PI.
pub async fn proposers(api: &DoorApi, proposal_id: &str) -> Result<Option<String>, TransformError> {
    let proposal = fetch_proposal(api, proposal_id).await?;
    let Some(pi) = &proposal.pi else {
        return Ok(None);
    };
    let entry = ispyb_user(api, pi, ProposalRole::Pi, &proposal).await?;
    Ok(Some(render_json(&[entry])?))
}

/// PI, leader and co-writers, `None` when the proposal has none of them.
pub async fn labcontacts(api: &DoorApi, proposal_id: &str) -> Result<Option<String>, TransformError> {
    let proposal = fetch_proposal(api, proposal_id).await?;

    let mut contacts = Vec::new();
    for (role, user_id) in proposal_people(&proposal, true, true) {
        contacts.push(ispyb_user(api, &user_id, role, &proposal).await?);
    }

    if contacts.is_empty() {
        return Ok(None);
    }
    Ok(Some(render_json(&contacts)?))
}

pub async fn sessions_to_java(
    api: &DoorApi,
    proposal_id: &str,
    filter: Option<&SessionFilter>,
) -> Result<Vec<JavaSession>, TransformError> {
    let proposal = fetch_proposal(api, proposal_id).await?;
    let door_sessions = fetch_sessions(api, proposal_id, filter).await.unwrap_or_default();

    let mut sessions = Vec::with_capacity(door_sessions.len());
    for session in &door_sessions {
        let first_local_contact = match &session.beamline_operator {
            Some(operator_id) => {
                let operator = fetch_user(api, operator_id).await?;
                Some(JavaLocalContact {
                    site_id: operator_id.clone(),
                    scientist_first_name: operator.given_name,
                    scientist_name: operator.family_name,
                    scientist_email: operator.email_address,
                    bllogin: operator.login,
                })
            }
            None => None,
        };

        sessions.push(JavaSession {
            proposal_pk: session
                .proposal_id
                .clone()
                .unwrap_or_else(|| proposal.id.clone()),
            session_id: session.id.clone(),
            beamline_name: session.beamline_name.clone(),
            display_name: session_display_name(&proposal, session),
            start_date: JavaDate::from(&session.start_date),
            end_date: JavaDate::from(&session.end_date),
            nb_shifts: session.nb_shifts.clone(),
            scheduled: session.scheduled.clone(),
            first_local_contact,
        });
    }
    Ok(sessions)
}

/// Sessions rendered for the Java API, `None` when there are none.
pub async fn sessions(
    api: &DoorApi,
    proposal_id: &str,
    filter: Option<&SessionFilter>,
) -> Result<Option<String>, TransformError> {
    let sessions = sessions_to_java(api, proposal_id, filter).await?;
    if sessions.is_empty() {
        return Ok(None);
    }
    Ok(Some(render_json(&sessions)?))
}
