//! Proposal documents for the legacy ISPyB importer.
//!
//! Participants are tagged with their proposal role and a proposal with
//! no PI cannot be imported at all.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::door::models::{Institute, ParticipantCategory, SessionParticipants};
use crate::door::DoorApi;
use crate::error::TransformError;
use crate::transform::{
    fetch_laboratory, fetch_proposal, fetch_sessions, fetch_user, iso_datetime, proposal_people,
    render_json,
};

#[derive(Debug, Clone, Copy)]
pub struct IspybOptions {
    pub with_leader: bool,
    pub with_cowriters: bool,
    pub with_sessions: bool,
    pub with_session_participants: bool,
}

impl Default for IspybOptions {
    fn default() -> Self {
        Self {
            with_leader: true,
            with_cowriters: true,
            with_sessions: true,
            with_session_participants: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IspybUser {
    #[serde(rename = "givenName")]
    pub given_name: String,
    #[serde(rename = "familyName")]
    pub family_name: String,
    #[serde(rename = "emailAddress")]
    pub email_address: Option<String>,
    pub login: String,
    /// Omitted when not requested, `null` when it could not be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub laboratory: Option<Option<Institute>>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
    #[serde(rename = "siteId")]
    pub site_id: String,
    #[serde(rename = "personUUID")]
    pub person_uuid: Option<String>,
    #[serde(rename = "recordTimeStamp")]
    pub record_time_stamp: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IspybProposal {
    pub title: String,
    /// Passed through as DOOR sent it.
    #[serde(rename = "proposalNumber")]
    pub proposal_number: Value,
    #[serde(rename = "proposalCode")]
    pub proposal_code: String,
    #[serde(rename = "proposalType")]
    pub proposal_type: &'static str,
    #[serde(rename = "bltimeStamp")]
    pub bl_time_stamp: Option<String>,
    pub state: &'static str,
    pub participants: Vec<IspybUser>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum IspybParticipants {
    Resolved(Vec<IspybUser>),
    Ids(SessionParticipants),
}

#[derive(Debug, Clone, Serialize)]
pub struct IspybSession {
    #[serde(rename = "expSessionPk")]
    pub id: String,
    #[serde(rename = "proposalId")]
    pub proposal_id: Option<String>,
    #[serde(rename = "beamlineName")]
    pub beamline_name: String,
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    #[serde(rename = "nbShifts")]
    pub nb_shifts: Value,
    pub scheduled: Value,
    #[serde(rename = "beamlineOperator")]
    pub beamline_operator: Option<IspybUser>,
    pub participants: IspybParticipants,
    /// DOOR session fields passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IspybDocument {
    pub proposal: IspybProposal,
    /// Omitted when sessions were not requested, `null` when DOOR had none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Option<BTreeMap<String, IspybSession>>>,
}

pub async fn user_to_ispyb(
    api: &DoorApi,
    user_id: &str,
    with_laboratory: bool,
) -> Result<IspybUser, TransformError> {
    let user = fetch_user(api, user_id).await?;
    let laboratory = fetch_laboratory(api, &user, with_laboratory).await;

    Ok(IspybUser {
        given_name: user.given_name,
        family_name: user.family_name,
        email_address: user.email_address,
        login: user.login,
        laboratory,
        phone_number: user.phone_number,
        site_id: user.id,
        person_uuid: None,
        record_time_stamp: None,
        kind: None,
    })
}

/// Proposal with tagged participants, or `None` when it has no PI.
pub async fn proposal_to_ispyb(
    api: &DoorApi,
    proposal_id: &str,
    options: &IspybOptions,
) -> Result<Option<IspybProposal>, TransformError> {
    let proposal = fetch_proposal(api, proposal_id).await?;
    if proposal.pi.is_none() {
        warn!(proposal_id, "Proposal has no PI, skipping ISPyB export");
        return Ok(None);
    }

    let mut participants = Vec::new();
    for (role, user_id) in proposal_people(&proposal, options.with_leader, options.with_cowriters) {
        let mut user = user_to_ispyb(api, &user_id, true).await?;
        user.kind = Some(role.as_str());
        participants.push(user);
    }

    Ok(Some(IspybProposal {
        title: proposal.title,
        proposal_number: proposal.number.raw().clone(),
        proposal_code: proposal.code,
        proposal_type: "MX",
        bl_time_stamp: None,
        state: "Open",
        participants,
    }))
}

/// Sessions keyed by session id, or `None` when DOOR returned nothing.
pub async fn sessions_to_ispyb(
    api: &DoorApi,
    proposal_id: &str,
    with_participants: bool,
) -> Result<Option<BTreeMap<String, IspybSession>>, TransformError> {
    let sessions = match fetch_sessions(api, proposal_id, None).await {
        Some(sessions) if !sessions.is_empty() => sessions,
        _ => return Ok(None),
    };

    let mut out = BTreeMap::new();
    for session in sessions {
        let beamline_operator = match &session.beamline_operator {
            Some(operator_id) => Some(user_to_ispyb(api, operator_id, false).await?),
            None => None,
        };

        let participants = if with_participants {
            IspybParticipants::Resolved(session_participants(api, &session.participants).await?)
        } else {
            IspybParticipants::Ids(session.participants.clone())
        };

        out.insert(
            session.id.clone(),
            IspybSession {
                id: session.id,
                proposal_id: session.proposal_id,
                beamline_name: session.beamline_name,
                start_date: iso_datetime(&session.start_date),
                end_date: iso_datetime(&session.end_date),
                nb_shifts: session.nb_shifts,
                scheduled: session.scheduled,
                beamline_operator,
                participants,
                extra: session.extra,
            },
        );
    }
    Ok(Some(out))
}

/// Remote, then on-site, then data-only; each tagged with its category.
async fn session_participants(
    api: &DoorApi,
    participants: &SessionParticipants,
) -> Result<Vec<IspybUser>, TransformError> {
    let mut users = Vec::new();
    for category in ParticipantCategory::ALL {
        for user_id in participants.ids(category).iter() {
            let mut user = user_to_ispyb(api, user_id, false).await?;
            user.kind = Some(category.as_str());
            users.push(user);
        }
    }
    Ok(users)
}

pub async fn full_proposal_to_ispyb(
    api: &DoorApi,
    proposal_id: &str,
    options: &IspybOptions,
) -> Result<Option<IspybDocument>, TransformError> {
    let Some(proposal) = proposal_to_ispyb(api, proposal_id, options).await? else {
        return Ok(None);
    };

    let sessions = if options.with_sessions {
        Some(sessions_to_ispyb(api, proposal_id, options.with_session_participants).await?)
    } else {
        None
    };

    Ok(Some(IspybDocument { proposal, sessions }))
}

/// The full document rendered for the importer.
pub async fn full_proposal_to_ispyb_json(
    api: &DoorApi,
    proposal_id: &str,
    options: &IspybOptions,
) -> Result<Option<String>, TransformError> {
    match full_proposal_to_ispyb(api, proposal_id, options).await? {
        Some(document) => Ok(Some(render_json(&document)?)),
        None => Ok(None),
    }
}
