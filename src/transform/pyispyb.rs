//! Proposal documents for the py-ISPyB `userportalsync` endpoint.
//!
//! py-ISPyB rejects a proposal without persons, so an empty person list
//! is filled with a fallback DOOR user instead of failing.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::DEFAULT_FALLBACK_PERSON_ID;
use crate::door::filter::SessionFilter;
use crate::door::models::{
    truncate_chars, Institute, ParticipantCategory, SessionParticipants, ISPYB_NAME_MAX_CHARS,
};
use crate::door::DoorApi;
use crate::error::TransformError;
use crate::transform::{
    fetch_laboratory, fetch_proposal, fetch_sessions, fetch_user, iso_datetime, proposal_people,
    render_json,
};

#[derive(Debug, Clone)]
pub struct PyIspybOptions {
    pub with_leader: bool,
    pub with_cowriters: bool,
    pub with_sessions: bool,
    pub with_session_participants: bool,
    /// Beamline and date window, needed for commissioning proposals.
    pub filter: Option<SessionFilter>,
    pub fallback_person_id: String,
}

impl Default for PyIspybOptions {
    fn default() -> Self {
        Self {
            with_leader: true,
            with_cowriters: true,
            with_sessions: true,
            with_session_participants: true,
            filter: None,
            fallback_person_id: DEFAULT_FALLBACK_PERSON_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionOptions {
    /// ISPyB stores this as a tinyint.
    pub remote: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct Person {
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_options: Option<SessionOptions>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabContact {
    #[serde(rename = "cardName")]
    pub card_name: String,
    pub person: Person,
}

#[derive(Debug, Clone, Serialize)]
pub struct PyIspybProposal {
    pub title: String,
    #[serde(rename = "proposalNumber")]
    pub proposal_number: String,
    #[serde(rename = "proposalCode")]
    pub proposal_code: String,
    #[serde(rename = "proposalType")]
    pub proposal_type: &'static str,
    #[serde(rename = "bltimeStamp")]
    pub bl_time_stamp: Option<String>,
    pub state: &'static str,
    pub persons: Vec<Person>,
    pub labcontacts: Vec<LabContact>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PyIspybSession {
    #[serde(rename = "expSessionPk")]
    pub exp_session_pk: i64,
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    #[serde(rename = "beamLineName")]
    pub beamline_name: String,
    pub scheduled: Value,
    #[serde(rename = "nbShifts")]
    pub nb_shifts: Value,
    /// Operator display name, "Given Family".
    #[serde(rename = "beamlineOperator", skip_serializing_if = "Option::is_none")]
    pub beamline_operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persons: Option<Vec<Person>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PyIspybDocument {
    pub proposal: PyIspybProposal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<PyIspybSession>>,
}

pub async fn user_to_pyispyb(
    api: &DoorApi,
    user_id: &str,
    with_laboratory: bool,
) -> Result<Person, TransformError> {
    let user = fetch_user(api, user_id).await?;
    let laboratory = fetch_laboratory(api, &user, with_laboratory).await;

    Ok(Person {
        given_name: user.given_name,
        family_name: user.family_name,
        email_address: user.email_address,
        login: user.login,
        laboratory,
        phone_number: user.phone_number,
        session_options: None,
    })
}

pub async fn proposal_to_pyispyb(
    api: &DoorApi,
    proposal_id: &str,
    options: &PyIspybOptions,
) -> Result<PyIspybProposal, TransformError> {
    let proposal = fetch_proposal(api, proposal_id).await?;

    let mut persons = Vec::new();
    for (_, user_id) in proposal_people(&proposal, options.with_leader, options.with_cowriters) {
        persons.push(user_to_pyispyb(api, &user_id, true).await?);
    }

    if persons.is_empty() {
        info!(
            proposal_id,
            fallback = %options.fallback_person_id,
            "Proposal has no persons, using fallback person"
        );
        persons.push(user_to_pyispyb(api, &options.fallback_person_id, true).await?);
    }

    let labcontacts = labcontacts_for(&persons);

    Ok(PyIspybProposal {
        title: proposal.title,
        proposal_number: proposal.number.to_string(),
        proposal_code: proposal.code,
        proposal_type: "MX",
        bl_time_stamp: None,
        state: "Open",
        persons,
        labcontacts,
    })
}

/// One lab contact per proposal person, card name `login-institute`.
pub fn labcontacts_for(persons: &[Person]) -> Vec<LabContact> {
    persons
        .iter()
        .map(|person| {
            let lab_name = person
                .laboratory
                .as_ref()
                .and_then(Option::as_ref)
                .map(|lab| lab.name.as_str())
                .unwrap_or_default();
            let card_name = format!("{}-{}", person.login, lab_name);
            LabContact {
                card_name: truncate_chars(&card_name, ISPYB_NAME_MAX_CHARS),
                person: person.clone(),
            }
        })
        .collect()
}

pub async fn sessions_to_pyispyb(
    api: &DoorApi,
    proposal_id: &str,
    with_persons: bool,
    filter: Option<&SessionFilter>,
) -> Result<Vec<PyIspybSession>, TransformError> {
    let Some(door_sessions) = fetch_sessions(api, proposal_id, filter).await else {
        warn!(proposal_id, "No sessions retrieved for proposal");
        return Ok(Vec::new());
    };

    let mut sessions = Vec::with_capacity(door_sessions.len());
    for session in door_sessions {
        let exp_session_pk = session
            .id
            .trim()
            .parse::<i64>()
            .map_err(|_| TransformError::InvalidSessionId(session.id.clone()))?;

        let beamline_operator = match &session.beamline_operator {
            Some(operator_id) => Some(user_to_pyispyb(api, operator_id, false).await?.full_name()),
            None => None,
        };

        let persons = if with_persons {
            Some(session_persons(api, &session.participants).await?)
        } else {
            None
        };

        sessions.push(PyIspybSession {
            exp_session_pk,
            start_date: iso_datetime(&session.start_date),
            end_date: iso_datetime(&session.end_date),
            beamline_name: session.beamline_name,
            scheduled: session.scheduled,
            nb_shifts: session.nb_shifts,
            beamline_operator,
            persons,
        });
    }
    Ok(sessions)
}

/// Session persons in category order; remote ones are flagged.
async fn session_persons(
    api: &DoorApi,
    participants: &SessionParticipants,
) -> Result<Vec<Person>, TransformError> {
    let mut persons = Vec::new();
    for category in ParticipantCategory::ALL {
        for user_id in participants.ids(category).iter() {
            let mut person = user_to_pyispyb(api, user_id, true).await?;
            if category == ParticipantCategory::Remote {
                person.session_options = Some(SessionOptions { remote: 1 });
            }
            persons.push(person);
        }
    }
    Ok(persons)
}

pub async fn full_proposal_to_pyispyb(
    api: &DoorApi,
    proposal_id: &str,
    options: &PyIspybOptions,
) -> Result<PyIspybDocument, TransformError> {
    let proposal = proposal_to_pyispyb(api, proposal_id, options).await?;
    let sessions = if options.with_sessions {
        Some(
            sessions_to_pyispyb(
                api,
                proposal_id,
                options.with_session_participants,
                options.filter.as_ref(),
            )
            .await?,
        )
    } else {
        None
    };
    Ok(PyIspybDocument { proposal, sessions })
}

/// The document as posted to py-ISPyB.
pub async fn full_proposal_to_pyispyb_json(
    api: &DoorApi,
    proposal_id: &str,
    options: &PyIspybOptions,
) -> Result<String, TransformError> {
    let document = full_proposal_to_pyispyb(api, proposal_id, options).await?;
    render_json(&document)
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }
}
