//! DOOR → ISPyB document builders.
//!
//! One module per target schema. All of them are stateless functions over
//! a borrowed [`DoorApi`]; each user, institute and session list is
//! fetched with its own sequential request, in output order.

pub mod ispyb;
pub mod ispyb_java;
pub mod pyispyb;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::door::filter::SessionFilter;
use crate::door::models::{Institute, Proposal, Session, User};
use crate::door::DoorApi;
use crate::error::TransformError;

/// ISO-8601 without fractional seconds, e.g. `2021-05-03T08:00:00`.
pub fn iso_datetime(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Render with sorted keys and 4-space indentation so payloads diff cleanly.
pub fn render_json<T: Serialize>(document: &T) -> Result<String, TransformError> {
    let value = sort_keys(serde_json::to_value(document)?);
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

// Objects keep insertion order, so key order is rebuilt here at every level.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// How a person is attached to a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalRole {
    Pi,
    Leader,
    Cowriter,
}

impl ProposalRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ProposalRole::Pi => "pi",
            ProposalRole::Leader => "leader",
            ProposalRole::Cowriter => "cowriter",
        }
    }
}

/// Proposal people in output order: PI, leader, co-writers.
pub fn proposal_people(
    proposal: &Proposal,
    with_leader: bool,
    with_cowriters: bool,
) -> Vec<(ProposalRole, String)> {
    let mut people = Vec::new();
    if let Some(pi) = &proposal.pi {
        people.push((ProposalRole::Pi, pi.clone()));
    }
    if with_leader {
        if let Some(leader) = &proposal.leader {
            people.push((ProposalRole::Leader, leader.clone()));
        }
    }
    if with_cowriters {
        for id in proposal.cowriters.iter() {
            people.push((ProposalRole::Cowriter, id.clone()));
        }
    }
    people
}

pub(crate) async fn fetch_proposal(
    api: &DoorApi,
    proposal_id: &str,
) -> Result<Proposal, TransformError> {
    api.get_proposal(proposal_id)
        .await
        .ok_or_else(|| TransformError::ProposalNotFound(proposal_id.to_string()))
}

pub(crate) async fn fetch_user(api: &DoorApi, user_id: &str) -> Result<User, TransformError> {
    api.get_user(user_id)
        .await
        .ok_or_else(|| TransformError::UserNotFound(user_id.to_string()))
}

/// `None` when the laboratory was not asked for, `Some(None)` when the
/// user has none or it could not be fetched (rendered as `null`).
pub(crate) async fn fetch_laboratory(
    api: &DoorApi,
    user: &User,
    with_laboratory: bool,
) -> Option<Option<Institute>> {
    if !with_laboratory {
        return None;
    }
    Some(match &user.laboratory_id {
        Some(lab_id) => api.get_institute(lab_id).await,
        None => None,
    })
}

pub(crate) async fn fetch_sessions(
    api: &DoorApi,
    proposal_id: &str,
    filter: Option<&SessionFilter>,
) -> Option<Vec<Session>> {
    match filter {
        Some(filter) => api.get_proposal_sessions_filtered(proposal_id, filter).await,
        None => api.get_proposal_sessions(proposal_id).await,
    }
}
