//! Typed DOOR records.
//!
//! DOOR is loose with its types: ids arrive as numbers or strings, `0` and
//! `""` both mean "nobody", and co-writer / participant fields are either a
//! single id or a comma-joined list. All of that is normalized here so the
//! transformers only ever see `Option<String>` and [`IdList`].
//! Fields this crate does not read are kept in `extra` and re-emitted.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Timestamp format used by DOOR for session start/end.
pub const DOOR_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// ISPyB stores institute names (and lab contact card names) in 45 chars.
pub const ISPYB_NAME_MAX_CHARS: usize = 45;

/// Split a comma-joined value into trimmed tokens, keeping order.
pub fn split_multiple_by_comma(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).collect()
}

/// First `max` characters of `value`.
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) if n.as_i64() == Some(0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && s != "0").then(|| s.to_string())
        }
        _ => None,
    }
}

/// A normalized list of DOOR user ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdList(Vec<String>);

impl IdList {
    pub fn from_value(value: &Value) -> Self {
        let ids = match value {
            Value::String(s) => split_multiple_by_comma(s)
                .into_iter()
                .filter(|id| !id.is_empty())
                .collect(),
            Value::Array(items) => items.iter().filter_map(id_from_value).collect(),
            other => id_from_value(other).into_iter().collect(),
        };
        IdList(ids)
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<String>> for IdList {
    fn from(ids: Vec<String>) -> Self {
        IdList(ids)
    }
}

impl fmt::Display for IdList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

impl<'de> Deserialize<'de> for IdList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(IdList::from_value(&value))
    }
}

impl Serialize for IdList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Optional id: null, `0` and `""` are absent.
mod opt_id {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(id_from_value(&value))
    }

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        value.serialize(s)
    }
}

/// Required value that may be sent as a number or a string.
mod flex_string {
    use super::*;
    use serde::de::Error;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        match Value::deserialize(d)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(D::Error::custom(format!(
                "expected string or number, got {other}"
            ))),
        }
    }

    pub fn serialize<S: Serializer>(value: &str, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value)
    }
}

mod opt_flex_string {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        value.serialize(s)
    }
}

mod door_datetime {
    use super::*;
    use serde::de::Error;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, DOOR_DATETIME_FORMAT)
            .map_err(|e| D::Error::custom(format!("invalid DOOR timestamp '{raw}': {e}")))
    }

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.format(DOOR_DATETIME_FORMAT).to_string())
    }
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Proposal number exactly as DOOR sent it, a number or a string.
///
/// Legacy ISPyB gets the raw value back; everything else uses the text.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalNumber(Value);

impl ProposalNumber {
    pub fn raw(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for ProposalNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

impl PartialEq<&str> for ProposalNumber {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

impl<'de> Deserialize<'de> for ProposalNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        match Value::deserialize(deserializer)? {
            value @ (Value::String(_) | Value::Number(_)) => Ok(ProposalNumber(value)),
            other => Err(D::Error::custom(format!(
                "expected string or number, got {other}"
            ))),
        }
    }
}

impl Serialize for ProposalNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    #[serde(skip_deserializing)]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(rename = "proposalNumber")]
    pub number: ProposalNumber,
    #[serde(rename = "proposalCode", default, deserialize_with = "null_as_default")]
    pub code: String,
    #[serde(rename = "proposalPI", default, with = "opt_id")]
    pub pi: Option<String>,
    #[serde(rename = "proposalLeader", default, with = "opt_id")]
    pub leader: Option<String>,
    #[serde(rename = "proposalCowriters", default)]
    pub cowriters: IdList,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantCategory {
    Remote,
    OnSite,
    DataOnly,
}

impl ParticipantCategory {
    /// Order in which participants are flattened into a session.
    pub const ALL: [ParticipantCategory; 3] = [
        ParticipantCategory::Remote,
        ParticipantCategory::OnSite,
        ParticipantCategory::DataOnly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParticipantCategory::Remote => "remote",
            ParticipantCategory::OnSite => "on-site",
            ParticipantCategory::DataOnly => "data-only",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionParticipants {
    #[serde(default)]
    pub remote: IdList,
    #[serde(rename = "on-site", default)]
    pub on_site: IdList,
    #[serde(rename = "data-only", default)]
    pub data_only: IdList,
}

impl SessionParticipants {
    pub fn ids(&self, category: ParticipantCategory) -> &IdList {
        match category {
            ParticipantCategory::Remote => &self.remote,
            ParticipantCategory::OnSite => &self.on_site,
            ParticipantCategory::DataOnly => &self.data_only,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "expSessionPk", with = "flex_string")]
    pub id: String,
    #[serde(rename = "proposalId", default, with = "opt_id")]
    pub proposal_id: Option<String>,
    #[serde(rename = "beamlineName", default, deserialize_with = "null_as_default")]
    pub beamline_name: String,
    #[serde(rename = "startDate", with = "door_datetime")]
    pub start_date: NaiveDateTime,
    #[serde(rename = "endDate", with = "door_datetime")]
    pub end_date: NaiveDateTime,
    #[serde(rename = "nbShifts", default)]
    pub nb_shifts: Value,
    #[serde(default)]
    pub scheduled: Value,
    #[serde(rename = "beamlineOperator", default, with = "opt_id")]
    pub beamline_operator: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub participants: SessionParticipants,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(skip_deserializing)]
    pub id: String,
    #[serde(rename = "givenName", default, deserialize_with = "null_as_default")]
    pub given_name: String,
    #[serde(rename = "familyName", default, deserialize_with = "null_as_default")]
    pub family_name: String,
    #[serde(rename = "emailAddress", default)]
    pub email_address: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub login: String,
    #[serde(rename = "phoneNumber", default, with = "opt_flex_string")]
    pub phone_number: Option<String>,
    #[serde(rename = "laboratoryId", default, with = "opt_id")]
    pub laboratory_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institute {
    #[serde(skip)]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Institute {
    pub fn truncate_name(&mut self) {
        self.name = truncate_chars(&self.name, ISPYB_NAME_MAX_CHARS);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
