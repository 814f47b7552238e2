//! Typed accessors over the DOOR REST API.
//!
//! Every accessor follows the same contract: a failed request, an
//! unexpected status, or a body without the expected top-level key is
//! logged and reported as `None`. Callers cannot tell these apart.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DoorConfig;
use crate::door::client::{DoorClient, DoorHeaders, HttpTransport};
use crate::door::filter::SessionFilter;
use crate::door::models::{Institute, Proposal, Role, Session, User};
use crate::error::DoorError;

const KEY_PROPOSALS: &str = "proposals";
const KEY_SESSIONS: &str = "experiment metadata";
const KEY_USERS: &str = "user metadata";
const KEY_ROLES: &str = "roles";
const KEY_INSTITUTES: &str = "institute metadata";

/// Date format DOOR expects in `/date/{start}/{end}` paths.
const PATH_DATE_FORMAT: &str = "%Y%m%d";

#[derive(Clone)]
pub struct DoorApi {
    client: DoorClient,
}

impl DoorApi {
    pub fn new(client: DoorClient) -> Self {
        Self { client }
    }

    /// Data-access API using the service account headers.
    pub fn from_config(config: &DoorConfig) -> Result<Self, DoorError> {
        let transport = Arc::new(HttpTransport::from_config(config)?);
        Ok(Self::new(DoorClient::new(
            transport,
            DoorHeaders::service_account(config),
        )))
    }

    pub fn client(&self) -> &DoorClient {
        &self.client
    }

    pub async fn get_beamline_proposals(&self, beamline: &str) -> Option<Vec<Proposal>> {
        let path = format!("/proposals/beamline/{beamline}");
        self.fetch_collection(&path, KEY_PROPOSALS).await
    }

    pub async fn get_beamline_proposals_by_year(
        &self,
        beamline: &str,
        year: i32,
    ) -> Option<Vec<Proposal>> {
        let path = format!("/proposals/beamline/{beamline}/year/{year}");
        self.fetch_collection(&path, KEY_PROPOSALS).await
    }

    pub async fn get_beamline_proposals_by_date_range(
        &self,
        beamline: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<Vec<Proposal>> {
        let path = format!(
            "/proposals/beamline/{beamline}/date/{}/{}",
            start.format(PATH_DATE_FORMAT),
            end.format(PATH_DATE_FORMAT)
        );
        self.fetch_collection(&path, KEY_PROPOSALS).await
    }

    pub async fn get_proposal(&self, proposal_id: &str) -> Option<Proposal> {
        let path = format!("/proposals/propid/{proposal_id}");
        let mut proposal: Proposal = self.fetch_record(&path, KEY_PROPOSALS, proposal_id).await?;
        proposal.id = proposal_id.to_string();
        Some(proposal)
    }

    /// All sessions of a proposal, across every beamline.
    pub async fn get_proposal_sessions(&self, proposal_id: &str) -> Option<Vec<Session>> {
        let path = format!("/experiments/propid/{proposal_id}");
        self.fetch_collection(&path, KEY_SESSIONS).await
    }

    /// Sessions of a proposal restricted to one beamline and date window.
    pub async fn get_proposal_sessions_filtered(
        &self,
        proposal_id: &str,
        filter: &SessionFilter,
    ) -> Option<Vec<Session>> {
        let sessions = self.get_proposal_sessions(proposal_id).await?;
        let total = sessions.len();
        let kept: Vec<Session> = sessions.into_iter().filter(|s| filter.matches(s)).collect();
        debug!(
            proposal_id,
            beamline = %filter.beamline,
            total,
            kept = kept.len(),
            "filtered proposal sessions"
        );
        Some(kept)
    }

    pub async fn get_beamline_sessions(&self, beamline: &str) -> Option<Vec<Session>> {
        let path = format!("/experiments/beamline/{beamline}");
        self.fetch_collection(&path, KEY_SESSIONS).await
    }

    pub async fn get_beamline_sessions_by_year(
        &self,
        beamline: &str,
        year: i32,
    ) -> Option<Vec<Session>> {
        let path = format!("/experiments/beamline/{beamline}/year/{year}");
        self.fetch_collection(&path, KEY_SESSIONS).await
    }

    pub async fn get_beamline_sessions_by_date_range(
        &self,
        beamline: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<Vec<Session>> {
        let path = format!(
            "/experiments/beamline/{beamline}/date/{}/{}",
            start.format(PATH_DATE_FORMAT),
            end.format(PATH_DATE_FORMAT)
        );
        self.fetch_collection(&path, KEY_SESSIONS).await
    }

    pub async fn get_session(&self, session_id: &str) -> Option<Session> {
        let path = format!("/experiments/expid/{session_id}");
        self.fetch_record(&path, KEY_SESSIONS, session_id).await
    }

    pub async fn get_user(&self, user_id: &str) -> Option<User> {
        let path = format!("/users/id/{user_id}");
        let mut user: User = self.fetch_record(&path, KEY_USERS, user_id).await?;
        user.id = user_id.to_string();
        Some(user)
    }

    /// Roles of a user. `None` covers both "no roles assigned" and
    /// "roles could not be checked"; neither is an error.
    pub async fn get_user_roles(&self, user_id: &str) -> Option<Vec<Role>> {
        let path = format!("/roles/userid/{user_id}");
        let reply = match self.client.get(&path).await {
            Ok(reply) if reply.status == 200 => reply,
            Ok(reply) => {
                warn!(user_id, status = reply.status, "Roles could not be checked for userid");
                return None;
            }
            Err(e) => {
                warn!(user_id, error = %e, "Roles could not be checked for userid");
                return None;
            }
        };

        let mut body = reply.body;
        match body.get_mut(KEY_ROLES).map(Value::take) {
            Some(roles) => decode(roles, &path),
            None => {
                warn!(user_id, "No roles assigned to userid");
                None
            }
        }
    }

    /// Institute with its name cut to what ISPyB can store.
    pub async fn get_institute(&self, institute_id: &str) -> Option<Institute> {
        let path = format!("/institutes/id/{institute_id}");
        let mut institute: Institute =
            self.fetch_record(&path, KEY_INSTITUTES, institute_id).await?;
        institute.id = institute_id.to_string();
        institute.truncate_name();
        Some(institute)
    }

    pub async fn get_institute_list(&self) -> Option<Vec<Institute>> {
        self.fetch_collection("/institutes/list/", KEY_INSTITUTES).await
    }

    /// GET `path` and take `key` out of the body.
    async fn fetch_key(&self, path: &str, key: &str) -> Option<Value> {
        let reply = match self.client.get(path).await {
            Ok(reply) => reply,
            Err(e) => {
                let message = e.server_message().unwrap_or_else(|| "-".to_string());
                warn!(path, status = ?e.status(), %message, "DOOR request failed: {e}");
                return None;
            }
        };

        if reply.status != 200 {
            warn!(path, status = reply.status, "Unexpected DOOR response status");
            return None;
        }

        let mut body = reply.body;
        match body.get_mut(key).map(Value::take) {
            Some(value) => Some(value),
            None => {
                warn!(path, key, message = %server_message(&body), "DOOR response without expected key");
                None
            }
        }
    }

    /// Single record stored under `body[key][id]`.
    async fn fetch_record<T: DeserializeOwned>(&self, path: &str, key: &str, id: &str) -> Option<T> {
        let mut records = self.fetch_key(path, key).await?;
        match records.get_mut(id).map(Value::take) {
            Some(record) => decode(record, path),
            None => {
                warn!(path, key, id, "DOOR response does not contain the requested record");
                None
            }
        }
    }

    /// Map of records under `body[key]`, keyed by id.
    async fn fetch_collection<T: DeserializeOwned + Keyed>(&self, path: &str, key: &str) -> Option<Vec<T>> {
        let records = self.fetch_key(path, key).await?;
        decode_entries(records, path)
    }
}

/// Records whose id lives in the map key rather than the body.
pub(crate) trait Keyed {
    fn set_key(&mut self, key: String);
}

impl Keyed for Proposal {
    fn set_key(&mut self, key: String) {
        self.id = key;
    }
}

impl Keyed for Institute {
    fn set_key(&mut self, key: String) {
        self.id = key;
    }
}

impl Keyed for Session {
    fn set_key(&mut self, _key: String) {}
}

fn server_message(body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message")
        .to_string()
}

fn decode<T: DeserializeOwned>(value: Value, path: &str) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(path, error = %e, "Malformed DOOR record");
            None
        }
    }
}

fn decode_entries<T: DeserializeOwned + Keyed>(value: Value, path: &str) -> Option<Vec<T>> {
    let entries: Vec<(String, Value)> = match value {
        Value::Object(map) => map.into_iter().collect(),
        // An empty result set comes back as `[]`
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| (idx.to_string(), item))
            .collect(),
        other => {
            warn!(path, value = %other, "Unexpected DOOR collection shape");
            return None;
        }
    };

    let records = entries
        .into_iter()
        .filter_map(|(key, entry)| match serde_json::from_value::<T>(entry) {
            Ok(mut record) => {
                record.set_key(key);
                Some(record)
            }
            Err(e) => {
                warn!(path, key = %key, error = %e, "Skipping malformed DOOR record");
                None
            }
        })
        .collect();
    Some(records)
}
