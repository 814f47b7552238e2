use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::door::client::{DoorRequest, DoorResponse, DoorTransport};
use crate::error::DoorError;

/// In-memory DOOR: canned responses by path, every request recorded.
pub struct MockTransport {
    routes: Mutex<HashMap<String, (u16, String)>>,
    requests: Mutex<Vec<DoorRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(&self, path: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.to_string()));
    }

    pub fn respond_json(&self, path: &str, status: u16, body: Value) {
        self.respond(path, status, &body.to_string());
    }

    pub fn requests(&self) -> Vec<DoorRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

#[async_trait]
impl DoorTransport for MockTransport {
    async fn send(&self, request: DoorRequest) -> Result<DoorResponse, DoorError> {
        let path = request.path.clone();
        self.requests.lock().unwrap().push(request);

        let (status, body) = self
            .routes
            .lock()
            .unwrap()
            .get(&path)
            .cloned()
            .unwrap_or_else(|| (404, r#"{"message": "Not found"}"#.to_string()));

        Ok(DoorResponse {
            status,
            url: format!("http://door.test{path}"),
            body,
        })
    }
}

/// A small DOOR world shared by the transformer tests.
///
/// Proposal 20210009: PI 1, leader 2, co-writers "3, 4".
/// Session 11000938 on P11: operator 5, remote "6", on-site "7, 1".
pub mod fixtures {
    use super::MockTransport;
    use crate::door::client::DoorHeaders;
    use serde_json::{json, Value};

    pub const PROPOSAL_ID: &str = "20210009";
    pub const SESSION_ID: &str = "11000938";
    pub const FALLBACK_PERSON_ID: &str = "5714";
    pub const LONG_INSTITUTE: &str = "European Molecular Biology Laboratory Hamburg Outstation";

    pub fn service_headers() -> DoorHeaders {
        DoorHeaders::ServiceAccount {
            token: "door-token".to_string(),
            account: "ispyb".to_string(),
            password: "secret".to_string(),
        }
    }

    pub fn proposal_json(pi: Option<&str>) -> Value {
        json!({
            "title": "Lysozyme soaking series",
            "proposalNumber": 20210009,
            "proposalCode": "I",
            "proposalPI": pi,
            "proposalLeader": 2,
            "proposalCowriters": "3, 4",
        })
    }

    pub fn session_json(id: &str, beamline: &str, start: &str, end: &str) -> Value {
        json!({
            "expSessionPk": id,
            "proposalId": PROPOSAL_ID,
            "beamlineName": beamline,
            "startDate": start,
            "endDate": end,
            "nbShifts": 3,
            "scheduled": 1,
            "beamlineOperator": 5,
            "participants": {"remote": 6, "on-site": "7, 1", "data-only": ""},
        })
    }

    pub fn install_user(
        mock: &MockTransport,
        id: &str,
        given: &str,
        family: &str,
        login: &str,
        laboratory: &str,
    ) {
        mock.respond_json(
            &format!("/users/id/{id}"),
            200,
            json!({"user metadata": {id: {
                "givenName": given,
                "familyName": family,
                "emailAddress": format!("{login}@example.org"),
                "login": login,
                "phoneNumber": 4940899,
                "laboratoryId": laboratory,
            }}}),
        );
    }

    pub fn install_institute(mock: &MockTransport, id: &str, name: &str) {
        mock.respond_json(
            &format!("/institutes/id/{id}"),
            200,
            json!({"institute metadata": {id: {
                "name": name,
                "address": "Notkestrasse 85",
                "city": "Hamburg",
                "country": "DE",
                "laboratoryExtPk": id,
            }}}),
        );
    }

    pub fn install_people(mock: &MockTransport) {
        install_user(mock, "1", "Ada", "Lovelace", "ada", "10");
        install_user(mock, "2", "Grace", "Hopper", "grace", "10");
        install_user(mock, "3", "Alan", "Turing", "alan", "11");
        install_user(mock, "4", "Rosalind", "Franklin", "rosalind", "11");
        install_user(mock, "5", "Max", "Perutz", "perutz", "10");
        install_user(mock, "6", "Dorothy", "Hodgkin", "dorothy", "11");
        install_user(mock, "7", "Linus", "Pauling", "linus", "10");
        install_user(mock, FALLBACK_PERSON_ID, "Door", "Admin", "dooradmin", "10");
        install_institute(mock, "10", "Deutsches Elektronen-Synchrotron DESY");
        install_institute(mock, "11", LONG_INSTITUTE);
    }

    pub fn install_proposal(mock: &MockTransport) {
        install_proposal_with_pi(mock, Some("1"));
    }

    pub fn install_proposal_with_pi(mock: &MockTransport, pi: Option<&str>) {
        mock.respond_json(
            &format!("/proposals/propid/{PROPOSAL_ID}"),
            200,
            json!({"proposals": {PROPOSAL_ID: proposal_json(pi)}}),
        );
    }

    pub fn install_sessions(mock: &MockTransport) {
        mock.respond_json(
            &format!("/experiments/propid/{PROPOSAL_ID}"),
            200,
            json!({"experiment metadata": {
                SESSION_ID: session_json(SESSION_ID, "P11", "2021-05-03 08:00:00", "2021-05-04 08:00:00"),
                "11000940": session_json("11000940", "P14", "2021-06-10 08:00:00", "2021-06-11 08:00:00"),
            }}),
        );
    }

    /// Proposal, sessions, people and institutes.
    pub fn install_world(mock: &MockTransport) {
        install_proposal(mock);
        install_sessions(mock);
        install_people(mock);
    }
}
