//! Push side of the synchronisation: py-ISPyB login and proposal upload.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::PyIspybConfig;
use crate::error::SyncError;

pub const LOGIN_PATH: &str = "/ispyb/api/v1/auth/login";
pub const SYNC_PROPOSAL_PATH: &str = "/ispyb/api/v1/userportalsync/sync_proposal";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    plugin: &'a str,
    username: &'a str,
    password: &'a str,
}

pub struct PyIspybClient {
    http: reqwest::Client,
    config: PyIspybConfig,
}

impl PyIspybClient {
    pub fn new(config: PyIspybConfig) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &PyIspybConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_root, path)
    }

    /// Log in with the service account; py-ISPyB answers 201 with a token.
    pub async fn login(&self) -> Result<String, SyncError> {
        let body = LoginRequest {
            plugin: &self.config.auth_plugin,
            username: &self.config.service_account,
            password: &self.config.service_password,
        };

        let response = self.http.post(self.url(LOGIN_PATH)).json(&body).send().await?;
        let status = response.status();
        if status != StatusCode::CREATED {
            return Err(SyncError::LoginRejected {
                username: self.config.service_account.clone(),
                status: status.as_u16(),
            });
        }

        let payload: Value = response.json().await?;
        let token = token_of(&payload).ok_or(SyncError::MissingToken)?;
        info!(username = %self.config.service_account, "Logged in to py-ispyb");
        Ok(token)
    }

    /// Upload an already rendered py-ISPyB document, returning the reply text.
    pub async fn sync_proposal(
        &self,
        token: &str,
        proposal_id: &str,
        document: &str,
    ) -> Result<String, SyncError> {
        debug!(proposal_id, bytes = document.len(), "Pushing proposal to py-ispyb");

        let response = self
            .http
            .post(self.url(SYNC_PROPOSAL_PATH))
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(document.to_string())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status != StatusCode::OK {
            return Err(SyncError::SyncRejected {
                proposal_id: proposal_id.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

fn token_of(payload: &Value) -> Option<String> {
    payload
        .get("token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
