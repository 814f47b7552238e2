//! DOOR user authentication.
//!
//! Login and per-user lookups only present the static API token, never
//! the service account. The lookups reuse [`DoorApi`] with token headers.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::DoorConfig;
use crate::door::api::DoorApi;
use crate::door::client::{DoorClient, DoorHeaders, HttpTransport};
use crate::door::models::{Institute, Role};
use crate::error::DoorError;

const LOGIN_PATH: &str = "/doorauth/auth";

/// Why a login did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginFailure {
    /// 401: wrong password, wrong token, or caller not allowed.
    Unauthorized { message: Option<String> },
    /// 404: the username does not exist.
    UnknownUser,
    /// 400: DOOR did not accept the call itself.
    BadRequest,
    /// 200 but the body was not the expected JSON.
    MalformedResponse,
    UnexpectedStatus(u16),
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated { user_id: String },
    Rejected(LoginFailure),
}

impl LoginOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated { .. })
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            LoginOutcome::Authenticated { user_id } => Some(user_id),
            LoginOutcome::Rejected(_) => None,
        }
    }

    /// The `(success, identifier)` pair.
    pub fn as_pair(&self) -> (bool, Option<&str>) {
        (self.is_authenticated(), self.user_id())
    }
}

#[derive(Clone)]
pub struct DoorAuthClient {
    api: DoorApi,
}

impl DoorAuthClient {
    /// Any client is re-headered to token-only.
    pub fn new(client: &DoorClient, token: impl Into<String>) -> Self {
        let headers = DoorHeaders::Token {
            token: token.into(),
        };
        Self {
            api: DoorApi::new(client.with_headers(headers)),
        }
    }

    pub fn from_config(config: &DoorConfig) -> Result<Self, DoorError> {
        let transport = Arc::new(HttpTransport::from_config(config)?);
        let client = DoorClient::new(transport, DoorHeaders::token(config));
        Ok(Self {
            api: DoorApi::new(client),
        })
    }

    /// Check a username/password pair against DOOR.
    ///
    /// The password is base64-encoded because that is the wire format
    /// DOOR expects, not for secrecy.
    pub async fn login(&self, username: &str, password: &str) -> LoginOutcome {
        let form = vec![
            ("user".to_string(), username.to_string()),
            ("pass".to_string(), STANDARD.encode(password.as_bytes())),
        ];

        let response = match self.api.client().post_form(LOGIN_PATH, form).await {
            Ok(response) => response,
            Err(e) => {
                warn!(username, error = %e, "DOOR login request failed");
                return LoginOutcome::Rejected(LoginFailure::Transport(e.to_string()));
            }
        };

        match response.status {
            200 => match response.json().ok().as_ref().and_then(user_id_of) {
                Some(user_id) => {
                    info!(username, %user_id, "Username has been successfully authenticated");
                    LoginOutcome::Authenticated { user_id }
                }
                None => {
                    warn!(username, body = %response.body, "Error decoding JSON login response");
                    LoginOutcome::Rejected(LoginFailure::MalformedResponse)
                }
            },
            401 => {
                let message = response
                    .json()
                    .ok()
                    .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string));
                match &message {
                    Some(message) => warn!(username, "{message}"),
                    None => warn!(username, status = 401, body = %response.body, "Error decoding JSON response"),
                }
                LoginOutcome::Rejected(LoginFailure::Unauthorized { message })
            }
            404 => {
                warn!(username, "Username does not exist");
                LoginOutcome::Rejected(LoginFailure::UnknownUser)
            }
            400 => {
                error!(url = %response.url, body = %response.body, "DOOR rejected the login call");
                LoginOutcome::Rejected(LoginFailure::BadRequest)
            }
            status => {
                warn!(username, status, "Unexpected DOOR login status");
                LoginOutcome::Rejected(LoginFailure::UnexpectedStatus(status))
            }
        }
    }

    pub async fn get_user_roles(&self, user_id: &str) -> Option<Vec<Role>> {
        self.api.get_user_roles(user_id).await
    }

    pub async fn get_institute(&self, institute_id: &str) -> Option<Institute> {
        self.api.get_institute(institute_id).await
    }

    pub async fn get_institute_list(&self) -> Option<Vec<Institute>> {
        self.api.get_institute_list().await
    }
}

fn user_id_of(body: &Value) -> Option<String> {
    match body.get("userdata")?.get("userid")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
