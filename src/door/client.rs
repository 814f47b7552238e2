//! HTTP plumbing for the DOOR REST API.
//!
//! `DoorTransport` is the only place that touches the network. `DoorClient`
//! pairs a transport with a header set and turns error statuses into
//! [`DoorError::Http`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::DoorConfig;
use crate::error::DoorError;

pub const HEADER_TOKEN: &str = "x-door-token";
pub const HEADER_SERVICE_ACCOUNT: &str = "x-door-service-account";
pub const HEADER_SERVICE_AUTH: &str = "x-door-service-auth";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct DoorRequest {
    pub method: Method,
    /// Path relative to the REST root, starting with `/`.
    pub path: String,
    pub headers: Vec<(&'static str, String)>,
    /// Form-encoded body fields; empty means no body.
    pub form: Vec<(String, String)>,
}

impl DoorRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct DoorResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl DoorResponse {
    pub fn json(&self) -> Result<Value, DoorError> {
        serde_json::from_str(&self.body).map_err(|source| DoorError::MalformedResponse {
            status: self.status,
            source,
        })
    }
}

#[async_trait]
pub trait DoorTransport: Send + Sync {
    async fn send(&self, request: DoorRequest) -> Result<DoorResponse, DoorError>;
}

/// Production transport backed by `reqwest`.
pub struct HttpTransport {
    http: reqwest::Client,
    root: String,
}

impl HttpTransport {
    pub fn new(root: impl Into<String>, accept_invalid_certs: bool) -> Result<Self, DoorError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(Self {
            http,
            root: root.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &DoorConfig) -> Result<Self, DoorError> {
        Self::new(&config.rest_root, config.accept_invalid_certs)
    }
}

#[async_trait]
impl DoorTransport for HttpTransport {
    async fn send(&self, request: DoorRequest) -> Result<DoorResponse, DoorError> {
        let url = format!("{}{}", self.root, request.path);
        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await?;
        debug!(%url, status, "DOOR response");

        Ok(DoorResponse { status, url, body })
    }
}

/// Which identity a client presents to DOOR.
#[derive(Debug, Clone)]
pub enum DoorHeaders {
    /// Static API token only, used for login and per-user lookups.
    Token { token: String },
    /// API token plus the service account used for data access.
    ServiceAccount {
        token: String,
        account: String,
        password: String,
    },
}

impl DoorHeaders {
    pub fn service_account(config: &DoorConfig) -> Self {
        DoorHeaders::ServiceAccount {
            token: config.rest_token.clone(),
            account: config.service_account.clone(),
            password: config.service_password.clone(),
        }
    }

    pub fn token(config: &DoorConfig) -> Self {
        DoorHeaders::Token {
            token: config.rest_token.clone(),
        }
    }

    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            DoorHeaders::Token { token } => vec![(HEADER_TOKEN, token.clone())],
            DoorHeaders::ServiceAccount {
                token,
                account,
                password,
            } => vec![
                (HEADER_TOKEN, token.clone()),
                (HEADER_SERVICE_ACCOUNT, account.clone()),
                (HEADER_SERVICE_AUTH, password.clone()),
            ],
        }
    }
}

/// Decoded 2xx reply.
#[derive(Debug, Clone)]
pub struct DoorReply {
    pub status: u16,
    pub body: Value,
}

#[derive(Clone)]
pub struct DoorClient {
    transport: Arc<dyn DoorTransport>,
    headers: DoorHeaders,
}

impl DoorClient {
    pub fn new(transport: Arc<dyn DoorTransport>, headers: DoorHeaders) -> Self {
        Self { transport, headers }
    }

    /// Same transport, different identity.
    pub fn with_headers(&self, headers: DoorHeaders) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            headers,
        }
    }

    pub fn headers(&self) -> &DoorHeaders {
        &self.headers
    }

    pub async fn get(&self, path: &str) -> Result<DoorReply, DoorError> {
        self.request(Method::Get, path).await
    }

    pub async fn post(&self, path: &str) -> Result<DoorReply, DoorError> {
        self.request(Method::Post, path).await
    }

    /// POST a form and hand back the raw response whatever its status.
    pub async fn post_form(
        &self,
        path: &str,
        form: Vec<(String, String)>,
    ) -> Result<DoorResponse, DoorError> {
        self.transport
            .send(DoorRequest {
                method: Method::Post,
                path: path.to_string(),
                headers: self.headers.pairs(),
                form,
            })
            .await
    }

    async fn request(&self, method: Method, path: &str) -> Result<DoorReply, DoorError> {
        let response = self
            .transport
            .send(DoorRequest {
                method,
                path: path.to_string(),
                headers: self.headers.pairs(),
                form: Vec::new(),
            })
            .await?;

        if response.status >= 400 {
            return Err(DoorError::Http {
                status: response.status,
                url: response.url,
                body: response.body,
            });
        }

        let body = response.json()?;
        Ok(DoorReply {
            status: response.status,
            body,
        })
    }
}
