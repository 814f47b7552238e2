use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Proposal id shared by all commissioning beamtimes at DOOR.
pub const DEFAULT_COMMISSIONING_PROPOSAL_ID: &str = "20010001";

/// DOOR user substituted when a proposal has no persons (py-ISPyB rejects empty lists).
pub const DEFAULT_FALLBACK_PERSON_ID: &str = "5714";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid URL in {key}: {value}")]
    InvalidUrl { key: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoorConfig {
    pub rest_root: String,
    pub rest_token: String,
    pub service_account: String,
    pub service_password: String,
    pub accept_invalid_certs: bool,
    pub commissioning_proposal_id: String,
    pub fallback_person_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PyIspybConfig {
    pub api_root: String,
    pub auth_plugin: String,
    pub service_account: String,
    pub service_password: String,
    pub accept_invalid_certs: bool,
}

impl DoorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let rest_root = required_url(&lookup, "DOOR_REST_ROOT")?;

        Ok(Self {
            rest_root,
            rest_token: required(&lookup, "DOOR_REST_TOKEN")?,
            service_account: required(&lookup, "DOOR_SERVICE_ACCOUNT")?,
            service_password: required(&lookup, "DOOR_SERVICE_PASSWORD")?,
            accept_invalid_certs: false,
            commissioning_proposal_id: DEFAULT_COMMISSIONING_PROPOSAL_ID.to_string(),
            fallback_person_id: DEFAULT_FALLBACK_PERSON_ID.to_string(),
        }
        .with_overrides(&lookup))
    }

    fn with_overrides(mut self, lookup: &impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("DOOR_ACCEPT_INVALID_CERTS") {
            self.accept_invalid_certs = v.parse().unwrap_or(self.accept_invalid_certs);
        }
        if let Some(v) = non_empty(lookup("DOOR_COMMISSIONING_PROPOSAL_ID")) {
            self.commissioning_proposal_id = v;
        }
        if let Some(v) = non_empty(lookup("PYISPYB_DEFAULT_PERSON_ID")) {
            self.fallback_person_id = v;
        }
        self
    }
}

impl PyIspybConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let accept_invalid_certs = lookup("PYISPYB_ACCEPT_INVALID_CERTS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(false);

        Ok(Self {
            api_root: required_url(&lookup, "PYISPYB_API_ROOT")?,
            auth_plugin: required(&lookup, "PYISPYB_AUTH_PLUGIN")?,
            service_account: required(&lookup, "PYISPYB_SERVICE_ACCOUNT")?,
            service_password: required(&lookup, "PYISPYB_SERVICE_PASSWORD")?,
            accept_invalid_certs,
        })
    }
}

/// Everything `syncdoor` needs, built once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub door: DoorConfig,
    pub pyispyb: PyIspybConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            door: DoorConfig::from_env()?,
            pyispyb: PyIspybConfig::from_env()?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    non_empty(lookup(key)).ok_or(ConfigError::Missing(key))
}

fn required_url(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    let value = required(lookup, key)?;
    url::Url::parse(&value).map_err(|_| ConfigError::InvalidUrl {
        key,
        value: value.clone(),
    })?;
    Ok(value.trim_end_matches('/').to_string())
}
