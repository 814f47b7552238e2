// Error types shared across the DOOR client, transformers and sync layer
use thiserror::Error;

/// Failures talking to the DOOR portal.
#[derive(Debug, Error)]
pub enum DoorError {
    #[error("DOOR request {url} failed with status {status}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    #[error("DOOR returned a non-JSON body (status {status}): {source}")]
    MalformedResponse {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl DoorError {
    /// Status code of the failed response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            DoorError::Http { status, .. } => Some(*status),
            DoorError::MalformedResponse { status, .. } => Some(*status),
            DoorError::Transport(e) => e.status().map(|s| s.as_u16()),
        }
    }

    /// The `"message"` field DOOR puts in its error bodies.
    pub fn server_message(&self) -> Option<String> {
        match self {
            DoorError::Http { body, .. } => server_message(body),
            _ => None,
        }
    }
}

pub(crate) fn server_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Failures building an ISPyB document from DOOR records.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Proposal {0} could not be retrieved from DOOR")]
    ProposalNotFound(String),

    #[error("User {0} could not be retrieved from DOOR")]
    UserNotFound(String),

    #[error("Session id {0} is not numeric")]
    InvalidSessionId(String),

    #[error("Invalid date '{value}', expected {format}")]
    InvalidDate { value: String, format: &'static str },

    #[error("JSON rendering error: {0}")]
    Render(#[from] serde_json::Error),
}

/// Failures pushing a document to py-ISPyB.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Could not login to py-ispyb with {username} (status {status}). Please check the credentials or the connection to py-ispyb.")]
    LoginRejected { username: String, status: u16 },

    #[error("py-ispyb login response did not contain a token")]
    MissingToken,

    #[error("There was an error synchronizing proposal {proposal_id} with py-ispyb (status {status}): {body}")]
    SyncRejected {
        proposal_id: String,
        status: u16,
        body: String,
    },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}
