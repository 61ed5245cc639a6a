//! Error taxonomy for client operations.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Failure of a client operation, classified by how the UI recovers from it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered 401; the session has already been torn down.
    #[error("401 Unauthorized: session expired or invalid")]
    Unauthorized,

    /// Input rejected locally before any request was made.
    #[error("{0}")]
    Validation(String),

    /// The server rejected the request (4xx/5xx other than 401).
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Network-level failure (DNS, connection refused, TLS, timeout).
    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The session token could not be written to or removed from disk.
    #[error("Failed to persist session: {0}")]
    Storage(String),

    /// The response body did not have the expected shape.
    #[error("Unexpected server response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Returns true for the 401 sentinel, which callers swallow because the
    /// logout flow already told the user.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }

    /// Message for a toast: server text when present, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            ClientError::Api { .. } => fallback.to_string(),
            ClientError::Validation(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Builds an API error from a status and raw body, preferring the
    /// `{"error": "..."}` field the server uses.
    pub fn from_status(status: StatusCode, body: &str, fallback: &str) -> Self {
        let message = ApiErrorBody::extract(body).unwrap_or_else(|| fallback.to_string());
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

impl From<GatewayError> for ClientError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unauthorized => ClientError::Unauthorized,
            GatewayError::Transport(source) => ClientError::Transport(source),
            GatewayError::InvalidUrl(message) => ClientError::Validation(message),
        }
    }
}

/// Error body returned by the API (`{"error": "..."}` or `{"message": "..."}`).
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Extracts the most specific message from a raw body, if any.
    pub fn extract(body: &str) -> Option<String> {
        let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
        parsed
            .error
            .or(parsed.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }
}
