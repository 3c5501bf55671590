//! Error types for devbud-tui
//!
//! Domain-specific error enums using thiserror. Transport and parse failures
//! are absorbed at the connection boundary; only API and validation errors
//! reach the user.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("JSON parse: {0}")]
    Json(String),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        ParseError::Json(e.to_string())
    }
}

/// Error surfaced from a failed REST call.
/// Mirrors the service's `{detail, status_code}` error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{detail}{}", .status_code.map(|c| format!(" (HTTP {c})")).unwrap_or_default())]
pub struct ApiError {
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ApiError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            status_code: None,
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError {
            detail: e.to_string(),
            status_code: e.status().map(|s| s.as_u16()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,
    #[error("connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("socket: {0}")]
    Socket(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::Socket(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    EmptyId(&'static str),
    #[error("branch name must be 1 to {max} characters")]
    BranchLength { max: usize },
    #[error("branch name cannot contain '{0}'")]
    BranchChar(char),
    #[error("instructions cannot be empty")]
    EmptyInstructions,
    #[error("{action} is not available while the task is {status}")]
    ActionNotOffered {
        action: &'static str,
        status: &'static str,
    },
}
