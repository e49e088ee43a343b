//! Error types for the bridge.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("invalid JSON: {message}")]
    BadRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Upstream request failed: {message}")]
    Transport { message: String },

    #[error("Malformed upstream response: {message}")]
    MalformedUpstream { message: String },

    #[error("Upstream API error: {message}")]
    Provider {
        code: Option<String>,
        error_type: Option<String>,
        message: String,
    },

    #[error("Audit error: {message}")]
    Audit { message: String },

    #[error("Request task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BridgeError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
        }
    }

    pub fn malformed_upstream(msg: impl Into<String>) -> Self {
        Self::MalformedUpstream {
            message: msg.into(),
        }
    }

    pub fn audit(msg: impl Into<String>) -> Self {
        Self::Audit {
            message: msg.into(),
        }
    }

    /// Every failure other than a malformed inbound body is a 500; the
    /// internal distinctions stay in the operator log and the audit store.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
