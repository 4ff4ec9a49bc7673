//! Error types for Kindred

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Kindred operations
pub type Result<T> = std::result::Result<T, KindredError>;

/// Main error type for Kindred
#[derive(Error, Debug)]
pub enum KindredError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Rate limited ({status}): {message}")]
    RateLimited { status: u16, message: String },

    #[error("Client error ({status}): {message}")]
    Client { status: u16, message: String },

    #[error("Authentication expired")]
    AuthExpired,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl KindredError {
    /// Check if error is retryable (transient failures the pipeline may replay)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            KindredError::Network(_)
                | KindredError::Server { .. }
                | KindredError::RateLimited { .. }
        )
    }

    /// HTTP status associated with this error, if a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            KindredError::Server { status, .. }
            | KindredError::RateLimited { status, .. }
            | KindredError::Client { status, .. } => Some(*status),
            KindredError::AuthExpired => Some(401),
            _ => None,
        }
    }

    /// Convert into the wire-level `{code, message, details}` triple
    pub fn to_api_error(&self) -> ApiError {
        match self {
            KindredError::Server { status, message }
            | KindredError::RateLimited { status, message }
            | KindredError::Client { status, message } => ApiError {
                code: status.to_string(),
                message: message.clone(),
                details: None,
            },
            KindredError::AuthExpired => ApiError {
                code: "401".to_string(),
                message: self.to_string(),
                details: None,
            },
            KindredError::Network(msg) => ApiError {
                code: "NETWORK_ERROR".to_string(),
                message: "Network error. Please check your connection.".to_string(),
                details: Some(serde_json::Value::String(msg.clone())),
            },
            other => ApiError {
                code: "UNKNOWN_ERROR".to_string(),
                message: other.to_string(),
                details: None,
            },
        }
    }
}

/// Normalized error surfaced to API callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status as string, `"NETWORK_ERROR"`, or `"UNKNOWN_ERROR"`
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(KindredError::Network("timeout".into()).is_retryable());
        assert!(KindredError::Server {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(KindredError::RateLimited {
            status: 429,
            message: "slow down".into()
        }
        .is_retryable());

        assert!(!KindredError::Client {
            status: 404,
            message: "not found".into()
        }
        .is_retryable());
        assert!(!KindredError::AuthExpired.is_retryable());
        assert!(!KindredError::Config("missing".into()).is_retryable());
    }

    #[test]
    fn api_error_codes() {
        let e = KindredError::Server {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(e.to_api_error().code, "500");

        let e = KindredError::Network("connection refused".into());
        assert_eq!(e.to_api_error().code, "NETWORK_ERROR");

        let e = KindredError::Llm("bad schema".into());
        assert_eq!(e.to_api_error().code, "UNKNOWN_ERROR");
    }
}
