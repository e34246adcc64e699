//! GraphQL client error types.

use armature_graphql_proxy::ProxyError;
use serde_json::Value;
use thiserror::Error;

/// Result type for GraphQL client operations.
pub type Result<T> = std::result::Result<T, GraphQLError>;

/// GraphQL client errors.
#[derive(Debug, Error)]
pub enum GraphQLError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The proxy rejected the call.
    #[error("Proxy error ({status}): {message}")]
    Proxy {
        /// HTTP-equivalent status code.
        status: u16,
        /// Error message reported by the proxy.
        message: String,
        /// Upstream body, when the upstream answered with JSON.
        data: Option<Value>,
    },

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl GraphQLError {
    /// Check if this is a network error.
    pub fn is_network_error(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    /// Check if the proxy answered with an error status.
    pub fn is_proxy_error(&self) -> bool {
        matches!(self, Self::Proxy { .. })
    }

    /// Get the HTTP status code, if known.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Proxy { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<ProxyError> for GraphQLError {
    fn from(err: ProxyError) -> Self {
        Self::Proxy {
            status: err.status_code(),
            data: err.transport_error().and_then(|e| e.body_json()),
            message: err.to_string(),
        }
    }
}
