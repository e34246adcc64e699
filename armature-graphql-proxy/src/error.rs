//! GraphQL proxy error types.

use thiserror::Error;

use crate::OperationKind;

/// Result type for proxy operations.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// A failed outbound call to the GraphQL server.
///
/// Either the request never produced a response (`status` is `None`) or the
/// server answered with a non-2xx status. The raw body is kept verbatim so
/// error hooks and callers can inspect what the upstream sent.
#[derive(Debug, Clone, Error)]
#[error("{}", self.describe())]
pub struct TransportError {
    /// HTTP status code, if a response was received.
    pub status: Option<u16>,
    /// Raw response body (empty when no response was received).
    pub body: String,
    /// Human-readable failure description.
    pub message: String,
    /// The request hit its timeout before a response arrived.
    pub timed_out: bool,
}

impl TransportError {
    /// Create an error for a non-2xx response.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: body.into(),
            message: format!("upstream responded with status {}", status),
            timed_out: false,
        }
    }

    /// Create an error for a request that produced no response.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: String::new(),
            message: message.into(),
            timed_out: false,
        }
    }

    /// Create an error for a request that timed out.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            timed_out: true,
            ..Self::network(message)
        }
    }

    /// Parse the raw body as JSON, if it is JSON.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }

    fn describe(&self) -> String {
        match self.status {
            Some(status) => format!("{} ({}): {}", self.message, status, self.body),
            None => self.message.clone(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::timeout(format!("upstream request timed out: {}", err));
        }
        Self {
            status: err.status().map(|s| s.as_u16()),
            body: String::new(),
            message: err.to_string(),
            timed_out: false,
        }
    }
}

/// GraphQL proxy errors.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Outbound request failed and no error hook absorbed it.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The operation name is not known to the document registry.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// The inbound call used a method the operation kind does not accept.
    #[error("Method {method} not allowed for {kind} operations")]
    MethodNotAllowed {
        /// Method used by the inbound call.
        method: String,
        /// Kind of the requested operation.
        kind: OperationKind,
    },

    /// The inbound route kind does not match the registered operation kind.
    #[error("Operation {name} is a {actual}, not a {expected}")]
    KindMismatch {
        /// Operation name.
        name: String,
        /// Kind requested by the inbound route.
        expected: OperationKind,
        /// Kind declared by the registry.
        actual: OperationKind,
    },

    /// Variables could not be decoded from the inbound call.
    #[error("Invalid variables: {0}")]
    InvalidVariables(String),

    /// A hook failed.
    #[error("Hook error: {0}")]
    Hook(String),

    /// A hook failed with an explicit HTTP-equivalent status.
    #[error("{message}")]
    Status {
        /// HTTP-equivalent status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProxyError {
    /// Create a generic hook error.
    pub fn hook(message: impl Into<String>) -> Self {
        Self::Hook(message.into())
    }

    /// Create an error carrying an explicit status code.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Check if this is an outbound transport error.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Get the transport error, if this is one.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }

    /// HTTP-equivalent status code for the inbound response.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Transport(err) if err.timed_out => 504,
            Self::Transport(err) => err.status.unwrap_or(502),
            Self::UnknownOperation(_) => 404,
            Self::MethodNotAllowed { .. } => 405,
            Self::KindMismatch { .. } | Self::InvalidVariables(_) => 400,
            Self::Status { status, .. } => *status,
            Self::Hook(_) | Self::Json(_) | Self::Config(_) => 500,
        }
    }
}
