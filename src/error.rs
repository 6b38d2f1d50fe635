//! Error types
//!
//! Every fallible operation in the library returns [`Result`]. Server-side
//! failures and local precondition failures share the [`ApiError`] record so
//! callers can match on a single status-carrying type.

use std::fmt;

/// Error record for a failed API call.
///
/// `error_code` is the HTTP status of the response, the synthetic 400 used
/// for local precondition failures, or 0 when no response was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub error_code: u16,
    pub error_message: String,
}

impl ApiError {
    pub fn new(error_code: u16, error_message: impl Into<String>) -> Self {
        Self {
            error_code,
            error_message: error_message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (HTTP {})", self.error_message, self.error_code)
    }
}

impl std::error::Error for ApiError {}

/// Library error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unexpected response status, transport failure, or missing required field.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Invalid or contradictory client parameters. Raised before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A caller-supplied argument has the wrong shape.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// The identity service rejected the credentials.
    #[error("authentication failed: {message}")]
    Auth {
        status: Option<u16>,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shortcut for a local 400 precondition failure.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::Api(ApiError::new(400, message))
    }

    /// The API error record, if this is an API error.
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
