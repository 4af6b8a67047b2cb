//! Error types for the Subspace client.
//!
//! Every failure on the request path is mapped into the closed [`NetworkError`]
//! taxonomy before it leaves the executor. Construction-time problems
//! (bad URLs, invalid retry settings) are reported separately through
//! [`ConfigurationError`] and are meant to abort startup.

use thiserror::Error;

/// Result type for request operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Result type for configuration and construction
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Classified network error surfaced to every caller
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkError {
    /// No network reachability
    #[error("No internet connection available")]
    NoConnection,

    /// Request exceeded its deadline
    #[error("Request timed out")]
    Timeout,

    /// HTTP status outside 2xx
    #[error("Server error occurred (Code: {code})")]
    ServerError {
        /// HTTP status code
        code: u16,
    },

    /// Malformed transport envelope (not a body decode failure)
    #[error("Invalid response received")]
    InvalidResponse,

    /// Body received but did not match the expected shape
    #[error("Failed to process server response")]
    DecodingFailed,

    /// Anything not otherwise classified
    #[error("An unknown error occurred")]
    Unknown,
}

impl NetworkError {
    /// Every kind in the taxonomy, with a representative server code
    pub const ALL: [NetworkError; 6] = [
        NetworkError::NoConnection,
        NetworkError::Timeout,
        NetworkError::ServerError { code: 500 },
        NetworkError::InvalidResponse,
        NetworkError::DecodingFailed,
        NetworkError::Unknown,
    ];

    /// Stable error code for this kind
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoConnection => "NETWORK_NO_CONNECTION",
            Self::Timeout => "NETWORK_TIMEOUT",
            Self::ServerError { .. } => "NETWORK_SERVER_ERROR",
            Self::InvalidResponse => "NETWORK_INVALID_RESPONSE",
            Self::DecodingFailed => "NETWORK_DECODING_FAILED",
            Self::Unknown => "NETWORK_UNKNOWN",
        }
    }

    /// Check if this kind of error may be retried.
    ///
    /// Connectivity and timeout failures are always transient, server errors
    /// only when the status is 5xx, and unclassified failures fail open.
    /// Shape problems never improve on a second attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NoConnection | Self::Timeout | Self::Unknown => true,
            Self::ServerError { code } => *code >= 500,
            Self::InvalidResponse | Self::DecodingFailed => false,
        }
    }

    /// Get HTTP status code if applicable
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ServerError { code } => Some(*code),
            _ => None,
        }
    }

    /// Short explanation of why the failure happened
    pub fn failure_reason(&self) -> &'static str {
        match self {
            Self::NoConnection => "The device is not connected to the internet",
            Self::Timeout => "The server took too long to respond",
            Self::ServerError { .. } => "The server encountered an internal error",
            Self::InvalidResponse => "The server response was malformed",
            Self::DecodingFailed => "The data format was unexpected",
            Self::Unknown => "An unexpected error occurred",
        }
    }

    /// Suggested next step for the user
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::NoConnection => "Check your internet connection and try again",
            Self::Timeout => "Try again in a moment",
            Self::ServerError { .. } => {
                "Try again later or contact support if the problem persists"
            }
            Self::InvalidResponse | Self::DecodingFailed => {
                "Try again or contact support if the problem persists"
            }
            Self::Unknown => "Try restarting the app",
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout
        } else if err.is_connect() {
            NetworkError::NoConnection
        } else if err.is_body() || err.is_decode() || err.is_redirect() {
            NetworkError::InvalidResponse
        } else {
            NetworkError::Unknown
        }
    }
}

impl From<tokio::time::error::Elapsed> for NetworkError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        NetworkError::Timeout
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A URL setting could not be parsed
    #[error("Invalid {name} '{value}': {message}")]
    InvalidUrl {
        /// Setting name
        name: &'static str,
        /// Offending value
        value: String,
        /// Parser message
        message: String,
    },

    /// A non-URL setting had an unusable value
    #[error("Invalid value for {name}: {message}")]
    InvalidValue {
        /// Setting name
        name: &'static str,
        /// Error message
        message: String,
    },

    /// Retry policy parameters out of range
    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}
