/*!
 * Error types for the srtrelay application.
 *
 * Every failure is tagged with an [`ErrorKind`] so callers decide between
 * retrying, aborting the run and reporting bad input without inspecting the
 * concrete error type.
 */

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a failure, checked by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Expected to succeed when retried (timeout, connection drop, rate limit)
    Transient,
    /// Stops the current run
    Fatal,
    /// Caused by what the user handed us (missing file, bad SRT, bad flags)
    UserInput,
}

/// Errors that can occur when talking to the completion service
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The request did not complete within the active timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Message from the API
        message: String,
        /// Value of the Retry-After header, when the service sent one
        retry_after_secs: Option<u64>,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The service answered but produced no text
    #[error("API returned an empty completion")]
    EmptyResponse,

    /// Error when building or sending the request fails for a non-network reason
    #[error("API request failed: {0}")]
    RequestFailed(String),
}

impl ProviderError {
    /// Classify this error for the retry policy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) | Self::ConnectionError(_) | Self::RateLimitExceeded { .. } => {
                ErrorKind::Transient
            }
            _ => ErrorKind::Fatal,
        }
    }

    /// Whether the retry policy may try again after this error
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// How long the service asked us to wait, if it said so
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after_secs, .. } => retry_after_secs.map(Duration::from_secs),
            _ => None,
        }
    }

    /// Short name used in retry log lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "Timeout",
            Self::ConnectionError(_) => "ConnectionError",
            Self::RateLimitExceeded { .. } => "RateLimit",
            Self::AuthenticationError(_) => "Authentication",
            Self::ApiError { .. } => "ApiError",
            Self::ParseError(_) => "ParseError",
            Self::EmptyResponse => "EmptyResponse",
            Self::RequestFailed(_) => "RequestFailed",
        }
    }
}

/// Errors that end the translation of a batch
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Transient failures kept happening past the retry budget
    #[error("Giving up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Number of requests that were sent
        attempts: u32,
        /// The failure of the final attempt
        last_error: ProviderError,
    },

    /// A non-transient provider failure, never retried
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The user interrupted the run while waiting to retry
    #[error("Interrupted while waiting to retry")]
    Interrupted,
}

impl TranslationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Fatal
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// The input subtitle file does not exist
    #[error("File not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The input subtitle file could not be parsed
    #[error("Unable to parse subtitle file {}: {message}", .path.display())]
    InvalidInput {
        /// File that failed to parse
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Invalid command line or environment configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Output or checkpoint could not be written
    #[error("Storage error: {0}")]
    Storage(String),

    /// A batch could not be translated
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputNotFound(_) | Self::InvalidInput { .. } | Self::Config(_) => ErrorKind::UserInput,
            Self::Storage(_) => ErrorKind::Fatal,
            Self::Translation(e) => e.kind(),
        }
    }

    /// Wrap a failed write of the output file or the checkpoint
    pub fn storage(error: impl std::fmt::Display) -> Self {
        Self::Storage(error.to_string())
    }
}
