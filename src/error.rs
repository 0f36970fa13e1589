//! Error types for the tempmail-sync crate.
//!
//! All errors implement [`std::error::Error`] and provide context about what went wrong.
//! Errors are categorized by their retryability - see [`Error::is_retryable`].
//!
//! Most callers never see these values directly: the plain [`MailboxSession`] operations
//! log the error and degrade to an empty result, `false` or `None`. The `try_*` variants
//! return them unchanged for callers that want to branch on the cause.
//!
//! [`MailboxSession`]: crate::MailboxSession

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during mailbox operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration / validation errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// Invalid email address format.
    #[error("invalid email format: {email}")]
    InvalidEmailFormat {
        /// The invalid email address.
        email: String,
    },

    /// Invalid configuration provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// A custom extraction pattern failed to compile.
    #[error("invalid pattern '{pattern}'")]
    InvalidPattern {
        /// The pattern source.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Token handshake errors (RETRYABLE)
    // ─────────────────────────────────────────────────────────────────────────
    /// The handshake response carried no `auth_token` cookie.
    #[error("no auth_token cookie in handshake response (cookies: {available:?})")]
    MissingAuthCookie {
        /// Names of the cookies that were present.
        available: Vec<String>,
    },

    /// The handshake request itself failed.
    #[error("token handshake with {url} failed")]
    Handshake {
        /// The handshake URL.
        url: String,
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Session state errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// A mailbox operation was attempted before `connect()` succeeded.
    #[error("not connected: {operation} requires a token and a bound address")]
    NotConnected {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// The session was disconnected and can no longer issue requests.
    #[error("session disconnected: {operation} is unavailable")]
    Disconnected {
        /// The operation that was attempted.
        operation: &'static str,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Transport errors (RETRYABLE)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client")]
    HttpClient {
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// An HTTP request failed before a response arrived.
    #[error("request to {url} failed")]
    Request {
        /// The request URL.
        url: String,
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// The request URL.
        url: String,
        /// The status code returned.
        status: StatusCode,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response from {url}")]
    DecodeResponse {
        /// The request URL.
        url: String,
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Record errors (NOT retryable - malformed content won't change)
    // ─────────────────────────────────────────────────────────────────────────
    /// A single message record carried a malformed field.
    #[error("malformed record field '{field}': {message}")]
    MalformedRecord {
        /// The offending wire field.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

impl Error {
    /// Returns `true` if this error represents a transient failure that might succeed on retry.
    ///
    /// ```
    /// use tempmail_sync::Error;
    ///
    /// let err = Error::NotConnected { operation: "fetch_messages" };
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::MissingAuthCookie { .. }
            | Error::Handshake { .. }
            | Error::Request { .. }
            | Error::DecodeResponse { .. } => true,

            // Server-side failures may clear up, client errors will not.
            Error::UnexpectedStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }

            Error::InvalidEmailFormat { .. }
            | Error::InvalidConfig { .. }
            | Error::InvalidPattern { .. }
            | Error::NotConnected { .. }
            | Error::Disconnected { .. }
            | Error::HttpClient { .. }
            | Error::MalformedRecord { .. } => false,
        }
    }

    /// Returns the error category for metrics/logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidEmailFormat { .. }
            | Error::InvalidConfig { .. }
            | Error::InvalidPattern { .. }
            | Error::HttpClient { .. } => ErrorCategory::Configuration,

            Error::MissingAuthCookie { .. } | Error::Handshake { .. } => ErrorCategory::Auth,

            Error::NotConnected { .. } | Error::Disconnected { .. } => ErrorCategory::State,

            Error::Request { .. } => ErrorCategory::Network,

            Error::UnexpectedStatus { .. } | Error::DecodeResponse { .. } => {
                ErrorCategory::Protocol
            }

            Error::MalformedRecord { .. } => ErrorCategory::Parse,
        }
    }
}

/// Error categories for metrics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration or validation errors.
    Configuration,
    /// Token handshake failures.
    Auth,
    /// Operation attempted in the wrong session state.
    State,
    /// Network connectivity errors.
    Network,
    /// Unexpected responses from the mailbox service.
    Protocol,
    /// Malformed message records.
    Parse,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Auth => write!(f, "auth"),
            ErrorCategory::State => write!(f, "state"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Protocol => write!(f, "protocol"),
            ErrorCategory::Parse => write!(f, "parse"),
        }
    }
}
