//! Error types for link resolution.

use thiserror::Error;

/// Errors that can occur while resolving a deep link.
///
/// The `Display` text is what crosses the boundary in `{ok: false, error}`.
#[derive(Debug, Error)]
pub enum Error {
    /// No token could be obtained, not even interactively.
    #[error("Token unavailable: {0}")]
    TokenUnavailable(#[source] maillink_oauth::Error),

    /// The API answered with a non-success status (after the one retry).
    #[error("API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// The metadata carried no `Message-ID` header.
    #[error("Message-ID header missing")]
    HeaderMissing,

    /// The thread has no messages.
    #[error("Thread has no messages")]
    EmptyThread,

    /// A boundary request with an unrecognized `type`.
    #[error("Unknown message type")]
    UnknownRequestType,

    /// A boundary request that is recognized but malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request never produced a status (DNS, TLS, connection reset...).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON we expected.
    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid endpoint URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
