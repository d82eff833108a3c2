//! Error types for the Mixto client.
//!
//! # Design
//! Every failure surfaces to the immediate caller; nothing is retried or
//! swallowed. `Api` keeps the raw response body byte-for-byte so the caller
//! can inspect whatever diagnostic text the server sent. No variant ever
//! carries the API key.

use thiserror::Error;

/// Errors returned by `MixtoClient` and `Config`.
#[derive(Debug, Error)]
pub enum Error {
    /// Host URL unparseable, credentials missing, or config file unreadable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request body could not be serialized to JSON.
    #[error("failed to encode request body: {0}")]
    Encoding(#[source] serde_json::Error),

    /// Network-level failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server answered with status 301 or above.
    #[error("API error (status {status}): {}", String::from_utf8_lossy(.body))]
    Api { status: u16, body: Vec<u8> },

    /// The response body does not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decoding(String),
}

impl Error {
    /// HTTP status of an `Api` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw server body of an `Api` error, decoded lossily as UTF-8.
    pub fn body_text(&self) -> Option<String> {
        match self {
            Error::Api { body, .. } => Some(String::from_utf8_lossy(body).into_owned()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status: 404, .. })
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Api { status: 401 | 403, .. })
    }

    pub(crate) fn decoding(err: serde_json::Error) -> Self {
        Error::Decoding(err.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
