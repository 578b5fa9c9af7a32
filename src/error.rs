//! Error types for the registry client, tar codec, image model, and schema.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

/// The error kinds described in the design's error-handling policy: protocol failures,
/// authentication failures, malformed documents, digest mismatches, unsupported
/// operations, and external (subprocess) failures are each their own variant so callers
/// can match on what actually went wrong instead of parsing a message string.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Non-2xx HTTP response on a required registry operation.
    #[error("registry protocol error during {context}: HTTP {status} - {message}")]
    Protocol {
        context: String,
        status: u16,
        message: String,
    },

    /// 401 response outside of `authenticated()`, or a failed token exchange.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Malformed manifest/config JSON, unknown manifest version, or a diff_ids/layers
    /// length mismatch.
    #[error("malformed document: {0}")]
    Format(String),

    /// Computed SHA-256 disagrees with the announced digest. The layer MUST NOT be
    /// admitted to the `Image` when this occurs.
    #[error("digest mismatch: expected {expected}, computed {actual}")]
    Integrity { expected: String, actual: String },

    /// Requested an operation this crate does not implement, e.g. a non-"v1" archive
    /// version. Raised before any I/O.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A local subprocess (e.g. `docker load`) exited non-zero.
    #[error("external command failed: {0}")]
    External(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl RegistryError {
    pub fn protocol(context: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        RegistryError::Protocol {
            context: context.into(),
            status,
            message: message.into(),
        }
    }
}
