//! Error taxonomy and status classification for the Crudly client.
//!
//! # Design
//! The four backend outcomes (`Validation`, `NotFound`, `RateLimitExceeded`,
//! `Unexpected`) each get a variant so callers can branch on them for
//! retry, backoff or user messaging. Local failures (encoding, decoding,
//! transport) get their own variants and are never produced by
//! `check_status`.

use tracing::trace;

use crate::http::HttpResponse;
use crate::transport::TransportError;

/// Errors returned by every Crudly operation.
#[derive(Debug, thiserror::Error)]
pub enum CrudlyError {
    /// The backend returned 400; `reason` is the raw response body.
    #[error("validation error, reason: {reason}")]
    Validation { reason: String },

    /// The backend returned 404.
    #[error("not found")]
    NotFound,

    /// The backend returned 429.
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Any other status >= 300, with the raw body for diagnostics.
    #[error("unexpected error, status: {status}, body: {body}")]
    Unexpected { status: u16, body: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be decoded into the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),
}

impl CrudlyError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CrudlyError::NotFound)
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CrudlyError::RateLimitExceeded)
    }

    /// HTTP status behind the error, if it came from a classified response.
    pub fn status(&self) -> Option<u16> {
        match self {
            CrudlyError::Validation { .. } => Some(400),
            CrudlyError::NotFound => Some(404),
            CrudlyError::RateLimitExceeded => Some(429),
            CrudlyError::Unexpected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CrudlyError>;

/// Classify a response by status code.
///
/// Statuses below 300 and statuses listed in `allowed` pass; the caller then
/// inspects `response.status` itself to interpret an allowed status.
pub fn check_status(response: &HttpResponse, allowed: &[u16]) -> Result<()> {
    let status = response.status;
    if status < 300 || allowed.contains(&status) {
        return Ok(());
    }
    trace!(status, "classifying error response");
    Err(match status {
        400 => CrudlyError::Validation {
            reason: response.body.clone(),
        },
        404 => CrudlyError::NotFound,
        429 => CrudlyError::RateLimitExceeded,
        _ => CrudlyError::Unexpected {
            status,
            body: response.body.clone(),
        },
    })
}
