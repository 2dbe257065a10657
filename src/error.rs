//! # Error Types
//!
//! Every fallible operation in the library returns [`MoonError`]. The enum is
//! deliberately small: the core only distinguishes bad input from a position
//! provider that cannot answer. "No rise or set within the search window" is
//! not an error at all and is reported as `Ok(None)` by the rise/set search.

use crate::Body;
use thiserror::Error;

/// Errors that can occur while computing lunar data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MoonError {
    /// Malformed date, out-of-range coordinates/month, excessive date range,
    /// or a non-finite Julian Day handed to the core.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The position provider could not produce a position for `body`
    /// (time outside the model's validity window, handle shut down, ...).
    #[error("ephemeris unavailable for {body}: {reason}")]
    ProviderUnavailable { body: Body, reason: String },

    /// A worker task computing part of an aggregate panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Join(String),
}

impl MoonError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        MoonError::InvalidInput(msg.into())
    }

    pub fn unavailable(body: Body, reason: impl Into<String>) -> Self {
        MoonError::ProviderUnavailable {
            body,
            reason: reason.into(),
        }
    }

    /// True for errors caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, MoonError::InvalidInput(_))
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MoonError>;
