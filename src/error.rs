//! Canonical error and result types for request decoding.
//!
//! This module defines the single public [`DecodeError`] surface returned
//! by [`decode_request`](crate::decode_request). Formatter failures are
//! carried through unchanged; the decoder adds no wrapping of its own
//! beyond surfacing them.

use thiserror::Error;

use crate::{event::EventError, formatter::FormatterError};

/// Top-level error type returned when a request cannot be decoded into a
/// CloudEvent.
///
/// None of these failures are retriable: a failed decode is a deterministic
/// function of the request, so retrying with the same input cannot succeed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// A binary-mode request carries no spec-version header and therefore
    /// cannot be identified as a CloudEvent.
    #[error("request is not a CloudEvent")]
    MissingSpecVersion,

    /// The spec-version header was present but its value is not in the
    /// version registry.
    #[error("unsupported CloudEvents spec version '{version}'")]
    UnsupportedSpecVersion {
        /// Raw header value that failed registry resolution.
        version: String,
    },

    /// A mapped attribute header carried a value the event model rejected.
    #[error("invalid value for attribute '{name}': {source}")]
    InvalidAttribute {
        /// Attribute name the header mapped to.
        name: String,
        /// Underlying event-model rejection.
        source: EventError,
    },

    /// A failure raised by the formatter collaborator, propagated unchanged.
    #[error(transparent)]
    Formatter(#[from] FormatterError),

    /// Reading the request body failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Canonical result alias used by `cloudwire` public APIs.
pub type Result<T> = std::result::Result<T, DecodeError>;
