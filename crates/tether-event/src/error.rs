//! Event layer errors.
//!
//! Failures in this layer are always about the *shape* of what the
//! engine sent: bytes that are not valid JSON, payloads missing a
//! required correlation field, or an unrecognized task status. None of
//! them are recoverable — the same bytes will fail the same way on
//! every retry.
//!
//! # Error Code Convention
//!
//! All event errors use the `EVENT_` prefix:
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`EventError::MalformedPayload`] | `EVENT_MALFORMED_PAYLOAD` | No |
//! | [`EventError::MissingField`] | `EVENT_MISSING_FIELD` | No |
//! | [`EventError::UnknownStatus`] | `EVENT_UNKNOWN_STATUS` | No |
//!
//! # Usage
//!
//! ```
//! use tether_event::EventError;
//! use tether_types::ErrorCode;
//!
//! let err = EventError::MissingField("token");
//! assert_eq!(err.code(), "EVENT_MISSING_FIELD");
//! assert!(!err.is_recoverable());
//! ```

use tether_types::ErrorCode;
use thiserror::Error;

/// Event layer error.
///
/// Raised while decoding engine-originated payloads. The router treats
/// these as diagnostics, not failures: a malformed event is dropped
/// with a log line and must never abort delivery of subsequent events.
#[derive(Debug, Clone, Error)]
pub enum EventError {
    /// Payload bytes could not be parsed, or a field had the wrong type.
    ///
    /// # Common Causes
    ///
    /// - Payload is not valid JSON
    /// - A token field holds a non-UUID string
    /// - A numeric field holds a non-numeric value
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A required field was absent from the payload.
    ///
    /// The field name identifies which contract was violated
    /// (e.g., `"token"` on a reply envelope, `"status"` on a task
    /// event).
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A task event carried a status outside `progress | complete | error`.
    #[error("unknown task status: {0}")]
    UnknownStatus(String),
}

impl ErrorCode for EventError {
    fn code(&self) -> &'static str {
        match self {
            Self::MalformedPayload(_) => "EVENT_MALFORMED_PAYLOAD",
            Self::MissingField(_) => "EVENT_MISSING_FIELD",
            Self::UnknownStatus(_) => "EVENT_UNKNOWN_STATUS",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Shape errors never heal on retry.
        false
    }
}
