//! Bridge layer errors.
//!
//! This is the error surface front-end code sees: every fallible bridge
//! operation returns [`BridgeError`], and async/callback-style
//! operations deliver it through the registered callback instead of a
//! return value.
//!
//! # Error Code Convention
//!
//! All bridge errors use the `BRIDGE_` prefix:
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`BridgeError::Timeout`] | `BRIDGE_TIMEOUT` | Yes |
//! | [`BridgeError::Transport`] | `BRIDGE_TRANSPORT` | Yes |
//! | [`BridgeError::Protocol`] | `BRIDGE_PROTOCOL` | No |
//! | [`BridgeError::Engine`] | `BRIDGE_ENGINE` | No |
//! | [`BridgeError::InvalidArgument`] | `BRIDGE_INVALID_ARGUMENT` | No |
//! | [`BridgeError::DuplicateToken`] | `BRIDGE_DUPLICATE_TOKEN` | No |
//!
//! # Timeout vs Engine vs Protocol
//!
//! Callers of blocking invocations need to tell three situations apart:
//!
//! - **Timeout**: the engine never answered within the local deadline.
//!   The reply may still arrive later and will be silently dropped.
//! - **Engine**: the engine answered, and the answer was a structured
//!   failure. The original failure payload is preserved verbatim.
//! - **Protocol**: the engine answered with bytes the bridge could not
//!   make sense of.
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//! use tether_bridge::BridgeError;
//! use tether_types::ErrorCode;
//!
//! let err = BridgeError::Timeout {
//!     operation: "play".into(),
//!     timeout: Duration::from_secs(1),
//! };
//! assert_eq!(err.code(), "BRIDGE_TIMEOUT");
//! assert!(err.is_recoverable());
//! assert!(err.to_string().contains("play"));
//! ```

use serde_json::Value;
use std::time::Duration;
use tether_types::ErrorCode;
use thiserror::Error;

/// Bridge layer error.
///
/// All variants implement [`ErrorCode`] for standardized handling.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// The local deadline elapsed before the engine replied.
    ///
    /// Carries the attempted operation name and the configured timeout
    /// so callers can report exactly which call gave up, not a generic
    /// failure. The pending entry is expired locally; a late reply is
    /// dropped, never delivered.
    ///
    /// This is **recoverable**: the engine may simply have been busy.
    #[error("invocation '{operation}' timed out after {timeout:?}")]
    Timeout {
        /// Name of the operation that was invoked.
        operation: String,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// The transport failed to deliver the request or the reply.
    ///
    /// This is **recoverable**: delivery failures are typically
    /// transient (full buffer, reconnecting session).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The engine sent a payload the bridge could not interpret.
    ///
    /// Present-but-unparseable data, or a reply not matching the
    /// declared envelope shape. Not recoverable: the same bytes fail
    /// the same way every time.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The engine explicitly reported an application-level failure.
    ///
    /// The engine's structured error payload is preserved verbatim so
    /// none of its fields are lost in transit.
    #[error("engine reported failure: {0}")]
    Engine(Value),

    /// The caller passed invalid parameters.
    ///
    /// Raised synchronously at the call site, never through a callback.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A correlation token was registered while still pending.
    ///
    /// Tokens are minted fresh per call, so this indicates a caller
    /// reusing a token before its previous registration was consumed.
    #[error("token already pending: {0}")]
    DuplicateToken(String),
}

impl ErrorCode for BridgeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "BRIDGE_TIMEOUT",
            Self::Transport(_) => "BRIDGE_TRANSPORT",
            Self::Protocol(_) => "BRIDGE_PROTOCOL",
            Self::Engine(_) => "BRIDGE_ENGINE",
            Self::InvalidArgument(_) => "BRIDGE_INVALID_ARGUMENT",
            Self::DuplicateToken(_) => "BRIDGE_DUPLICATE_TOKEN",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport(_))
    }
}
