//! Task status discriminator and decoded task events.
//!
//! A long-running engine task emits zero or more `progress` events and
//! exactly one terminal event (`complete` or `error`). All three share
//! one wire shape, discriminated by the `status` field:
//!
//! ```json
//! { "token": "<task uuid>", "status": "progress", "step": 2, "total_steps": 5 }
//! { "token": "<task uuid>", "status": "complete", "result": { ... } }
//! { "token": "<task uuid>", "status": "error", "error": { ... } }
//! ```

use crate::EventError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_types::TaskToken;

/// Status discriminator of a task event.
///
/// | Status | Terminal | Handler |
/// |--------|----------|---------|
/// | `Progress` | No | progress handler, zero or more times |
/// | `Complete` | Yes | completion handler, exactly once |
/// | `Error` | Yes | completion handler, exactly once |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Intermediate progress notification; the task keeps running.
    Progress,
    /// Task finished successfully.
    Complete,
    /// Task finished with an engine-reported failure.
    Error,
}

impl TaskStatus {
    /// Parses a wire status string.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownStatus`] for anything outside
    /// `progress | complete | error`.
    pub fn parse(s: &str) -> Result<Self, EventError> {
        match s {
            "progress" => Ok(Self::Progress),
            "complete" => Ok(Self::Complete),
            "error" => Ok(Self::Error),
            other => Err(EventError::UnknownStatus(other.to_string())),
        }
    }

    /// Returns `true` if this status ends the task's lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Progress => "progress",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// A decoded task event.
///
/// Carries the correlation token, the status discriminator, the
/// optional step counters, and the full original payload (handlers
/// receive the payload untrimmed, so engine-specific extra fields
/// survive decoding).
#[derive(Debug, Clone)]
pub struct TaskEvent {
    /// Token of the task this event belongs to.
    pub token: TaskToken,
    /// Status discriminator.
    pub status: TaskStatus,
    /// Current step (progress events).
    pub step: Option<u64>,
    /// Total step count (progress events).
    pub total_steps: Option<u64>,
    /// The full decoded payload.
    pub payload: Value,
}

impl TaskEvent {
    /// Decodes a task event from an already-parsed payload.
    ///
    /// # Errors
    ///
    /// - [`EventError::MissingField`] if `token` or `status` is absent
    /// - [`EventError::MalformedPayload`] if `token` is not a UUID
    /// - [`EventError::UnknownStatus`] for an unrecognized status
    pub fn from_payload(payload: Value) -> Result<Self, EventError> {
        let token_str = payload
            .get("token")
            .and_then(Value::as_str)
            .ok_or(EventError::MissingField("token"))?;
        let uuid = token_str
            .parse()
            .map_err(|_| EventError::MalformedPayload(format!("invalid task token: {token_str}")))?;

        let status_str = payload
            .get("status")
            .and_then(Value::as_str)
            .ok_or(EventError::MissingField("status"))?;
        let status = TaskStatus::parse(status_str)?;

        let step = payload.get("step").and_then(Value::as_u64);
        let total_steps = payload.get("total_steps").and_then(Value::as_u64);

        Ok(Self {
            token: TaskToken(uuid),
            status,
            step,
            total_steps,
            payload,
        })
    }
}
