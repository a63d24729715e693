//! Event model for the Tether bridge.
//!
//! This crate defines the structured view of everything the engine
//! sends back across the serialization boundary: named event frames,
//! correlated reply envelopes, and task progress/terminal events.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Protocol Layer                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  tether-types  : tokens, ControlId, ErrorCode                │
//! │  tether-event  : frames, replies, task status  ◄── HERE      │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Runtime Layer                            │
//! │  tether-bridge : registry, gateway, router, tasks            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Message Flow
//!
//! ```text
//! engine ──(name, bytes)──► EventFrame::decode
//!                                │
//!              ┌─────────────────┼──────────────────┐
//!              ▼                 ▼                  ▼
//!        TaskEvent         ReplyEnvelope      direct event
//!   (status + token)      (token, ok/err)    (name-matched)
//! ```
//!
//! Classification is data-driven: the task discriminator (`status` +
//! `token`) takes precedence over a bare correlation `token`, which
//! takes precedence over event-name matching. The router in
//! `tether-bridge` relies on this ordering.
//!
//! # Error Handling
//!
//! Decoding failures are [`EventError`] values with `EVENT_`-prefixed
//! codes. They are never recoverable; the receiving side drops the
//! offending frame with a diagnostic and keeps serving later frames.
//!
//! # Example
//!
//! ```
//! use tether_event::{EventFrame, TaskStatus};
//!
//! let frame = EventFrame::decode("animation_end", br#"{"looped": false}"#).unwrap();
//! assert_eq!(frame.name, "animation_end");
//! assert!(!frame.is_task_event());
//! assert!(frame.callback_token().is_none());
//!
//! assert!(TaskStatus::Error.is_terminal());
//! ```

mod error;
mod frame;
mod task;

pub use error::EventError;
pub use frame::{EventFrame, ReplyEnvelope};
pub use task::{TaskEvent, TaskStatus};

// Re-export from tether_types for convenience
pub use tether_types::{CallbackToken, ControlId, TaskToken};
