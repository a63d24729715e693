//! Core types for the Tether bridge.
//!
//! This crate provides the foundational identifier types and the error
//! code contract shared by every layer of the Tether bridge — the
//! machinery that connects a declarative front-end control tree to an
//! external render/execution engine across a serialization boundary.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Protocol Layer                           │
//! │  (stable, safe for front-end code to depend on)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  tether-types  : tokens, ControlId, ErrorCode  ◄── HERE      │
//! │  tether-event  : event frames, task status, reply envelope   │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Runtime Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  tether-bridge : registry, gateway, router, tasks            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Token Design
//!
//! Correlation is caller-driven: the front-end mints a token, registers
//! its callback, and only then dispatches the request. That ordering
//! closes the race between "request sent" and "callback ready".
//!
//! Tokens are type-tagged by category:
//!
//! - [`CallbackToken`] — one pending invocation reply
//! - [`TaskToken`] — one long-running task (progress stream + terminal)
//!
//! The two categories occupy disjoint types, so a registry can never be
//! handed a token of the wrong kind.
//!
//! # Example
//!
//! ```
//! use tether_types::{CallbackToken, ControlId, TaskToken};
//!
//! // Well-known controls have deterministic identity
//! let c1 = ControlId::named("confetti");
//! let c2 = ControlId::named("confetti");
//! assert_eq!(c1, c2);
//!
//! // Tokens are unique per mint
//! let cb = CallbackToken::new();
//! let task = TaskToken::new();
//! assert!(cb.to_string().starts_with("cb:"));
//! assert!(task.to_string().starts_with("task:"));
//! ```

mod error;
mod id;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{CallbackToken, ControlId, TaskToken};
