//! Runtime bridge between a declarative control tree and an external
//! render/execution engine.
//!
//! A control's front-end object and its engine-side implementation run
//! in different processes and speak through a string-attribute store
//! plus named events. This crate supplies the machinery that turns
//! that thin wire into a usable programming model:
//!
//! | Component | Concern |
//! |-----------|---------|
//! | [`CallbackRegistry`] | exactly-once reply correlation by token |
//! | [`InvocationGateway`] | named calls: fire-and-forget, wait, timeout, callback |
//! | [`TaskMultiplexer`] | concurrent task progress streams with a strict lifecycle |
//! | [`ReactiveSubscription`] | opt-in event sources with monotonic enable |
//! | [`SharedState`] | jointly-owned value, optimistic write / engine overwrite |
//! | [`AttributeCache`] | typed getters/setters over string attributes |
//! | [`EventRouter`] | shape-first classification of inbound messages |
//! | [`EngineBridge`] | the facade a control holds |
//!
//! # Wiring
//!
//! ```text
//! control ──► EngineBridge ──► Transport ──────────► engine
//!                  ▲                                   │
//!                  └──── on_engine_message(name, raw) ◄┘
//! ```
//!
//! The host implements [`Transport`] for the outbound direction and
//! feeds every inbound engine message into
//! [`EngineBridge::on_engine_message`]. The [`testing`] module ships a
//! loopback transport for tests and demos.
//!
//! # Concurrency Model
//!
//! All shared state lives behind `parking_lot` mutexes with a strict
//! discipline: entries are removed or cloned out under a lock and
//! user callbacks run after it is released (or under a narrower
//! per-entry lock). Blocking invocations park on `tokio::sync::oneshot`
//! receivers, so a waiting caller never stalls delivery of unrelated
//! replies or events.
//!
//! # Error Handling
//!
//! Every fallible operation returns [`BridgeError`], with
//! `BRIDGE_`-prefixed codes via the
//! [`ErrorCode`](tether_types::ErrorCode) trait. Timeouts and transport
//! failures are recoverable; protocol and argument errors are not.

mod attrs;
mod bridge;
mod config;
mod error;
mod gateway;
mod registry;
mod router;
mod shared;
mod subscription;
mod task;
pub mod testing;
mod transport;

pub use attrs::AttributeCache;
pub use bridge::EngineBridge;
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use gateway::InvocationGateway;
pub use registry::{CallbackRegistry, PendingCallback, ReplyCallback};
pub use router::{EventRouter, RouteOutcome};
pub use shared::{SharedState, SharedValueChanged};
pub use subscription::ReactiveSubscription;
pub use task::{TaskMultiplexer, TaskObserver};
pub use transport::{InvokeArgs, Transport};

// Re-export the protocol layer for downstream convenience
pub use tether_event::{EventFrame, ReplyEnvelope, TaskEvent, TaskStatus};
pub use tether_types::{CallbackToken, ControlId, ErrorCode, TaskToken};
