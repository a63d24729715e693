//! Event router - the single inbound entry point.
//!
//! Every engine message lands here and is classified by payload shape
//! first, name second:
//!
//! ```text
//! bytes ──decode──► frame
//!   1. task discriminator (status + token) ──► TaskMultiplexer
//!   2. correlation token                   ──► CallbackRegistry
//!   3. shared-change event name            ──► SharedState
//!   4. reactive event name                 ──► ReactiveSubscription
//!   5. any other name                      ──► direct handler
//! ```
//!
//! Shape beats name: a correlated reply routes to its pending caller
//! even when a direct handler is registered under the same event name,
//! so an invocation reply can never be shadowed by general-purpose
//! wiring.

use crate::registry::CallbackRegistry;
use crate::shared::SharedState;
use crate::subscription::ReactiveSubscription;
use crate::task::TaskMultiplexer;
use crate::{BridgeConfig, BridgeError};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tether_event::{EventFrame, ReplyEnvelope};

type EventHandler = Box<dyn FnMut(Value) + Send>;

/// Where a dispatched message ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Task event delivered to a live task.
    Task,
    /// Correlated reply delivered to a pending invocation.
    Correlated,
    /// Engine-announced shared-value change applied.
    SharedChange,
    /// Reactive event delivered to the attached handler.
    Reactive,
    /// Direct event delivered to a named handler.
    Direct,
    /// Decoded cleanly but nothing consumed it: late reply, retired
    /// task, detached reactive handler, or unknown name.
    Dropped,
}

/// Classifier and dispatcher for inbound engine messages.
pub struct EventRouter {
    registry: Arc<CallbackRegistry>,
    tasks: Arc<TaskMultiplexer>,
    shared: Arc<SharedState>,
    subscription: Arc<ReactiveSubscription>,
    shared_change_event: String,
    reactive_event: String,
    direct: Mutex<HashMap<String, Arc<Mutex<EventHandler>>>>,
}

impl EventRouter {
    /// Creates a router over the bridge's delivery targets.
    #[must_use]
    pub fn new(
        config: &BridgeConfig,
        registry: Arc<CallbackRegistry>,
        tasks: Arc<TaskMultiplexer>,
        shared: Arc<SharedState>,
        subscription: Arc<ReactiveSubscription>,
    ) -> Self {
        Self {
            registry,
            tasks,
            shared,
            subscription,
            shared_change_event: config.shared_change_event().to_string(),
            reactive_event: config.reactive_event().to_string(),
            direct: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a direct handler for `name`, replacing any previous
    /// one.
    pub fn on_event(&self, name: impl Into<String>, handler: impl FnMut(Value) + Send + 'static) {
        self.direct
            .lock()
            .insert(name.into(), Arc::new(Mutex::new(Box::new(handler))));
    }

    /// Removes the direct handler for `name`, if any.
    pub fn off_event(&self, name: &str) {
        self.direct.lock().remove(name);
    }

    /// Classifies and dispatches one engine message.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Protocol`] for undecodable bytes or a
    /// shape violation inside a recognized frame. A malformed reply
    /// that still carries a valid token additionally fails the pending
    /// invocation, so its caller is unblocked with the same error.
    pub fn dispatch(&self, name: &str, raw: &[u8]) -> Result<RouteOutcome, BridgeError> {
        let frame = match EventFrame::decode(name, raw) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(event = name, error = %e, "undecodable payload dropped");
                return Err(BridgeError::Protocol(e.to_string()));
            }
        };

        if frame.is_task_event() {
            let event = frame
                .task_event()
                .map_err(|e| BridgeError::Protocol(e.to_string()))?;
            return Ok(if self.tasks.deliver(&event) {
                RouteOutcome::Task
            } else {
                RouteOutcome::Dropped
            });
        }

        if let Some(token) = frame.callback_token() {
            return match ReplyEnvelope::from_payload(&frame.payload) {
                Ok(envelope) => Ok(if self.registry.resolve(envelope.token, envelope.result) {
                    RouteOutcome::Correlated
                } else {
                    RouteOutcome::Dropped
                }),
                Err(e) => {
                    let error = BridgeError::Protocol(e.to_string());
                    self.registry.fail(token, error.clone());
                    Err(error)
                }
            };
        }

        if frame.name == self.shared_change_event {
            self.shared.apply_engine_change(&frame.payload);
            return Ok(RouteOutcome::SharedChange);
        }

        if frame.name == self.reactive_event {
            return Ok(if self.subscription.deliver(frame.payload) {
                RouteOutcome::Reactive
            } else {
                RouteOutcome::Dropped
            });
        }

        let handler = self.direct.lock().get(&frame.name).map(Arc::clone);
        match handler {
            Some(handler) => {
                // Invoked outside the map lock so a handler may
                // register or remove handlers itself.
                let mut handler = handler.lock();
                (*handler)(frame.payload);
                Ok(RouteOutcome::Direct)
            }
            None => {
                tracing::debug!(event = %frame.name, "unroutable event dropped");
                Ok(RouteOutcome::Dropped)
            }
        }
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("shared_change_event", &self.shared_change_event)
            .field("reactive_event", &self.reactive_event)
            .field("direct_handlers", &self.direct.lock().len())
            .finish()
    }
}
