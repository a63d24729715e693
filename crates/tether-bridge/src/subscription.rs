//! Reactive subscription controller.
//!
//! Some engine event sources are expensive to produce (per-frame
//! ticks, scroll positions) and stay silent until the front end opts
//! in. Opting in is signalled through a boolean attribute the engine
//! watches; this controller owns that attribute and the local handler
//! slot.
//!
//! Enabling is **monotonic**: the first `subscribe` flips the
//! attribute on and nothing ever flips it off. `unsubscribe` detaches
//! the local handler only - events keep flowing and are dropped at the
//! handler slot. Resubscribing later therefore never has to renegotiate
//! with the engine, it just reattaches a handler.

use crate::transport::Transport;
use crate::BridgeError;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

type EventHandler = Box<dyn FnMut(Value) + Send>;

/// Controller for one opt-in engine event source.
///
/// The handler lives behind its own lock, separate from the slot that
/// holds it, so delivery never invokes user code while the slot lock
/// is held - a handler may subscribe or unsubscribe from inside its
/// own invocation.
pub struct ReactiveSubscription {
    transport: Arc<dyn Transport>,
    enable_attribute: String,
    handler: Mutex<Option<Arc<Mutex<EventHandler>>>>,
    enabled: Mutex<bool>,
}

impl ReactiveSubscription {
    /// Creates a controller governing `enable_attribute`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, enable_attribute: impl Into<String>) -> Self {
        Self {
            transport,
            enable_attribute: enable_attribute.into(),
            handler: Mutex::new(None),
            enabled: Mutex::new(false),
        }
    }

    /// Attaches `handler` and enables the event source if needed.
    ///
    /// The handler is stored *before* the enable attribute is pushed,
    /// so the first event the engine emits always finds a handler.
    /// Subscribing again replaces the handler without touching the
    /// attribute.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if pushing the enable
    /// attribute fails; the handler stays attached and the next
    /// `subscribe` retries the push.
    pub fn subscribe(&self, handler: impl FnMut(Value) + Send + 'static) -> Result<(), BridgeError> {
        *self.handler.lock() = Some(Arc::new(Mutex::new(Box::new(handler))));

        let mut enabled = self.enabled.lock();
        if !*enabled {
            self.transport
                .set_attribute(&self.enable_attribute, Some("true"))?;
            *enabled = true;
            tracing::debug!(attribute = %self.enable_attribute, "reactive source enabled");
        }
        Ok(())
    }

    /// Detaches the local handler.
    ///
    /// The engine-side source stays enabled; subsequent events are
    /// dropped at [`deliver`](Self::deliver) until a new handler is
    /// attached.
    pub fn unsubscribe(&self) {
        *self.handler.lock() = None;
    }

    /// Delivers an event payload to the attached handler.
    ///
    /// Returns `true` if a handler consumed it, `false` if no handler
    /// is attached (the post-unsubscribe drop path).
    pub fn deliver(&self, payload: Value) -> bool {
        let handler = self.handler.lock().as_ref().map(Arc::clone);
        match handler {
            Some(handler) => {
                // Slot lock is released; the handler may call
                // subscribe/unsubscribe without deadlocking.
                let mut handler = handler.lock();
                (*handler)(payload);
                true
            }
            None => false,
        }
    }

    /// Returns `true` once the enable attribute has been pushed.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        *self.enabled.lock()
    }
}

impl std::fmt::Debug for ReactiveSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveSubscription")
            .field("enable_attribute", &self.enable_attribute)
            .field("enabled", &self.is_enabled())
            .field("has_handler", &self.handler.lock().is_some())
            .finish()
    }
}
