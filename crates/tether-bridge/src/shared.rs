//! Shared-state reconciler.
//!
//! One value is owned jointly by the front end and the engine: either
//! side may write it, and both must converge on the same answer. The
//! reconciler applies a simple last-writer-wins discipline:
//!
//! - a local write is **optimistic** - the cached value updates first,
//!   then the new value is pushed through the transport. Reads in
//!   between see the written value, not the stale engine copy.
//! - an engine-announced change **overwrites** the cache
//!   unconditionally, even if a local write is still in flight. The
//!   engine's announcement is newer information.
//!
//! Change notifications fire only for engine-originated changes; local
//! writers already know what they wrote.

use crate::transport::Transport;
use crate::BridgeError;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tether_types::ControlId;

type ChangeHandler = Box<dyn FnMut(&SharedValueChanged) + Send>;

/// Notification of an engine-originated shared-value change.
///
/// Carries the identity of the control whose value changed, so a
/// handler shared across several controls can attribute the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedValueChanged {
    /// The control that owns the changed value.
    pub control: ControlId,
    /// The new value, as the engine announced it.
    pub value: Option<String>,
    /// The previous cached value.
    pub previous: Option<String>,
}

/// Reconciler for one jointly-owned value.
///
/// The change handler sits behind its own lock, separate from the slot
/// that holds it, so notification never runs user code under the slot
/// lock - a handler may re-register itself from inside its own
/// invocation.
pub struct SharedState {
    control: ControlId,
    transport: Arc<dyn Transport>,
    attribute: String,
    cache: Mutex<Option<String>>,
    on_changed: Mutex<Option<Arc<Mutex<ChangeHandler>>>>,
}

impl SharedState {
    /// Creates a reconciler mirroring `attribute` on behalf of
    /// `control`.
    ///
    /// The cache seeds from the transport's current attribute value,
    /// so a bridge attached to an already-configured control starts
    /// consistent.
    #[must_use]
    pub fn new(
        control: ControlId,
        transport: Arc<dyn Transport>,
        attribute: impl Into<String>,
    ) -> Self {
        let attribute = attribute.into();
        let initial = transport.get_attribute(&attribute);
        Self {
            control,
            transport,
            attribute,
            cache: Mutex::new(initial),
            on_changed: Mutex::new(None),
        }
    }

    /// Reads the current shared value.
    #[must_use]
    pub fn read(&self) -> Option<String> {
        self.cache.lock().clone()
    }

    /// Writes the shared value locally and pushes it to the engine.
    ///
    /// The cache updates before the push, so the write is visible to
    /// local readers immediately.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the push fails. The
    /// optimistic cache update stands; the engine will either receive
    /// a retry or announce its own value, both of which reconverge.
    pub fn write(&self, value: Option<String>) -> Result<(), BridgeError> {
        *self.cache.lock() = value.clone();
        self.transport
            .set_attribute(&self.attribute, value.as_deref())?;
        tracing::debug!(attribute = %self.attribute, "shared value written");
        Ok(())
    }

    /// Registers the engine-change notification handler.
    ///
    /// Replaces any previously registered handler.
    pub fn on_changed(&self, handler: impl FnMut(&SharedValueChanged) + Send + 'static) {
        *self.on_changed.lock() = Some(Arc::new(Mutex::new(Box::new(handler))));
    }

    /// Applies an engine-announced change.
    ///
    /// The payload's `value` field becomes the new cached value; a
    /// missing or null field clears it. The handler is invoked after
    /// the cache settles, outside both the cache and the handler-slot
    /// lock.
    pub fn apply_engine_change(&self, payload: &Value) {
        let value = payload
            .get("value")
            .and_then(Value::as_str)
            .map(str::to_string);

        let previous = {
            let mut cache = self.cache.lock();
            std::mem::replace(&mut *cache, value.clone())
        };
        tracing::debug!(control = %self.control, attribute = %self.attribute, "engine overwrote shared value");

        let change = SharedValueChanged {
            control: self.control.clone(),
            value,
            previous,
        };
        let handler = self.on_changed.lock().as_ref().map(Arc::clone);
        if let Some(handler) = handler {
            // Slot lock is released; the handler may call on_changed
            // to replace itself without deadlocking.
            let mut handler = handler.lock();
            (*handler)(&change);
        }
    }
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedState")
            .field("control", &self.control)
            .field("attribute", &self.attribute)
            .field("cache", &self.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::LoopbackTransport;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn shared() -> (SharedState, Arc<LoopbackTransport>) {
        let transport = Arc::new(LoopbackTransport::new());
        let state = SharedState::new(
            ControlId::named("confetti"),
            Arc::clone(&transport) as Arc<dyn Transport>,
            "value",
        );
        (state, transport)
    }

    #[test]
    fn local_write_is_read_back() {
        let (state, transport) = shared();

        state.write(Some("A".to_string())).unwrap();
        assert_eq!(state.read().as_deref(), Some("A"));
        // And the engine saw the push
        assert_eq!(transport.attribute("value").as_deref(), Some("A"));
    }

    #[test]
    fn engine_change_overwrites_local_write() {
        let (state, _transport) = shared();

        state.write(Some("A".to_string())).unwrap();
        state.apply_engine_change(&json!({"value": "B"}));
        assert_eq!(state.read().as_deref(), Some("B"));
    }

    #[test]
    fn engine_change_notifies_with_previous() {
        let (state, _transport) = shared();
        let count = Arc::new(AtomicUsize::new(0));

        state.write(Some("A".to_string())).unwrap();

        let count2 = Arc::clone(&count);
        state.on_changed(move |change| {
            assert!(change.control.matches("widget", "confetti"));
            assert_eq!(change.value.as_deref(), Some("B"));
            assert_eq!(change.previous.as_deref(), Some("A"));
            count2.fetch_add(1, Ordering::SeqCst);
        });

        state.apply_engine_change(&json!({"value": "B"}));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn local_write_does_not_notify() {
        let (state, _transport) = shared();
        let count = Arc::new(AtomicUsize::new(0));

        let count2 = Arc::clone(&count);
        state.on_changed(move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        });

        state.write(Some("A".to_string())).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn engine_change_without_value_clears() {
        let (state, _transport) = shared();
        state.write(Some("A".to_string())).unwrap();

        state.apply_engine_change(&json!({}));
        assert_eq!(state.read(), None);
    }

    #[test]
    fn write_none_clears_both_sides() {
        let (state, transport) = shared();
        state.write(Some("A".to_string())).unwrap();

        state.write(None).unwrap();
        assert_eq!(state.read(), None);
        assert_eq!(transport.attribute("value"), None);
    }

    #[test]
    fn cache_seeds_from_transport() {
        let transport = Arc::new(LoopbackTransport::new());
        transport.set_attribute("value", Some("preset")).unwrap();

        let state = SharedState::new(
            ControlId::named("confetti"),
            Arc::clone(&transport) as Arc<dyn Transport>,
            "value",
        );
        assert_eq!(state.read().as_deref(), Some("preset"));
    }

    #[test]
    fn change_handler_may_replace_itself() {
        let transport = Arc::new(LoopbackTransport::new());
        let state = Arc::new(SharedState::new(
            ControlId::named("confetti"),
            Arc::clone(&transport) as Arc<dyn Transport>,
            "value",
        ));
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        // The first handler swaps in a replacement while it is being
        // invoked. Must not deadlock against the slot it came from.
        let state2 = Arc::clone(&state);
        let first2 = Arc::clone(&first);
        let second2 = Arc::clone(&second);
        state.on_changed(move |_| {
            first2.fetch_add(1, Ordering::SeqCst);
            let second3 = Arc::clone(&second2);
            state2.on_changed(move |_| {
                second3.fetch_add(1, Ordering::SeqCst);
            });
        });

        state.apply_engine_change(&json!({"value": "A"}));
        state.apply_engine_change(&json!({"value": "B"}));

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_push_keeps_optimistic_value() {
        let (state, transport) = shared();
        transport.fail_next_sends(true);

        assert!(state.write(Some("A".to_string())).is_err());
        // Local readers still see the write
        assert_eq!(state.read().as_deref(), Some("A"));
    }
}
