//! Correlation registry - pending callbacks keyed by token.
//!
//! The registry owns the lifecycle of every [`CallbackToken`] that is
//! waiting for an engine reply. Each entry is consumed exactly once:
//!
//! ```text
//! register ──► pending ──┬── resolve(reply)  ──► consumed (delivered)
//!                        ├── fail(error)     ──► consumed (delivered)
//!                        └── expire()        ──► consumed (dropped)
//! ```
//!
//! After consumption the token is unknown again, so a late reply after
//! timeout hits the unknown-token path and is silently ignored - that
//! is the exactly-once guarantee, not an error.
//!
//! # Locking
//!
//! The internal map is guarded by a `parking_lot::Mutex`. Entries are
//! removed *under* the lock and invoked *after* it is released, so a
//! callback that issues a fresh invocation (and therefore registers a
//! new token) cannot deadlock against the registry.

use crate::BridgeError;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use tether_types::CallbackToken;
use tokio::sync::oneshot;

/// Single-shot callback for a correlated reply.
pub type ReplyCallback = Box<dyn FnOnce(Result<Value, BridgeError>) + Send>;

/// A pending consumer for one correlation token.
///
/// Both shapes are single-shot; the registry enforces consumption
/// exactly once by removing the entry before delivery.
pub enum PendingCallback {
    /// A blocked `invoke(wait = true)` caller parked on a oneshot.
    Waiter(oneshot::Sender<Result<Value, BridgeError>>),
    /// A stored callback registered by `invoke_with_callback`.
    Callback(ReplyCallback),
}

impl std::fmt::Debug for PendingCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiter(_) => f.write_str("PendingCallback::Waiter"),
            Self::Callback(_) => f.write_str("PendingCallback::Callback"),
        }
    }
}

/// Registry of pending invocation callbacks.
///
/// The only shared mutable state on the callback path. All methods are
/// non-blocking and safe to call concurrently from multiple callers
/// and the delivery context.
#[derive(Default)]
pub struct CallbackRegistry {
    pending: Mutex<HashMap<CallbackToken, PendingCallback>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pending consumer for `token`.
    ///
    /// Must be called *before* the request is dispatched, so the reply
    /// can never race the registration.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DuplicateToken`] if the token is already
    /// pending. Tokens are minted fresh per call, so hitting this means
    /// a caller reused a live token.
    pub fn register(
        &self,
        token: CallbackToken,
        callback: PendingCallback,
    ) -> Result<(), BridgeError> {
        let mut pending = self.pending.lock();
        if pending.contains_key(&token) {
            return Err(BridgeError::DuplicateToken(token.to_string()));
        }
        pending.insert(token, callback);
        Ok(())
    }

    /// Delivers an engine reply to the pending consumer, if any.
    ///
    /// `reply` is the decoded envelope outcome: `Ok(result)` for a
    /// success, `Err(payload)` for an engine-reported failure (the
    /// payload is wrapped as [`BridgeError::Engine`] on delivery).
    ///
    /// Returns `true` if a pending entry existed and was invoked.
    /// Unknown tokens are a no-op returning `false` - expected for
    /// late or duplicate deliveries after expiry.
    pub fn resolve(&self, token: CallbackToken, reply: Result<Value, Value>) -> bool {
        self.complete(token, reply.map_err(BridgeError::Engine))
    }

    /// Delivers a bridge-level failure to the pending consumer, if any.
    ///
    /// Used for protocol violations in the reply and for transport
    /// failures on callback-style invocations - errors must reach the
    /// registered consumer, never vanish.
    pub fn fail(&self, token: CallbackToken, error: BridgeError) -> bool {
        self.complete(token, Err(error))
    }

    /// Expires a pending entry without delivering anything.
    ///
    /// Called on timeout. Returns `true` if an entry was removed;
    /// `false` if the token was unknown (already consumed).
    pub fn expire(&self, token: CallbackToken) -> bool {
        let removed = self.pending.lock().remove(&token);
        if removed.is_some() {
            tracing::debug!(%token, "pending callback expired");
            true
        } else {
            false
        }
    }

    /// Returns the number of currently pending entries.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Removes the entry under the lock, invokes it after release.
    fn complete(&self, token: CallbackToken, outcome: Result<Value, BridgeError>) -> bool {
        let entry = self.pending.lock().remove(&token);
        match entry {
            Some(PendingCallback::Waiter(tx)) => {
                // Waiter may have given up between expiry and now; a
                // dead receiver is equivalent to a late reply.
                let _ = tx.send(outcome);
                true
            }
            Some(PendingCallback::Callback(cb)) => {
                cb(outcome);
                true
            }
            None => {
                tracing::debug!(%token, "reply for unknown token dropped");
                false
            }
        }
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tether_types::ErrorCode;

    #[test]
    fn register_and_resolve() {
        let registry = CallbackRegistry::new();
        let token = CallbackToken::new();
        let (tx, mut rx) = oneshot::channel();

        registry.register(token, PendingCallback::Waiter(tx)).unwrap();
        assert_eq!(registry.pending_count(), 1);

        assert!(registry.resolve(token, Ok(json!("pong"))));
        assert_eq!(registry.pending_count(), 0);

        let delivered = rx.try_recv().unwrap().unwrap();
        assert_eq!(delivered, json!("pong"));
    }

    #[test]
    fn duplicate_token_rejected() {
        let registry = CallbackRegistry::new();
        let token = CallbackToken::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();

        registry.register(token, PendingCallback::Waiter(tx1)).unwrap();
        let err = registry
            .register(token, PendingCallback::Waiter(tx2))
            .unwrap_err();
        assert_eq!(err.code(), "BRIDGE_DUPLICATE_TOKEN");
        // The original entry survives
        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn resolve_unknown_token_is_noop() {
        let registry = CallbackRegistry::new();
        assert!(!registry.resolve(CallbackToken::new(), Ok(Value::Null)));
    }

    #[test]
    fn expire_unknown_token_is_noop() {
        let registry = CallbackRegistry::new();
        assert!(!registry.expire(CallbackToken::new()));
    }

    #[test]
    fn resolve_after_expire_is_dropped() {
        let registry = CallbackRegistry::new();
        let token = CallbackToken::new();
        let (tx, mut rx) = oneshot::channel();

        registry.register(token, PendingCallback::Waiter(tx)).unwrap();
        assert!(registry.expire(token));

        // Late reply: no delivery, no panic
        assert!(!registry.resolve(token, Ok(json!("late"))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn distinct_tokens_never_cross() {
        let registry = CallbackRegistry::new();
        let t1 = CallbackToken::new();
        let t2 = CallbackToken::new();
        let (tx1, mut rx1) = oneshot::channel();
        let (tx2, mut rx2) = oneshot::channel();

        registry.register(t1, PendingCallback::Waiter(tx1)).unwrap();
        registry.register(t2, PendingCallback::Waiter(tx2)).unwrap();

        assert!(registry.resolve(t1, Ok(json!("one"))));

        assert_eq!(rx1.try_recv().unwrap().unwrap(), json!("one"));
        assert!(rx2.try_recv().is_err());
        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn engine_failure_wrapped_preserving_payload() {
        let registry = CallbackRegistry::new();
        let token = CallbackToken::new();
        let (tx, mut rx) = oneshot::channel();

        registry.register(token, PendingCallback::Waiter(tx)).unwrap();
        registry.resolve(token, Err(json!({"code": "BUSY", "retry_in_ms": 50})));

        let err = rx.try_recv().unwrap().unwrap_err();
        assert_eq!(err.code(), "BRIDGE_ENGINE");
        if let BridgeError::Engine(payload) = err {
            assert_eq!(payload["code"], "BUSY");
            assert_eq!(payload["retry_in_ms"], 50);
        } else {
            panic!("expected Engine variant");
        }
    }

    #[test]
    fn callback_style_delivery() {
        let registry = CallbackRegistry::new();
        let token = CallbackToken::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count2 = Arc::clone(&count);
        registry
            .register(
                token,
                PendingCallback::Callback(Box::new(move |outcome| {
                    assert_eq!(outcome.unwrap(), json!(7));
                    count2.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();

        assert!(registry.resolve(token, Ok(json!(7))));
        // Second delivery for the same token is a no-op
        assert!(!registry.resolve(token, Ok(json!(8))));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fail_reaches_callback() {
        let registry = CallbackRegistry::new();
        let token = CallbackToken::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count2 = Arc::clone(&count);
        registry
            .register(
                token,
                PendingCallback::Callback(Box::new(move |outcome| {
                    assert_eq!(outcome.unwrap_err().code(), "BRIDGE_PROTOCOL");
                    count2.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();

        assert!(registry.fail(token, BridgeError::Protocol("bad envelope".into())));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_may_register_reentrantly() {
        // The callback runs after the map lock is released, so it can
        // register a follow-up token without deadlocking.
        let registry = Arc::new(CallbackRegistry::new());
        let token = CallbackToken::new();
        let follow_up = CallbackToken::new();

        let registry2 = Arc::clone(&registry);
        registry
            .register(
                token,
                PendingCallback::Callback(Box::new(move |_| {
                    let (tx, _rx) = oneshot::channel();
                    registry2
                        .register(follow_up, PendingCallback::Waiter(tx))
                        .unwrap();
                })),
            )
            .unwrap();

        assert!(registry.resolve(token, Ok(Value::Null)));
        assert_eq!(registry.pending_count(), 1);
    }
}
