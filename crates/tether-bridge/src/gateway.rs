//! Invocation gateway - named calls into the engine.
//!
//! The gateway is the outbound half of the bridge: it mints a
//! correlation token, registers the consumer with the
//! [`CallbackRegistry`], and only then hands the request to the
//! transport. Pre-registration closes the race between "request sent"
//! and "callback ready" - the reply cannot arrive before the consumer
//! exists.
//!
//! # Calling Conventions
//!
//! | Mode | Returns | Reply handling |
//! |------|---------|----------------|
//! | fire-and-forget | immediately, `Value::Null` | none expected |
//! | wait, no timeout | when the reply arrives | delivered inline |
//! | wait with timeout | reply or [`BridgeError::Timeout`] | late reply dropped |
//! | callback | immediately, token | delivered via stored callback |
//!
//! Waiting suspends only the calling task. Reception runs on whatever
//! context feeds the router, so one blocked caller never stalls the
//! delivery of unrelated replies or events.

use crate::registry::{CallbackRegistry, PendingCallback, ReplyCallback};
use crate::transport::{InvokeArgs, Transport};
use crate::BridgeError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Gateway for named engine invocations.
///
/// Cheap to clone pieces (both fields are `Arc`s); owned by the
/// [`EngineBridge`](crate::EngineBridge) facade.
pub struct InvocationGateway {
    transport: Arc<dyn Transport>,
    registry: Arc<CallbackRegistry>,
}

impl InvocationGateway {
    /// Creates a gateway over the given transport and registry.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, registry: Arc<CallbackRegistry>) -> Self {
        Self {
            transport,
            registry,
        }
    }

    /// Invokes a named engine operation.
    ///
    /// With `wait = false` the request is dispatched and the call
    /// returns `Value::Null` immediately; `timeout` is ignored. With
    /// `wait = true` the caller suspends until the reply arrives, or
    /// until `timeout` (when set) elapses.
    ///
    /// A correlation token is minted and transmitted even for simple
    /// waited calls whose engine-side operation ignores it; the reply
    /// envelope echoes it back so the router can find this caller.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Timeout`] - deadline elapsed; carries the
    ///   operation name and the configured timeout. The pending entry
    ///   is expired, so a late reply is dropped, never delivered.
    /// - [`BridgeError::Engine`] - the engine reported a structured
    ///   failure; the payload is preserved verbatim.
    /// - [`BridgeError::Protocol`] - the reply did not match the
    ///   envelope contract.
    /// - [`BridgeError::Transport`] - delivery failed.
    pub async fn invoke(
        &self,
        operation: &str,
        args: InvokeArgs,
        wait: bool,
        timeout: Option<Duration>,
    ) -> Result<Value, BridgeError> {
        if !wait {
            self.transport.send_invocation(operation, args, None)?;
            tracing::debug!(operation, "fire-and-forget invocation dispatched");
            return Ok(Value::Null);
        }

        let token = tether_types::CallbackToken::new();
        let (tx, rx) = oneshot::channel();
        self.registry.register(token, PendingCallback::Waiter(tx))?;

        if let Err(e) = self.transport.send_invocation(operation, args, Some(token)) {
            // Request never left; reclaim the entry before surfacing.
            self.registry.expire(token);
            return Err(e);
        }
        tracing::debug!(operation, %token, "waited invocation dispatched");

        match timeout {
            None => rx.await.unwrap_or_else(|_| {
                Err(BridgeError::Transport("reply channel closed".to_string()))
            }),
            Some(deadline) => match tokio::time::timeout(deadline, rx).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(_)) => Err(BridgeError::Transport("reply channel closed".to_string())),
                Err(_) => {
                    // Expire first so a reply racing the deadline is
                    // dropped instead of waking a stale waiter.
                    self.registry.expire(token);
                    tracing::debug!(operation, %token, ?deadline, "invocation timed out");
                    Err(BridgeError::Timeout {
                        operation: operation.to_string(),
                        timeout: deadline,
                    })
                }
            },
        }
    }

    /// Dispatches an invocation whose reply is delivered later through
    /// `callback`.
    ///
    /// The callback fires exactly once with the reply, an engine
    /// failure, or a bridge-level error. If the transport rejects the
    /// request outright, the error is routed through the callback as
    /// well - callers registered a delivery channel and get exactly one
    /// delivery on it, never zero.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DuplicateToken`] only on token reuse,
    /// which cannot happen with freshly minted tokens.
    pub fn invoke_with_callback(
        &self,
        operation: &str,
        args: InvokeArgs,
        callback: ReplyCallback,
    ) -> Result<tether_types::CallbackToken, BridgeError> {
        let token = tether_types::CallbackToken::new();
        self.registry
            .register(token, PendingCallback::Callback(callback))?;

        if let Err(e) = self.transport.send_invocation(operation, args, Some(token)) {
            // Surface the failure through the registered callback.
            self.registry.fail(token, e);
            return Ok(token);
        }
        tracing::debug!(operation, %token, "callback invocation dispatched");
        Ok(token)
    }
}

impl std::fmt::Debug for InvocationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationGateway")
            .field("registry", &self.registry)
            .finish()
    }
}
