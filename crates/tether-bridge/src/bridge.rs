//! The bridge facade.
//!
//! [`EngineBridge`] assembles the registry, gateway, multiplexer,
//! reconciler, subscription controller, and router into one object a
//! control implementation holds. Hosts wire two things:
//!
//! 1. give the bridge a [`Transport`] for the outbound direction, and
//! 2. feed every inbound engine message into
//!    [`on_engine_message`](EngineBridge::on_engine_message).
//!
//! Everything else - correlation, timeouts, task streams, shared-value
//! reconciliation - happens behind the facade.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tether_bridge::testing::LoopbackTransport;
//! use tether_bridge::{BridgeConfig, ControlId, EngineBridge};
//!
//! let transport = Arc::new(LoopbackTransport::new());
//! let bridge = EngineBridge::new(
//!     ControlId::named("confetti"),
//!     transport,
//!     BridgeConfig::default(),
//! );
//!
//! bridge.write_shared(Some("A".to_string())).unwrap();
//! assert_eq!(bridge.read_shared().as_deref(), Some("A"));
//! ```

use crate::attrs::AttributeCache;
use crate::gateway::InvocationGateway;
use crate::registry::{CallbackRegistry, ReplyCallback};
use crate::router::{EventRouter, RouteOutcome};
use crate::shared::{SharedState, SharedValueChanged};
use crate::subscription::ReactiveSubscription;
use crate::task::{TaskMultiplexer, TaskObserver};
use crate::transport::{InvokeArgs, Transport};
use crate::{BridgeConfig, BridgeError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tether_types::{CallbackToken, ControlId, TaskToken};

/// Invocation and event bridge for one control.
///
/// All methods take `&self`; the bridge is internally synchronized and
/// may be shared across tasks behind an `Arc`.
#[derive(Debug)]
pub struct EngineBridge {
    gateway: InvocationGateway,
    tasks: Arc<TaskMultiplexer>,
    shared: Arc<SharedState>,
    subscription: Arc<ReactiveSubscription>,
    attrs: AttributeCache,
    router: EventRouter,
}

impl EngineBridge {
    /// Builds a bridge for `control` over `transport`, wired per
    /// `config`.
    #[must_use]
    pub fn new(control: ControlId, transport: Arc<dyn Transport>, config: BridgeConfig) -> Self {
        let registry = Arc::new(CallbackRegistry::new());
        let gateway =
            InvocationGateway::new(Arc::clone(&transport), Arc::clone(&registry));
        let tasks = Arc::new(TaskMultiplexer::new(
            Arc::clone(&transport),
            config.task_start_operation(),
        ));
        let shared = Arc::new(SharedState::new(
            control,
            Arc::clone(&transport),
            config.shared_attribute(),
        ));
        let subscription = Arc::new(ReactiveSubscription::new(
            Arc::clone(&transport),
            config.reactive_attribute(),
        ));
        let attrs = AttributeCache::new(Arc::clone(&transport));
        let router = EventRouter::new(
            &config,
            registry,
            Arc::clone(&tasks),
            Arc::clone(&shared),
            Arc::clone(&subscription),
        );
        Self {
            gateway,
            tasks,
            shared,
            subscription,
            attrs,
            router,
        }
    }

    /// Invokes a named engine operation.
    ///
    /// See [`InvocationGateway::invoke`] for the calling conventions
    /// and error contract.
    ///
    /// # Errors
    ///
    /// Propagates [`BridgeError`] from the gateway.
    pub async fn invoke(
        &self,
        operation: &str,
        args: InvokeArgs,
        wait: bool,
        timeout: Option<Duration>,
    ) -> Result<Value, BridgeError> {
        self.gateway.invoke(operation, args, wait, timeout).await
    }

    /// Dispatches an invocation answered through `callback`.
    ///
    /// # Errors
    ///
    /// See [`InvocationGateway::invoke_with_callback`].
    pub fn invoke_with_callback(
        &self,
        operation: &str,
        args: InvokeArgs,
        callback: ReplyCallback,
    ) -> Result<CallbackToken, BridgeError> {
        self.gateway.invoke_with_callback(operation, args, callback)
    }

    /// Starts a long-running task and registers its observer.
    ///
    /// # Errors
    ///
    /// See [`TaskMultiplexer::start_task`].
    pub fn start_task(
        &self,
        total_steps: u64,
        observer: TaskObserver,
    ) -> Result<TaskToken, BridgeError> {
        self.tasks.start_task(total_steps, observer)
    }

    /// Subscribes to the reactive event source.
    ///
    /// # Errors
    ///
    /// See [`ReactiveSubscription::subscribe`].
    pub fn subscribe(
        &self,
        handler: impl FnMut(Value) + Send + 'static,
    ) -> Result<(), BridgeError> {
        self.subscription.subscribe(handler)
    }

    /// Detaches the reactive handler; the engine-side source stays on.
    pub fn unsubscribe(&self) {
        self.subscription.unsubscribe();
    }

    /// Reads the shared value.
    #[must_use]
    pub fn read_shared(&self) -> Option<String> {
        self.shared.read()
    }

    /// Writes the shared value optimistically and pushes it.
    ///
    /// # Errors
    ///
    /// See [`SharedState::write`].
    pub fn write_shared(&self, value: Option<String>) -> Result<(), BridgeError> {
        self.shared.write(value)
    }

    /// Registers the engine-change handler for the shared value.
    pub fn on_shared_changed(
        &self,
        handler: impl FnMut(&SharedValueChanged) + Send + 'static,
    ) {
        self.shared.on_changed(handler);
    }

    /// Registers a direct handler for the named event.
    pub fn on_event(&self, name: impl Into<String>, handler: impl FnMut(Value) + Send + 'static) {
        self.router.on_event(name, handler);
    }

    /// Removes the direct handler for the named event.
    pub fn off_event(&self, name: &str) {
        self.router.off_event(name);
    }

    /// Returns the typed attribute view.
    #[must_use]
    pub fn attrs(&self) -> &AttributeCache {
        &self.attrs
    }

    /// Inbound entry point: feed every engine message here.
    ///
    /// # Errors
    ///
    /// See [`EventRouter::dispatch`].
    pub fn on_engine_message(&self, name: &str, raw: &[u8]) -> Result<RouteOutcome, BridgeError> {
        self.router.dispatch(name, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::LoopbackTransport;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bridge() -> (EngineBridge, Arc<LoopbackTransport>) {
        let transport = Arc::new(LoopbackTransport::new());
        let bridge = EngineBridge::new(
            ControlId::named("confetti"),
            Arc::clone(&transport) as Arc<dyn Transport>,
            BridgeConfig::default(),
        );
        (bridge, transport)
    }

    #[test]
    fn shared_round_trip_through_facade() {
        let (bridge, transport) = bridge();
        bridge.write_shared(Some("A".to_string())).unwrap();
        assert_eq!(bridge.read_shared().as_deref(), Some("A"));
        assert_eq!(transport.attribute("value").as_deref(), Some("A"));
    }

    #[test]
    fn engine_message_reaches_shared_state() {
        let (bridge, _transport) = bridge();
        let outcome = bridge
            .on_engine_message("changed", br#"{"value": "B"}"#)
            .unwrap();
        assert_eq!(outcome, RouteOutcome::SharedChange);
        assert_eq!(bridge.read_shared().as_deref(), Some("B"));
    }

    #[test]
    fn typed_attributes_through_facade() {
        let (bridge, _transport) = bridge();
        bridge.attrs().set_f64("gravity", 9.8).unwrap();
        assert!((bridge.attrs().get_f64("gravity", 0.0) - 9.8).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn invocation_reply_round_trip() {
        let (bridge, transport) = bridge();
        let bridge = Arc::new(bridge);

        let replier = tokio::spawn({
            let bridge = Arc::clone(&bridge);
            let transport = Arc::clone(&transport);
            async move {
                loop {
                    if let Some(sent) = transport.sent_invocations().first().cloned() {
                        let token = sent.token.unwrap();
                        let raw = serde_json::to_vec(&json!({
                            "token": token.uuid().to_string(),
                            "ok": true,
                            "result": "pong",
                        }))
                        .unwrap();
                        bridge.on_engine_message("method_result", &raw).unwrap();
                        break;
                    }
                    tokio::task::yield_now().await;
                }
            }
        });

        let result = bridge
            .invoke("ping", InvokeArgs::new(), true, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        replier.await.unwrap();
        assert_eq!(result, json!("pong"));
    }

    #[test]
    fn task_stream_through_facade() {
        let (bridge, _transport) = bridge();
        let done = Arc::new(AtomicUsize::new(0));

        let done2 = Arc::clone(&done);
        let token = bridge
            .start_task(
                1,
                TaskObserver::new().on_complete(move |_| {
                    done2.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        let raw = serde_json::to_vec(&json!({
            "token": token.uuid().to_string(),
            "status": "complete",
        }))
        .unwrap();
        assert_eq!(
            bridge.on_engine_message("task_update", &raw).unwrap(),
            RouteOutcome::Task
        );
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
