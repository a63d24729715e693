//! Bridge configuration.
//!
//! [`BridgeConfig`] wires the data-driven parts of the bridge: which
//! engine operation starts a task, which attribute mirrors the shared
//! value, and which event/attribute pair forms the reactive
//! subscription.
//!
//! # Design
//!
//! Instead of one bridge type per widget flavor, behavioral variation
//! is expressed through configuration. A confetti-style widget and a
//! slider-style widget differ only in the names they configure here.
//!
//! # Example
//!
//! ```
//! use tether_bridge::BridgeConfig;
//!
//! let config = BridgeConfig::default()
//!     .with_shared_value("value", "changed")
//!     .with_reactive_event("tick", "tick_enabled");
//!
//! assert_eq!(config.shared_attribute(), "value");
//! assert_eq!(config.reactive_event(), "tick");
//! ```

use serde::{Deserialize, Serialize};

/// Configuration for an [`EngineBridge`](crate::EngineBridge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Engine operation invoked by `start_task`.
    task_start_operation: String,
    /// Attribute mirroring the shared value.
    shared_attribute: String,
    /// Engine event announcing an engine-side shared-value change.
    shared_change_event: String,
    /// Engine event governed by the reactive subscription.
    reactive_event: String,
    /// Boolean attribute the engine watches to enable the reactive
    /// event source.
    reactive_attribute: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            task_start_operation: "start_task".to_string(),
            shared_attribute: "value".to_string(),
            shared_change_event: "changed".to_string(),
            reactive_event: "tick".to_string(),
            reactive_attribute: "tick_enabled".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Sets the engine operation that starts a long-running task.
    #[must_use]
    pub fn with_task_start_operation(mut self, operation: impl Into<String>) -> Self {
        self.task_start_operation = operation.into();
        self
    }

    /// Sets the shared-value wiring: the mirrored attribute name and
    /// the engine event that announces engine-side changes.
    #[must_use]
    pub fn with_shared_value(
        mut self,
        attribute: impl Into<String>,
        change_event: impl Into<String>,
    ) -> Self {
        self.shared_attribute = attribute.into();
        self.shared_change_event = change_event.into();
        self
    }

    /// Sets the reactive subscription wiring: the governed event name
    /// and the boolean enable attribute the engine observes.
    #[must_use]
    pub fn with_reactive_event(
        mut self,
        event: impl Into<String>,
        enable_attribute: impl Into<String>,
    ) -> Self {
        self.reactive_event = event.into();
        self.reactive_attribute = enable_attribute.into();
        self
    }

    /// Returns the task start operation name.
    #[must_use]
    pub fn task_start_operation(&self) -> &str {
        &self.task_start_operation
    }

    /// Returns the shared-value attribute name.
    #[must_use]
    pub fn shared_attribute(&self) -> &str {
        &self.shared_attribute
    }

    /// Returns the shared-value change event name.
    #[must_use]
    pub fn shared_change_event(&self) -> &str {
        &self.shared_change_event
    }

    /// Returns the reactive event name.
    #[must_use]
    pub fn reactive_event(&self) -> &str {
        &self.reactive_event
    }

    /// Returns the reactive enable attribute name.
    #[must_use]
    pub fn reactive_attribute(&self) -> &str {
        &self.reactive_attribute
    }
}
