//! Typed attribute access.
//!
//! Attributes cross the boundary as strings. [`AttributeCache`] wraps
//! the transport's attribute store with typed getters so call sites
//! read `get_f64("gravity")` instead of parsing strings inline, and
//! with setters that render values back into the canonical wire form
//! (`"true"`/`"false"` for booleans, decimal for numbers).
//!
//! Unparseable values fall back to the caller's default rather than
//! erroring: a malformed attribute written by an older engine build
//! should degrade, not break the control.

use crate::transport::Transport;
use crate::BridgeError;
use std::sync::Arc;

/// Typed view over the transport's attribute store.
#[derive(Clone)]
pub struct AttributeCache {
    transport: Arc<dyn Transport>,
}

impl AttributeCache {
    /// Creates a typed view over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Reads a raw string attribute.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.transport.get_attribute(name)
    }

    /// Reads a boolean attribute; `default` if absent or unparseable.
    ///
    /// Accepts the wire forms `"true"`/`"false"` case-insensitively.
    #[must_use]
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.transport.get_attribute(name) {
            Some(s) => match s.to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => default,
            },
            None => default,
        }
    }

    /// Reads a float attribute; `default` if absent or unparseable.
    #[must_use]
    pub fn get_f64(&self, name: &str, default: f64) -> f64 {
        self.transport
            .get_attribute(name)
            .and_then(|s| s.parse().ok())
            .unwrap_or(default)
    }

    /// Reads an unsigned integer attribute; `default` if absent or
    /// unparseable.
    #[must_use]
    pub fn get_usize(&self, name: &str, default: usize) -> usize {
        self.transport
            .get_attribute(name)
            .and_then(|s| s.parse().ok())
            .unwrap_or(default)
    }

    /// Writes a string attribute; `None` clears it.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the push fails.
    pub fn set_str(&self, name: &str, value: Option<&str>) -> Result<(), BridgeError> {
        self.transport.set_attribute(name, value)
    }

    /// Writes a boolean attribute in wire form.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the push fails.
    pub fn set_bool(&self, name: &str, value: bool) -> Result<(), BridgeError> {
        self.transport
            .set_attribute(name, Some(if value { "true" } else { "false" }))
    }

    /// Writes a float attribute in decimal form.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the push fails.
    pub fn set_f64(&self, name: &str, value: f64) -> Result<(), BridgeError> {
        self.transport.set_attribute(name, Some(&value.to_string()))
    }

    /// Writes an unsigned integer attribute in decimal form.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the push fails.
    pub fn set_usize(&self, name: &str, value: usize) -> Result<(), BridgeError> {
        self.transport.set_attribute(name, Some(&value.to_string()))
    }
}

impl std::fmt::Debug for AttributeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AttributeCache")
    }
}
