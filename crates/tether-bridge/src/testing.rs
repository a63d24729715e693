//! In-memory transport for tests and demos.
//!
//! [`LoopbackTransport`] implements [`Transport`] without an engine on
//! the other side: invocations are recorded, attributes live in a map,
//! and a failure toggle simulates a broken link. Tests drive the
//! engine's half of the conversation themselves by feeding replies and
//! events back through the bridge's delivery entry points.

use crate::transport::{InvokeArgs, Transport};
use crate::BridgeError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tether_types::CallbackToken;

/// A recorded outbound invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentInvocation {
    /// Operation name.
    pub name: String,
    /// Named arguments as sent.
    pub args: InvokeArgs,
    /// Correlation token, when the caller expects a reply.
    pub token: Option<CallbackToken>,
}

/// Recording in-memory [`Transport`].
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    sent: Mutex<Vec<SentInvocation>>,
    attributes: Mutex<HashMap<String, String>>,
    write_counts: Mutex<HashMap<String, usize>>,
    failing: AtomicBool,
}

impl LoopbackTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles send failure. While `true`, every outbound call fails
    /// with [`BridgeError::Transport`] and records nothing.
    pub fn fail_next_sends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns a snapshot of all recorded invocations, oldest first.
    #[must_use]
    pub fn sent_invocations(&self) -> Vec<SentInvocation> {
        self.sent.lock().clone()
    }

    /// Returns the current value of `name`, if set.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.lock().get(name).cloned()
    }

    /// Returns how many successful writes `name` has received.
    #[must_use]
    pub fn attribute_writes(&self, name: &str) -> usize {
        self.write_counts.lock().get(name).copied().unwrap_or(0)
    }

    fn check_link(&self) -> Result<(), BridgeError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BridgeError::Transport("loopback link down".to_string()));
        }
        Ok(())
    }
}

impl Transport for LoopbackTransport {
    fn send_invocation(
        &self,
        name: &str,
        args: InvokeArgs,
        token: Option<CallbackToken>,
    ) -> Result<(), BridgeError> {
        self.check_link()?;
        self.sent.lock().push(SentInvocation {
            name: name.to_string(),
            args,
            token,
        });
        Ok(())
    }

    fn set_attribute(&self, name: &str, value: Option<&str>) -> Result<(), BridgeError> {
        self.check_link()?;
        match value {
            Some(v) => {
                self.attributes.lock().insert(name.to_string(), v.to_string());
            }
            None => {
                self.attributes.lock().remove(name);
            }
        }
        *self.write_counts.lock().entry(name.to_string()).or_insert(0) += 1;
        Ok(())
    }

    fn get_attribute(&self, name: &str) -> Option<String> {
        self.attributes.lock().get(name).cloned()
    }
}
