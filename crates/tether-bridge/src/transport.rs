//! Transport seam between the bridge and the attribute/wire layer.
//!
//! The bridge never talks to the engine directly. Everything it sends
//! goes through [`Transport`], an external collaborator that owns
//! attribute storage/diffing and the actual process or network hop.
//! Everything it receives comes back through the router's
//! `on_engine_message` entry point, which the host registers with the
//! same layer.
//!
//! ```text
//! EngineBridge ──send_invocation/set_attribute──► Transport ──► engine
//!       ▲                                                         │
//!       └───────────── on_engine_message(name, bytes) ◄───────────┘
//! ```

use crate::BridgeError;
use std::collections::HashMap;
use tether_types::CallbackToken;

/// Named argument map for an invocation.
///
/// Arguments cross the boundary as strings; the engine re-parses typed
/// values on its side, exactly like attribute values do.
pub type InvokeArgs = HashMap<String, String>;

/// Outbound half of the serialization boundary.
///
/// Implementations are expected to be cheap to call and non-blocking:
/// `send_invocation` hands the request to the delivery machinery and
/// returns, it does not wait for the engine.
///
/// # Errors
///
/// All methods surface delivery failures as [`BridgeError::Transport`].
/// The bridge maps those onto the calling convention in use (returned
/// to blocking callers, delivered through the registered callback for
/// callback-style operations).
pub trait Transport: Send + Sync {
    /// Dispatches a named invocation to the engine.
    ///
    /// `token`, when present, is the correlation token the engine must
    /// echo back in its reply envelope. Fire-and-forget invocations
    /// pass `None`.
    fn send_invocation(
        &self,
        name: &str,
        args: InvokeArgs,
        token: Option<CallbackToken>,
    ) -> Result<(), BridgeError>;

    /// Pushes an attribute value to the engine.
    ///
    /// `None` clears the attribute.
    fn set_attribute(&self, name: &str, value: Option<&str>) -> Result<(), BridgeError>;

    /// Reads an attribute value from the attribute layer.
    fn get_attribute(&self, name: &str) -> Option<String>;
}
