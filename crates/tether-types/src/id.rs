//! Identifier types for the Tether bridge.
//!
//! All identifiers are UUID-based so they survive the serialization
//! boundary between the front-end and the engine process unchanged.

use serde::{Deserialize, Serialize};
use uuid::{uuid, Uuid};

/// Tether namespace UUID for deterministic UUID v5 generation.
///
/// Used as the namespace for deriving stable UUIDs for well-known
/// control names via UUID v5 (SHA-1 based).
const TETHER_NAMESPACE: Uuid = uuid!("7b1f9c4e-2d35-4f8a-9b6e-c03a518f2d71");

/// Identity of a front-end control node.
///
/// A control is the front-end owner of one bridge instance. Its
/// identity travels with shared-value change notifications so that
/// downstream code can attribute a change to the node that emitted it.
///
/// # UUID Strategy
///
/// - **Well-known controls**: UUID v5, deterministic from the name
/// - **Ad-hoc controls**: UUID v4, random per instance
///
/// Deterministic UUIDs let the engine and the front-end agree on the
/// identity of a named control without a registration round-trip.
///
/// # Example
///
/// ```
/// use tether_types::ControlId;
///
/// // Well-known: deterministic UUID
/// let a = ControlId::named("confetti");
/// let b = ControlId::named("confetti");
/// assert_eq!(a, b);
///
/// // Ad-hoc: random UUID per instance
/// let c = ControlId::new("demo", "confetti");
/// let d = ControlId::new("demo", "confetti");
/// assert_ne!(c, d);
/// assert_eq!(c.qualified_name(), d.qualified_name());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlId {
    /// Globally unique identifier.
    pub uuid: Uuid,
    /// Namespace (e.g., "widget", "demo").
    pub namespace: String,
    /// Control name within the namespace.
    pub name: String,
}

impl ControlId {
    /// Creates a new [`ControlId`] with a random UUID v4.
    ///
    /// Use this for ad-hoc controls where each instance should carry
    /// a unique identity.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Creates a well-known control ID with a deterministic UUID v5.
    ///
    /// The UUID is derived from the Tether namespace UUID and the
    /// control name, so the same name always produces the same UUID
    /// across processes and machines.
    ///
    /// # Example
    ///
    /// ```
    /// use tether_types::ControlId;
    ///
    /// let c1 = ControlId::named("confetti");
    /// let c2 = ControlId::named("confetti");
    /// let s = ControlId::named("slider");
    ///
    /// assert_eq!(c1.uuid, c2.uuid);
    /// assert_ne!(c1.uuid, s.uuid);
    /// ```
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            uuid: Uuid::new_v5(&TETHER_NAMESPACE, name.as_bytes()),
            namespace: "widget".to_string(),
            name,
        }
    }

    /// Returns the qualified name in `namespace::name` format.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.namespace, self.name)
    }

    /// Checks if this control matches the given namespace and name.
    #[must_use]
    pub fn matches(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }
}

impl std::fmt::Display for ControlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}@{}", self.namespace, self.name, self.uuid)
    }
}

/// Correlation token for a single pending invocation callback.
///
/// Generated by the caller **before** dispatch, so the callback is
/// registered by the time the engine can possibly reply. Each token is
/// consumed exactly once: by the matching reply, or by timeout expiry.
///
/// # Token Categories
///
/// Callback tokens and [`TaskToken`]s are distinct types on purpose.
/// The two registries can never be keyed with a token of the wrong
/// category, which makes cross-category collision structurally
/// impossible rather than merely improbable.
///
/// # Example
///
/// ```
/// use tether_types::CallbackToken;
///
/// let t1 = CallbackToken::new();
/// let t2 = CallbackToken::new();
/// assert_ne!(t1, t2);
/// assert!(t1.to_string().starts_with("cb:"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackToken(pub Uuid);

#[allow(clippy::new_without_default)] // Default intentionally not implemented - tokens must be minted explicitly at invocation time
impl CallbackToken {
    /// Creates a new [`CallbackToken`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

// NOTE: CallbackToken intentionally does NOT implement Default.
// A defaulted token would not be registered anywhere, so a reply
// carrying it could never be delivered. Mint tokens explicitly where
// the pending entry is registered.

impl std::fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cb:{}", self.0)
    }
}

/// Correlation token for one long-running engine task.
///
/// A task token identifies the stream of progress events and the single
/// terminal event belonging to one logical task. It stays live from
/// `start` until the terminal event retires its record.
///
/// # Example
///
/// ```
/// use tether_types::TaskToken;
///
/// let t = TaskToken::new();
/// assert!(t.to_string().starts_with("task:"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskToken(pub Uuid);

#[allow(clippy::new_without_default)] // Default intentionally not implemented - see CallbackToken rationale
impl TaskToken {
    /// Creates a new [`TaskToken`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for TaskToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task:{}", self.0)
    }
}

// Tests are in lib.rs as integration tests for the public API
