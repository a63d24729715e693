//! Unified error interface for Tether crates.
//!
//! This module provides the [`ErrorCode`] trait that every Tether error
//! type implements, plus test helpers that keep error codes honest.
//!
//! # Design
//!
//! Errors that cross the bridge get flattened to strings on the wire,
//! so programmatic handling needs a stable machine-readable code next
//! to the human-readable message:
//!
//! - **Machine-readable codes**: stable strings for matching
//! - **Recoverability info**: whether a retry can possibly succeed
//!
//! # Example
//!
//! ```
//! use tether_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum SendError {
//!     Closed,
//!     Full,
//! }
//!
//! impl ErrorCode for SendError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Closed => "SEND_CLOSED",
//!             Self::Full => "SEND_FULL",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Full)
//!     }
//! }
//!
//! let err = SendError::Full;
//! assert_eq!(err.code(), "SEND_FULL");
//! assert!(err.is_recoverable());
//! ```

/// Unified error code interface.
///
/// # Code Format
///
/// Error codes should be:
///
/// - **UPPER_SNAKE_CASE**: e.g., `"BRIDGE_TIMEOUT"`
/// - **Layer-prefixed**: `"EVENT_"` for the event layer, `"BRIDGE_"`
///   for the runtime layer
/// - **Stable**: codes are an API contract and must not change once
///   published
///
/// # Recoverability
///
/// An error is recoverable if retrying the operation may succeed
/// (timeouts, transient transport failures). Malformed payloads and
/// invalid arguments are not: they will not change on retry.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether a retry of the failed operation may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows Tether conventions.
///
/// # Checks
///
/// 1. Code is UPPER_SNAKE_CASE
/// 2. Code starts with the expected layer prefix
/// 3. Code is not empty
///
/// # Panics
///
/// Panics with a descriptive message if validation fails.
///
/// # Example
///
/// ```
/// use tether_types::{assert_error_code, ErrorCode};
///
/// #[derive(Debug)]
/// enum MyError { Timeout }
///
/// impl ErrorCode for MyError {
///     fn code(&self) -> &'static str { "MY_TIMEOUT" }
///     fn is_recoverable(&self) -> bool { true }
/// }
///
/// assert_error_code(&MyError::Timeout, "MY_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();
    assert!(
        code.starts_with(expected_prefix),
        "error code '{code}' must start with prefix '{expected_prefix}'"
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE"
    );
}

/// Validates multiple error codes at once.
///
/// Use this to verify all variants of an error enum in one test.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('_')
        && !s.ends_with('_')
        && !s.contains("__")
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
