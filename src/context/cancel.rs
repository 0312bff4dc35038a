//! Cancellation reason and kind types.
//!
//! Cancellation in the context tree is attributed, not silent: every
//! cancelled layer records why it was cancelled, and the reason is
//! observable from every context derived below that layer.

use core::fmt;
use thiserror::Error;

/// The kind of cancellation affecting a context layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CancelKind {
    /// Explicit cancellation requested through a [`CancelHandle`].
    ///
    /// [`CancelHandle`]: crate::context::CancelHandle
    User,
    /// The layer's deadline passed.
    Deadline,
}

impl CancelKind {
    /// Returns the severity of this cancellation kind.
    ///
    /// Deadline expiry outranks an explicit request when both describe the
    /// same layer.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::User => 0,
            Self::Deadline => 1,
        }
    }
}

impl fmt::Display for CancelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Deadline => write!(f, "deadline"),
        }
    }
}

/// The reason a context layer was cancelled, including kind and optional
/// message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReason {
    /// The kind of cancellation.
    pub kind: CancelKind,
    /// Optional human-readable message (static for determinism).
    pub message: Option<&'static str>,
}

impl CancelReason {
    /// Creates a new cancellation reason with the given kind.
    #[must_use]
    pub const fn new(kind: CancelKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Creates a user cancellation reason with a message.
    #[must_use]
    pub const fn user(message: &'static str) -> Self {
        Self {
            kind: CancelKind::User,
            message: Some(message),
        }
    }

    /// Creates a deadline cancellation reason.
    #[must_use]
    pub const fn deadline() -> Self {
        Self::new(CancelKind::Deadline)
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message {
            Some(message) => write!(f, "{}: {message}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Error observed when an operation runs against a cancelled context.
///
/// Returned by [`Context::checkpoint`](crate::context::Context::checkpoint);
/// convertible into user error types so it can be thrown through an abort
/// scope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("context cancelled: {reason}")]
pub struct Cancelled {
    /// The recorded cancellation reason.
    pub reason: CancelReason,
}

impl Cancelled {
    /// Creates a cancellation error from the recorded reason.
    #[must_use]
    pub const fn new(reason: CancelReason) -> Self {
        Self { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_outranks_user() {
        assert!(CancelKind::Deadline.severity() > CancelKind::User.severity());
    }

    #[test]
    fn display_includes_message() {
        let reason = CancelReason::user("shutting down");
        assert_eq!(reason.to_string(), "user: shutting down");
        assert_eq!(CancelReason::deadline().to_string(), "deadline");
    }

    #[test]
    fn cancelled_error_formats_reason() {
        let err = Cancelled::new(CancelReason::user("drain"));
        assert_eq!(err.to_string(), "context cancelled: user: drain");
    }
}
