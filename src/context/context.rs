//! The cancellable, value-carrying context tree.
//!
//! A [`Context`] is an immutable node in a parent/child tree. Each
//! derivation adds exactly one layer: a cancellable layer
//! ([`Context::with_cancel`]), a deadline layer ([`Context::with_deadline`]),
//! or a typed value layer ([`Context::with_value`]). Queries walk the
//! ancestry lazily; nothing in the tree polls, blocks, or owns a timer
//! thread.
//!
//! # Propagation
//!
//! Cancellation flows strictly downward: cancelling a layer is observable
//! from that layer and every context derived below it, never from its
//! parents. Deadlines compose the same way; the effective deadline of a
//! context is the earliest one in its ancestry.
//!
//! # Thread Safety
//!
//! `Context` is `Send + Sync` and cheaply clonable (it wraps an `Arc`).
//! Clones share the same node, so a cancellation issued through a
//! [`CancelHandle`] is visible to all clones of the affected contexts.
//! The only mutable state is the write-once cancel cell of each layer.

use crate::context::cancel::{CancelKind, CancelReason, Cancelled};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// A node in the cancellable, value-carrying context tree.
///
/// The root is created with [`Context::background`]; every other node is
/// derived from a parent and inherits its cancellation state, deadline,
/// and values. Contexts are handed down call chains by reference and are
/// never mutated in place.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    parent: Option<Context>,
    cancel: Option<Arc<CancelCell>>,
    deadline: Option<Instant>,
    value: Option<(TypeId, Arc<dyn Any + Send + Sync>)>,
}

/// Write-once cancellation state of one cancellable layer.
#[derive(Debug, Default)]
struct CancelCell {
    reason: OnceLock<CancelReason>,
}

impl Context {
    /// Returns the root context: never cancelled, no deadline, no values.
    #[must_use]
    pub fn background() -> Self {
        Self {
            inner: Arc::new(Inner {
                parent: None,
                cancel: None,
                deadline: None,
                value: None,
            }),
        }
    }

    fn child(&self, cancel: Option<Arc<CancelCell>>, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                parent: Some(self.clone()),
                cancel,
                deadline,
                value: None,
            }),
        }
    }

    /// Derives a cancellable child layer.
    ///
    /// The returned [`CancelHandle`] cancels the child (and everything
    /// derived from it); the parent is unaffected. Abandoning the handle
    /// leaves the layer cancellable only through its ancestors.
    #[must_use]
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let cell = Arc::new(CancelCell::default());
        let ctx = self.child(Some(Arc::clone(&cell)), None);
        (ctx, CancelHandle { cell })
    }

    /// Derives a child layer that reports cancelled once `deadline` is
    /// reached.
    ///
    /// The layer is also explicitly cancellable through the returned
    /// handle; an explicit cancellation recorded before the deadline wins
    /// the attribution.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> (Self, CancelHandle) {
        let cell = Arc::new(CancelCell::default());
        let ctx = self.child(Some(Arc::clone(&cell)), Some(deadline));
        (ctx, CancelHandle { cell })
    }

    /// Derives a deadline layer `timeout` from now.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> (Self, CancelHandle) {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a child layer carrying one typed value.
    ///
    /// Lookup is keyed by the value's type, so a private type is a
    /// collision-free key. A value of the same type attached lower in the
    /// tree shadows this one for contexts derived below it.
    #[must_use]
    pub fn with_value<V>(&self, value: V) -> Self
    where
        V: Any + Send + Sync,
    {
        self.with_value_arc(Arc::new(value))
    }

    /// Attaches an already-shared value without re-wrapping it.
    pub(crate) fn with_value_arc<V>(&self, value: Arc<V>) -> Self
    where
        V: Any + Send + Sync,
    {
        Self {
            inner: Arc::new(Inner {
                parent: Some(self.clone()),
                cancel: None,
                deadline: None,
                value: Some((TypeId::of::<V>(), value)),
            }),
        }
    }

    /// Looks up the nearest value of type `V` in this context's ancestry.
    #[must_use]
    pub fn value<V>(&self) -> Option<Arc<V>>
    where
        V: Any + Send + Sync,
    {
        let mut node = Some(self);
        while let Some(ctx) = node {
            if let Some((type_id, value)) = &ctx.inner.value {
                if *type_id == TypeId::of::<V>() {
                    return Arc::downcast(Arc::clone(value)).ok();
                }
            }
            node = ctx.inner.parent.as_ref();
        }
        None
    }

    /// Returns whether this context or any of its ancestors is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_reason().is_some()
    }

    /// Returns the reason of the nearest cancelled layer in the ancestry,
    /// if any.
    ///
    /// Deadline layers are evaluated lazily against the current instant;
    /// an explicitly recorded reason on the same layer takes precedence.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        let now = Instant::now();
        let mut node = Some(self);
        while let Some(ctx) = node {
            if let Some(cell) = &ctx.inner.cancel {
                if let Some(reason) = cell.reason.get() {
                    return Some(reason.clone());
                }
            }
            if let Some(deadline) = ctx.inner.deadline {
                if now >= deadline {
                    return Some(CancelReason::deadline());
                }
            }
            node = ctx.inner.parent.as_ref();
        }
        None
    }

    /// Returns the earliest deadline in the ancestry, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        let mut earliest: Option<Instant> = None;
        let mut node = Some(self);
        while let Some(ctx) = node {
            if let Some(deadline) = ctx.inner.deadline {
                earliest = Some(match earliest {
                    Some(current) => current.min(deadline),
                    None => deadline,
                });
            }
            node = ctx.inner.parent.as_ref();
        }
        earliest
    }

    /// Returns `Ok(())` while the context is live, or the recorded
    /// cancellation as an error.
    ///
    /// Long-running code calls this at natural pause points and bails with
    /// `?` (or throws the error through an abort scope).
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] once this context or any ancestor is
    /// cancelled.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        match self.cancel_reason() {
            Some(reason) => Err(Cancelled::new(reason)),
            None => Ok(()),
        }
    }

    /// Returns whether two handles refer to the same context node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline())
            .finish_non_exhaustive()
    }
}

/// Cancels the context layer it was created with.
///
/// Cancellation is idempotent; the first recorded reason wins and later
/// calls are ignored.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cell: Arc<CancelCell>,
}

impl CancelHandle {
    /// Cancels the layer with [`CancelKind::User`] and no message.
    pub fn cancel(&self) {
        self.cancel_with(CancelReason::new(CancelKind::User));
    }

    /// Cancels the layer with an explicit reason.
    pub fn cancel_with(&self, reason: CancelReason) {
        let _ = self.cell.reason.set(reason);
    }

    /// Returns whether this layer itself recorded a cancellation.
    ///
    /// Ancestor cancellations are not visible here; query the context for
    /// the inherited state.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cell.reason.get().is_some()
    }
}
