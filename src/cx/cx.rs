//! The abort-capable context type.
//!
//! `Cx` is the token user code receives inside an abort scope. It composes
//! a [`Context`] (cancellation, deadline, and value queries are delegated
//! to it) with the abort operations: [`throw`](Cx::throw),
//! [`check`](Cx::check), and [`run_nested`](Cx::run_nested).
//!
//! # Participation Contract
//!
//! A function participates in an abort scope by accepting `&Cx<E>` as an
//! explicit parameter (or recovering one with [`Cx::from_context`]). It may
//! throw at any point; it must not intercept the unwind itself, since
//! interception belongs to the scope's boundary alone.
//!
//! # Thread Safety
//!
//! `Cx` is cheaply clonable; clones share scope identity, so a throw
//! through any clone lands at the same boundary. The semantic contract is
//! that a scope tracks one logical call stack: hand the `Cx` down by
//! parameter, not across task boundaries.

use crate::context::{CancelReason, Cancelled, Context};
use crate::cx::boundary::{self, AbortSignal};
use crate::tracing_compat::trace;
use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::panic::resume_unwind;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Shared state of one abort scope, attached to the scope's context so the
/// owning `Cx` can be recovered from any context derived below it.
pub(crate) struct ScopeCore<E> {
    /// The scope's own context node; recorded once at construction.
    ctx: OnceLock<Context>,
    _marker: PhantomData<fn(E) -> E>,
}

/// The abort-capable context for one scope.
///
/// Provides every query of the underlying [`Context`] plus the abort
/// operations. Constructed by [`run`](crate::run) /
/// [`run_with_context`](crate::run_with_context) / [`Cx::run_nested`], or
/// recovered from a derived context with [`Cx::from_context`].
///
/// The error type `E` identifies the scope: a boundary intercepts exactly
/// the aborts thrown with its own `E`, and an abort crossing a
/// differently-typed nested boundary passes through it untouched.
pub struct Cx<E> {
    ctx: Context,
    scope: Arc<ScopeCore<E>>,
}

impl<E: Send + 'static> Cx<E> {
    /// Builds a fresh scope as a child of `parent`, registering the scope
    /// state under its reserved typed key before user code can observe the
    /// context.
    pub(crate) fn new_scope(parent: &Context) -> Self {
        let core = Arc::new(ScopeCore {
            ctx: OnceLock::new(),
            _marker: PhantomData,
        });
        let ctx = parent.with_value_arc(Arc::clone(&core));
        core.ctx
            .set(ctx.clone())
            .expect("fresh scope registers its context exactly once");
        Self { ctx, scope: core }
    }

    /// Recovers the owning abort-capable context from any context derived
    /// from it.
    ///
    /// Deriving a cancellation, deadline, or value layer from a scope's
    /// context keeps a path back to the scope; this walks that path and
    /// reconstructs the `Cx`. The result shares the scope's identity: its
    /// context node is the boundary's own (see [`Context::ptr_eq`]).
    ///
    /// # Panics
    ///
    /// Panics if no abort scope with error type `E` exists in `ctx`'s
    /// ancestry. That is a usage defect (abort-throwing code running
    /// outside any established scope), not a runtime condition, so it is
    /// fatal rather than recoverable. The panic is not an abort signal;
    /// every boundary re-raises it and it crashes the process visibly.
    #[must_use]
    pub fn from_context(ctx: &Context) -> Self {
        let Some(core) = ctx.value::<ScopeCore<E>>() else {
            panic!(
                "context has no abort scope of error type `{}` in its ancestry; \
                 derive the context from run()/run_nested()",
                type_name::<E>()
            );
        };
        let scope_ctx = core
            .ctx
            .get()
            .expect("scope context recorded at construction")
            .clone();
        Self {
            ctx: scope_ctx,
            scope: core,
        }
    }

    /// Aborts the scope with `err`.
    ///
    /// Control transfers immediately to the nearest enclosing boundary
    /// with error type `E`: no statement after this call runs, and no
    /// intermediate frame observes the error. Locals in the unwound frames
    /// are dropped exactly as on a normal return. The transfer rides the
    /// native unwinder without touching the panic hook, so an intercepted
    /// abort prints nothing.
    ///
    /// Throwing with no enclosing boundary (or under `panic = "abort"`) is
    /// a usage defect and terminates the process.
    pub fn throw(&self, err: E) -> ! {
        trace!(error_type = %type_name::<E>(), "throwing through abort scope");
        resume_unwind(Box::new(AbortSignal { err }))
    }

    /// Unwraps `res`, aborting the scope on `Err`.
    ///
    /// The bridge from fallible calls into an abort scope: `Ok(v)` passes
    /// `v` through untouched, `Err(e)` throws `e`. No error means no
    /// unwinding.
    pub fn check<T>(&self, res: Result<T, E>) -> T {
        match res {
            Ok(value) => value,
            Err(err) => self.throw(err),
        }
    }

    /// Throws the recorded cancellation if this scope's context (or any
    /// ancestor) is cancelled; otherwise returns.
    pub fn throw_if_cancelled(&self)
    where
        E: From<Cancelled>,
    {
        if let Err(cancelled) = self.ctx.checkpoint() {
            self.throw(E::from(cancelled));
        }
    }

    /// Runs `f` in its own isolated abort scope, derived from this one.
    ///
    /// The nested scope's context is a child of the current context and
    /// inherits its cancellation state, deadline, and values. An abort
    /// thrown inside `f` is fully contained: it surfaces here as `Err` and
    /// never reaches this scope's own boundary. The caller can recover,
    /// retry, or escalate by throwing again.
    ///
    /// The nested error type may differ from the outer one; it defaults to
    /// it under inference.
    ///
    /// # Errors
    ///
    /// Returns the thrown error if `f` (or anything it calls) aborted the
    /// nested scope.
    pub fn run_nested<T, E2, F>(&self, f: F) -> Result<T, E2>
    where
        F: FnOnce(&Cx<E2>) -> T,
        E2: Send + 'static,
    {
        boundary::run_with_context(&self.ctx, f)
    }

    /// Returns the underlying context node.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Returns whether the scope's context or any ancestor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.ctx.is_cancelled()
    }

    /// Returns the nearest recorded cancellation reason, if any.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.ctx.cancel_reason()
    }

    /// Returns the earliest deadline in the context ancestry, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.ctx.deadline()
    }

    /// Looks up the nearest value of type `V` in the context ancestry.
    #[must_use]
    pub fn value<V>(&self) -> Option<Arc<V>>
    where
        V: Any + Send + Sync,
    {
        self.ctx.value::<V>()
    }

    /// Returns `Ok(())` while the context is live, or the recorded
    /// cancellation as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] once the context or any ancestor is
    /// cancelled.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        self.ctx.checkpoint()
    }
}

impl<E> Clone for Cx<E> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            scope: Arc::clone(&self.scope),
        }
    }
}

impl<E> fmt::Debug for Cx<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cx")
            .field("error_type", &type_name::<E>())
            .field("context", &self.ctx)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cx::boundary::run;

    #[derive(Debug, PartialEq)]
    struct Boom(&'static str);

    #[test]
    fn lookup_after_derivation_recovers_scope_identity() {
        let outcome: Result<(), Boom> = run(|cx| {
            let (derived, _handle) = cx.context().with_cancel();
            let recovered = Cx::<Boom>::from_context(&derived);
            assert!(recovered.context().ptr_eq(cx.context()));
        });
        assert_eq!(outcome, Ok(()));
    }

    #[test]
    fn clones_share_scope() {
        let outcome: Result<(), Boom> = run(|cx| {
            let clone = cx.clone();
            assert!(clone.context().ptr_eq(cx.context()));
        });
        assert_eq!(outcome, Ok(()));
    }

    #[test]
    #[should_panic(expected = "no abort scope")]
    fn lookup_without_scope_is_fatal() {
        let _ = Cx::<Boom>::from_context(&Context::background());
    }

    #[test]
    fn check_passes_ok_through_and_throws_err() {
        fn external(fail: bool) -> Result<u32, Boom> {
            if fail {
                Err(Boom("external"))
            } else {
                Ok(9)
            }
        }

        let ok: Result<u32, Boom> = run(|cx| cx.check(external(false)));
        assert_eq!(ok, Ok(9));

        let err: Result<u32, Boom> = run(|cx| cx.check(external(true)));
        assert_eq!(err, Err(Boom("external")));
    }
}
