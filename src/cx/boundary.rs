//! Boundary runners: where an abort becomes an ordinary `Result`.
//!
//! [`run`] and [`run_with_context`] establish a fresh abort scope, invoke
//! caller-supplied logic with the scope's [`Cx`], and intercept the unwind
//! a [`Cx::throw`] started. Interception is exact: the boundary consumes
//! its own abort signal and nothing else. Any other unwind cause (an
//! assertion failure, an out-of-bounds access, an enclosing scope's signal
//! passing through) is re-raised unchanged and keeps crashing. There is
//! no blanket catch-all anywhere in the crate.

use crate::context::Context;
use crate::cx::cx::Cx;
use crate::tracing_compat::{debug, trace};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

/// Unwind payload of an intentional abort.
///
/// Pairs the crate-private type identity (the tag no foreign panic can
/// forge) with the user error. Created only by [`Cx::throw`]; consumed
/// exactly once by the nearest boundary whose error type matches; never
/// observed by user code.
pub(crate) struct AbortSignal<E> {
    pub(crate) err: E,
}

/// Runs `f` in a fresh abort scope over a background context.
///
/// Equivalent to [`run_with_context`] with [`Context::background`]: no
/// cancellation, no deadline, no inherited values.
///
/// # Errors
///
/// Returns the thrown error if `f` (or anything it calls) aborted the
/// scope.
pub fn run<T, E, F>(f: F) -> Result<T, E>
where
    F: FnOnce(&Cx<E>) -> T,
    E: Send + 'static,
{
    run_with_context(&Context::background(), f)
}

/// Runs `f` in a fresh abort scope derived from `parent`.
///
/// The scope's context is a child of `parent` and inherits its
/// cancellation state, deadline, and values; the scope registers itself on
/// that child so [`Cx::from_context`] recovers it from any further
/// derivation. `f` runs under an interceptor that:
///
/// - returns `Ok(value)` when `f` completes normally,
/// - returns `Err(err)` when the unwind cause is this scope's own abort
///   signal,
/// - re-raises any other unwind cause unchanged. A genuine defect is never
///   masked as a normal error return.
///
/// # Errors
///
/// Returns the thrown error if `f` (or anything it calls) aborted the
/// scope.
pub fn run_with_context<T, E, F>(parent: &Context, f: F) -> Result<T, E>
where
    F: FnOnce(&Cx<E>) -> T,
    E: Send + 'static,
{
    let cx = Cx::new_scope(parent);
    trace!(error_type = %std::any::type_name::<E>(), "entering abort scope");
    match catch_unwind(AssertUnwindSafe(|| f(&cx))) {
        Ok(value) => {
            trace!(error_type = %std::any::type_name::<E>(), "abort scope completed normally");
            Ok(value)
        }
        Err(payload) => match payload.downcast::<AbortSignal<E>>() {
            Ok(signal) => {
                debug!(error_type = %std::any::type_name::<E>(), "abort intercepted at boundary");
                Err(signal.err)
            }
            // Not ours: a defect, or an enclosing scope's signal. Keep it
            // unwinding.
            Err(payload) => resume_unwind(payload),
        },
    }
}
