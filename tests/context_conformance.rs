//! Context tree conformance tests.
//!
//! Interaction of the context tree with abort scopes: inherited values and
//! deadlines, cancellation observed mid-scope, and checkpoint flow.

mod common;

use abortscope::{run_with_context, CancelKind, CancelReason, Cancelled, Context};
use common::init_test_logging;
use std::time::{Duration, Instant};

#[derive(Debug, PartialEq)]
struct Boom(&'static str);

#[derive(Debug, PartialEq)]
enum WorkError {
    Cancelled(CancelReason),
}

impl From<Cancelled> for WorkError {
    fn from(cancelled: Cancelled) -> Self {
        Self::Cancelled(cancelled.reason)
    }
}

#[test]
fn boundary_context_rides_the_parent_tree() {
    init_test_logging();

    #[derive(Debug, PartialEq)]
    struct Tenant(&'static str);

    let deadline = Instant::now() + Duration::from_secs(3600);
    let (parent, _handle) = Context::background().with_deadline(deadline);
    let parent = parent.with_value(Tenant("acme"));

    let outcome: Result<(), Boom> = run_with_context(&parent, |cx| {
        assert_eq!(cx.value::<Tenant>().as_deref(), Some(&Tenant("acme")));
        assert_eq!(cx.deadline(), Some(deadline));
        assert!(!cx.is_cancelled());
    });

    assert_eq!(outcome, Ok(()));
}

#[test]
fn cancellation_mid_scope_is_observable() {
    init_test_logging();

    let (parent, handle) = Context::background().with_cancel();

    let outcome: Result<(), Boom> = run_with_context(&parent, |cx| {
        assert!(cx.checkpoint().is_ok());

        handle.cancel_with(CancelReason::user("drain"));

        assert!(cx.is_cancelled());
        assert_eq!(cx.cancel_reason(), Some(CancelReason::user("drain")));
        assert_eq!(
            cx.checkpoint(),
            Err(Cancelled::new(CancelReason::user("drain")))
        );
    });

    assert_eq!(outcome, Ok(()));
}

#[test]
fn expired_deadline_surfaces_with_deadline_kind() {
    init_test_logging();

    let (parent, _handle) = Context::background().with_timeout(Duration::ZERO);

    let outcome: Result<(), WorkError> = run_with_context(&parent, |cx| {
        cx.throw_if_cancelled();
        unreachable!("deadline already expired");
    });

    assert_eq!(
        outcome,
        Err(WorkError::Cancelled(CancelReason::new(CancelKind::Deadline)))
    );
}

#[test]
fn scope_layers_never_leak_into_the_parent() {
    init_test_logging();

    let parent = Context::background();

    let outcome: Result<(), Boom> = run_with_context(&parent, |cx| {
        assert!(!cx.context().ptr_eq(&parent));
    });

    assert_eq!(outcome, Ok(()));
    assert!(!parent.is_cancelled());
    assert!(parent.deadline().is_none());
}
