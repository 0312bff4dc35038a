//! Cancellable, value-carrying context tree.
//!
//! The [`Context`] type is the substrate abort scopes ride on: a
//! hierarchical carrier of cancellation signals, deadlines, and typed
//! values. It performs no I/O, owns no timer threads, and evaluates every
//! query lazily by walking its ancestry.
//!
//! # Module Contents
//!
//! - [`Context`]: tree node with derivation and query operations
//! - [`CancelHandle`]: cancels the layer it was created with
//! - [`CancelKind`], [`CancelReason`]: cancellation attribution
//! - [`Cancelled`]: error form of an observed cancellation

pub mod cancel;
pub mod context;

pub use cancel::{CancelKind, CancelReason, Cancelled};
pub use context::{CancelHandle, Context};
