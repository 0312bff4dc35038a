//! Abortscope: structured, non-local error exits over a cancellable context tree.
//!
//! # Overview
//!
//! Deeply nested call chains usually pay an error-forwarding tax: every
//! intermediate function checks a `Result` and returns early. Abortscope
//! collapses that into a single call. Code running inside an abort scope
//! receives a [`Cx`] and may call [`Cx::throw`] at any depth; the stack
//! unwinds straight to the scope's boundary, every `Drop` along the way
//! runs as on a normal return, and the boundary hands the error back as an
//! ordinary [`Result`].
//!
//! # Core Guarantees
//!
//! - **First error wins**: `throw` transfers control to the nearest matching
//!   boundary immediately; no intermediate frame sees or forwards the error
//! - **Cleanup always runs**: unwinding drives `Drop` in reverse declaration
//!   order, exactly as on a normal return
//! - **Defects stay loud**: a boundary intercepts only its own abort signal;
//!   every other panic is re-raised unchanged and keeps crashing the process
//! - **Context-aware**: each scope rides on a [`Context`] tree carrying
//!   cancellation, deadlines, and typed values, and can be recovered from
//!   any context derived from it
//!
//! # Example
//!
//! ```
//! use abortscope::{run, Cx};
//!
//! #[derive(Debug, PartialEq)]
//! struct ParseError(&'static str);
//!
//! fn parse(cx: &Cx<ParseError>, input: &str) -> u32 {
//!     match input.parse() {
//!         Ok(n) => n,
//!         Err(_) => cx.throw(ParseError("not a number")),
//!     }
//! }
//!
//! let ok: Result<u32, ParseError> = run(|cx| parse(cx, "42"));
//! assert_eq!(ok, Ok(42));
//!
//! let err: Result<u32, ParseError> = run(|cx| parse(cx, "nope"));
//! assert_eq!(err, Err(ParseError("not a number")));
//! ```
//!
//! # Panic Strategy
//!
//! The abort transfer reuses the native unwinder, so the crate requires
//! `panic = "unwind"` (the default). Under `panic = "abort"` a `throw`
//! terminates the process instead of reaching its boundary.
//!
//! # Module Structure
//!
//! - [`context`]: the cancellable, value-carrying context tree
//! - [`cx`]: abort-capable context and boundary runners
//! - [`tracing_compat`]: structured logging shim (no-op unless the
//!   `tracing-integration` feature is enabled)

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_inception)]
#![allow(clippy::module_name_repetitions)]

pub mod context;
pub mod cx;
pub mod tracing_compat;

pub use context::{CancelHandle, CancelKind, CancelReason, Cancelled, Context};
pub use cx::{run, run_with_context, Cx};
