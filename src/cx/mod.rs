//! Abort-capable context and boundary runners.
//!
//! The [`Cx`] type is the token that grants the abort capability inside a
//! scope; [`run`] and [`run_with_context`] establish scopes and convert an
//! intercepted abort into an ordinary [`Result`].
//!
//! # Control Flow
//!
//! A caller invokes [`run`] with a function taking `&Cx<E>`. The function
//! threads the `Cx` down arbitrarily deep call chains by parameter; any
//! callee may call [`Cx::throw`], which unwinds straight back to the
//! boundary. Code wanting an isolated failure domain calls
//! [`Cx::run_nested`], which performs the same boundary logic scoped to
//! the inner function only.
//!
//! # Module Contents
//!
//! - [`Cx`]: the abort-capable context token
//! - [`run`], [`run_with_context`]: boundary runners

pub mod boundary;
pub mod cx;

pub use boundary::{run, run_with_context};
pub use cx::Cx;
