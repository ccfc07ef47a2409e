//! Shared types for the Quartz compiler front half.
//!
//! Every AST node carries a [`Location`]; diagnostics quote it verbatim and
//! the renderer maps it back onto byte offsets through a [`LineIndex`].

pub mod span;

pub use span::{LineIndex, Location};
