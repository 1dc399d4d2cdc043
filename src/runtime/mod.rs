//! Runtime support for hooks.
//!
//! This module tracks which query client the current subtree sees and
//! which island, if any, is rendering on this thread.

mod context;

pub use context::{ClientContext, ContextFrame};
pub(crate) use context::{current_observer, with_observer, Observer};
