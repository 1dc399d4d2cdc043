//! Keyed access to global values.
//!
//! Two ways in:
//! - Hook mode (`use_global`, `use_global_or`, `use_global_with`): read a
//!   value, seed it if absent, and subscribe the rendering island.
//! - Accessor mode (`use_global_accessor`): read values on demand without
//!   subscribing.

mod global;

pub use global::{
    use_global, use_global_accessor, use_global_or, use_global_with, GlobalAccessor, GlobalState,
    Refresh, Reset, SetGlobal,
};
