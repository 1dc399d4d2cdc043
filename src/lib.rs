//! # Islet
//!
//! Keyed global state for independently mounted component islands.
//!
//! Islands that never share a parent still need to agree on a handful of
//! values: the theme, the signed-in user, the contents of a cart. Islet
//! keeps those values in one query cache that every island can reach.
//!
//! ## Cache (Low-level)
//!
//! - `QueryCache` - Type-erased keyed entries with per-key change listeners
//! - `QueryClient` - A cache plus its addressing config; `QueryClient::shared()`
//!   is the process-wide instance
//! - `ClientContext` - Scoped provision of a client to a subtree, falling back
//!   to the shared one
//!
//! ## Hooks (High-level)
//!
//! - `use_global` / `use_global_or` / `use_global_with` - Read, seed, and
//!   subscribe; returns `(value, set, refresh, reset)`
//! - `use_global_accessor` - Read on demand without subscribing
//! - `Island` and `with_query_client` - Mount components and give them a client

pub mod cache;
pub mod client;
pub mod error;
pub mod hooks;
pub mod island;
pub mod runtime;

// Re-export main types for convenience
pub use cache::{CacheConfig, Key, StaleTime};
pub use client::QueryClient;
pub use error::{GlobalError, Result};
pub use hooks::{
    use_global, use_global_accessor, use_global_or, use_global_with, GlobalAccessor, GlobalState,
    Refresh, Reset, SetGlobal,
};
pub use island::{component, with_query_client, Component, Island, WithQueryClient};
pub use runtime::ClientContext;
