//! The keyed query cache backing every global value.
//!
//! Entries are addressed by a [`NamespacedKey`], hold one type-erased value
//! (or null), and notify per-key subscribers when written, invalidated, or
//! removed.

#[allow(clippy::module_inception)]
mod cache;
mod config;
mod entry;
mod key;

pub use cache::{CacheEvent, Listener, QueryCache, Subscription};
pub use config::{CacheConfig, StaleTime};
pub use key::{Key, NamespacedKey};
