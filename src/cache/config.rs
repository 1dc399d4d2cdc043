//! Cache configuration.

use std::time::{Duration, Instant};

/// How long a written entry counts as fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaleTime {
    /// Entries never go stale on their own; only invalidation marks them.
    #[default]
    Never,
    /// Entries go stale once this much time has passed since the last write.
    After(Duration),
}

impl StaleTime {
    /// Whether an entry written at `since` has outlived its freshness.
    pub fn is_elapsed(&self, since: Instant) -> bool {
        match self {
            StaleTime::Never => false,
            StaleTime::After(window) => since.elapsed() >= *window,
        }
    }
}

/// Configuration for a [`QueryClient`](crate::client::QueryClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Prefix applied to every caller key.
    pub namespace: String,
    /// Joins the segments of a path key.
    pub separator: String,
    /// Freshness window applied to every entry.
    pub stale_time: StaleTime,
}

impl CacheConfig {
    /// Create a config with the default namespace and separator.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_stale_time(mut self, stale_time: StaleTime) -> Self {
        self.stale_time = stale_time;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: "global".to_string(),
            separator: ".".to_string(),
            stale_time: StaleTime::Never,
        }
    }
}
