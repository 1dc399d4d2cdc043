//! Error types shared by every module of the crate.

use thiserror::Error;

/// Errors produced while resolving a client, reading the cache, or rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GlobalError {
    /// No query client could be resolved for the current context.
    ///
    /// Only reachable inside [`ClientContext::detached`](crate::runtime::ClientContext::detached),
    /// which opts out of the shared-client fallback.
    #[error("no query client is available in this context; wrap the component with `with_query_client`")]
    MissingClient,

    /// An entry was read as a type other than the one stored under its key.
    #[error("entry `{key}` holds a `{found}`, not a `{expected}`")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// An island kept scheduling itself while rendering.
    #[error("`{component}` re-rendered {limit} times without settling")]
    RenderLoop { component: String, limit: usize },
}

/// Result alias used throughout the crate.
pub type Result<T, E = GlobalError> = std::result::Result<T, E>;
