use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use crate::cache::{CacheConfig, Key, NamespacedKey, QueryCache};

static NEXT_CLIENT_ID: AtomicUsize = AtomicUsize::new(0);
static SHARED: OnceLock<Arc<QueryClient>> = OnceLock::new();

/// Owns a [`QueryCache`] and the configuration used to address it.
///
/// Most code never builds one: hooks fall back to [`QueryClient::shared`],
/// which is created on first use and lives for the rest of the process.
/// Explicit clients are for handing a subtree its own store through
/// [`ClientContext::provide`](crate::runtime::ClientContext::provide) or
/// [`WithQueryClient::with_client`](crate::island::WithQueryClient::with_client).
///
/// # Examples
///
/// ```
/// use islet::client::QueryClient;
///
/// let a = QueryClient::shared();
/// let b = QueryClient::shared();
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// ```
pub struct QueryClient {
    id: usize,
    config: CacheConfig,
    cache: QueryCache,
}

impl QueryClient {
    /// Create an independent client with the default configuration.
    pub fn new() -> Arc<Self> {
        Self::with_config(CacheConfig::default())
    }

    /// Create an independent client.
    pub fn with_config(config: CacheConfig) -> Arc<Self> {
        let id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
        debug!(id, namespace = %config.namespace, "Creating query client");
        Arc::new(Self {
            id,
            cache: QueryCache::new(config.stale_time),
            config,
        })
    }

    /// Get or create the process-wide client.
    pub fn shared() -> Arc<Self> {
        Arc::clone(SHARED.get_or_init(|| {
            let client = Self::with_config(CacheConfig::default());
            info!(id = client.id, "Shared query client initialized");
            client
        }))
    }

    /// Whether this is the process-wide client.
    pub fn is_shared(&self) -> bool {
        SHARED
            .get()
            .is_some_and(|shared| std::ptr::eq(Arc::as_ptr(shared), self))
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Resolve a caller key to its address in this client's cache.
    pub fn namespaced(&self, key: &Key) -> NamespacedKey {
        NamespacedKey::new(self.config.namespace.clone(), key.joined(&self.config.separator))
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("id", &self.id)
            .field("namespace", &self.config.namespace)
            .field("entries", &self.cache.len())
            .finish()
    }
}
