use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use super::entry::Entry;
use super::{NamespacedKey, StaleTime};
use crate::error::Result;

/// Callback invoked when an entry it subscribed to changes.
pub type Listener = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

type ListenerMap = HashMap<NamespacedKey, Vec<(usize, Listener)>>;

/// A change to a cache entry, delivered to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A value was written.
    Updated(NamespacedKey),
    /// The entry was marked as needing re-validation.
    Invalidated(NamespacedKey),
    /// The entry was deleted.
    Removed(NamespacedKey),
}

impl CacheEvent {
    pub fn key(&self) -> &NamespacedKey {
        match self {
            CacheEvent::Updated(key) | CacheEvent::Invalidated(key) | CacheEvent::Removed(key) => key,
        }
    }
}

/// A keyed, type-erased cache with per-key change notification.
///
/// Values of any `Clone + Send + Sync` type live side by side; each read
/// names the type it expects. Listeners are keyed by address rather than
/// by entry, so subscribers of a removed entry keep hearing about it once
/// it is written again.
///
/// # Examples
///
/// ```
/// use islet::cache::{NamespacedKey, QueryCache};
///
/// let cache = QueryCache::default();
/// let key = NamespacedKey::new("global", "count");
///
/// cache.set(&key, Some(1u32));
/// cache.update(&key, |prev: Option<u32>| prev.map(|n| n + 1)).unwrap();
/// assert_eq!(cache.get::<u32>(&key).unwrap(), Some(2));
/// ```
pub struct QueryCache {
    entries: RwLock<HashMap<NamespacedKey, Entry>>,
    listeners: Arc<Mutex<ListenerMap>>,
    next_listener: AtomicUsize,
    stale_time: StaleTime,
}

impl QueryCache {
    /// Create an empty cache whose entries use the given freshness window.
    pub fn new(stale_time: StaleTime) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_listener: AtomicUsize::new(0),
            stale_time,
        }
    }

    pub fn contains(&self, key: &NamespacedKey) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Addresses of every live entry, sorted.
    pub fn keys(&self) -> Vec<NamespacedKey> {
        let mut keys: Vec<_> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Read an entry without subscribing to it.
    ///
    /// Returns `None` when the entry is absent or holds null.
    pub fn get<T>(&self, key: &NamespacedKey) -> Result<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        match self.entries.read().get(key) {
            Some(entry) => entry.read(key),
            None => Ok(None),
        }
    }

    /// Read an entry, seeding it from `init` if it does not exist yet.
    ///
    /// `init` runs at most once and never under a lock, so it may itself
    /// read the cache. Seeding does not notify subscribers.
    pub fn get_or_seed<T, F>(&self, key: &NamespacedKey, init: F) -> Result<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Option<T>,
    {
        if let Some(entry) = self.entries.read().get(key) {
            return entry.read(key);
        }

        let seed = init();
        let mut entries = self.entries.write();
        // `init` may have written the key itself; that write wins.
        let entry = entries.entry(key.clone()).or_insert_with(|| {
            debug!(%key, seeded = seed.is_some(), "Seeding cache entry");
            Entry::new(seed)
        });
        entry.read(key)
    }

    /// Write a value (or null), creating the entry if needed.
    pub fn set<T>(&self, key: &NamespacedKey, value: Option<T>)
    where
        T: Send + Sync + 'static,
    {
        trace!(%key, null = value.is_none(), "Writing cache entry");
        self.entries.write().insert(key.clone(), Entry::new(value));
        self.notify(CacheEvent::Updated(key.clone()));
    }

    /// Write a value computed from the previous one.
    ///
    /// `f` receives `None` when the entry is absent or null. It runs under
    /// the cache's write lock, so concurrent updates never interleave; it
    /// must not touch the cache itself.
    pub fn update<T, F>(&self, key: &NamespacedKey, f: F) -> Result<()>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(Option<T>) -> Option<T>,
    {
        {
            let mut entries = self.entries.write();
            let previous = match entries.get(key) {
                Some(entry) => entry.read::<T>(key)?,
                None => None,
            };
            let next = f(previous);
            trace!(%key, null = next.is_none(), "Updating cache entry");
            entries.insert(key.clone(), Entry::new(next));
        }
        self.notify(CacheEvent::Updated(key.clone()));
        Ok(())
    }

    /// Mark an entry as needing re-validation and notify its subscribers.
    ///
    /// There is nothing to refetch; the entry keeps its value. Returns
    /// `false` if the entry does not exist.
    pub fn invalidate(&self, key: &NamespacedKey) -> bool {
        let found = match self.entries.write().get_mut(key) {
            Some(entry) => {
                entry.invalidate();
                true
            }
            None => false,
        };
        if found {
            debug!(%key, "Invalidated cache entry");
            self.notify(CacheEvent::Invalidated(key.clone()));
        }
        found
    }

    /// Delete an entry and notify its subscribers.
    ///
    /// Returns `false` if the entry does not exist.
    pub fn remove(&self, key: &NamespacedKey) -> bool {
        let removed = self.entries.write().remove(key).is_some();
        if removed {
            debug!(%key, "Removed cache entry");
            self.notify(CacheEvent::Removed(key.clone()));
        }
        removed
    }

    /// Delete every entry, notifying the subscribers of each.
    pub fn clear(&self) {
        let removed: Vec<NamespacedKey> = {
            let mut entries = self.entries.write();
            let mut keys: Vec<_> = entries.drain().map(|(key, _)| key).collect();
            keys.sort();
            keys
        };
        debug!(count = removed.len(), "Cleared cache");
        for key in removed {
            self.notify(CacheEvent::Removed(key));
        }
    }

    /// Whether an entry has been invalidated or outlived the stale time.
    ///
    /// Returns `None` if the entry does not exist.
    pub fn is_stale(&self, key: &NamespacedKey) -> Option<bool> {
        self.entries
            .read()
            .get(key)
            .map(|entry| entry.is_stale(self.stale_time))
    }

    /// Subscribe to changes of one entry.
    ///
    /// The listener stays registered until the returned guard is dropped.
    pub fn subscribe<F>(&self, key: &NamespacedKey, listener: F) -> Subscription
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .entry(key.clone())
            .or_default()
            .push((id, Arc::new(listener)));

        Subscription {
            id,
            key: key.clone(),
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Number of live subscriptions to an entry.
    pub fn subscriber_count(&self, key: &NamespacedKey) -> usize {
        self.listeners.lock().get(key).map_or(0, Vec::len)
    }

    fn notify(&self, event: CacheEvent) {
        // Listeners may write back into the cache; call them unlocked.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .get(event.key())
            .map(|listeners| listeners.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        trace!(key = %event.key(), listeners = listeners.len(), "Notifying subscribers");
        for listener in listeners {
            listener(&event);
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(StaleTime::Never)
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .field("stale_time", &self.stale_time)
            .finish()
    }
}

/// RAII guard for a cache listener.
pub struct Subscription {
    id: usize,
    key: NamespacedKey,
    listeners: Weak<Mutex<ListenerMap>>,
}

impl Subscription {
    pub fn key(&self) -> &NamespacedKey {
        &self.key
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            let mut listeners = listeners.lock();
            if let Some(registered) = listeners.get_mut(&self.key) {
                registered.retain(|(id, _)| *id != self.id);
                if registered.is_empty() {
                    listeners.remove(&self.key);
                }
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GlobalError;
    use std::time::Duration;

    fn key(name: &str) -> NamespacedKey {
        NamespacedKey::new("global", name)
    }

    fn recorder(cache: &QueryCache, key: &NamespacedKey) -> (Subscription, Arc<Mutex<Vec<CacheEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let subscription = cache.subscribe(key, move |event| sink.lock().push(event.clone()));
        (subscription, events)
    }

    #[test]
    fn get_absent_is_none() {
        let cache = QueryCache::default();
        assert_eq!(cache.get::<String>(&key("missing")), Ok(None));
        assert!(!cache.contains(&key("missing")));
    }

    #[test]
    fn seed_runs_init_once() {
        let cache = QueryCache::default();
        let calls = AtomicUsize::new(0);
        let init = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Some("light".to_string())
        };

        assert_eq!(cache.get_or_seed(&key("theme"), init), Ok(Some("light".to_string())));
        assert_eq!(
            cache.get_or_seed(&key("theme"), || Some("dark".to_string())),
            Ok(Some("light".to_string()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn seeding_null_creates_entry() {
        let cache = QueryCache::default();
        assert_eq!(cache.get_or_seed::<u32, _>(&key("n"), || None), Ok(None));
        assert!(cache.contains(&key("n")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn seeding_does_not_notify() {
        let cache = QueryCache::default();
        let (_sub, events) = recorder(&cache, &key("quiet"));
        cache.get_or_seed(&key("quiet"), || Some(1u8)).unwrap();
        assert!(events.lock().is_empty());
    }

    #[test]
    fn set_notifies_subscribers_of_that_key_only() {
        let cache = QueryCache::default();
        let (_a, a_events) = recorder(&cache, &key("a"));
        let (_b, b_events) = recorder(&cache, &key("b"));

        cache.set(&key("a"), Some(1u32));

        assert_eq!(*a_events.lock(), vec![CacheEvent::Updated(key("a"))]);
        assert!(b_events.lock().is_empty());
    }

    #[test]
    fn update_sees_previous_value() {
        let cache = QueryCache::default();
        cache.update(&key("count"), |prev: Option<u32>| Some(prev.unwrap_or(0) + 1)).unwrap();
        cache.update(&key("count"), |prev: Option<u32>| Some(prev.unwrap_or(0) + 1)).unwrap();
        assert_eq!(cache.get::<u32>(&key("count")), Ok(Some(2)));
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let cache = Arc::new(QueryCache::default());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        cache
                            .update(&key("total"), |prev: Option<u64>| Some(prev.unwrap_or(0) + 1))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().unwrap();
        }
        assert_eq!(cache.get::<u64>(&key("total")), Ok(Some(8000)));
    }

    #[test]
    fn update_with_wrong_type_fails_without_writing() {
        let cache = QueryCache::default();
        cache.set(&key("count"), Some(1u32));
        let result = cache.update(&key("count"), |_: Option<String>| Some("x".to_string()));
        assert!(matches!(result, Err(GlobalError::TypeMismatch { .. })));
        assert_eq!(cache.get::<u32>(&key("count")), Ok(Some(1)));
    }

    #[test]
    fn invalidate_keeps_value_and_marks_stale() {
        let cache = QueryCache::default();
        let (_sub, events) = recorder(&cache, &key("user"));
        cache.set(&key("user"), Some("ada".to_string()));
        assert_eq!(cache.is_stale(&key("user")), Some(false));

        assert!(cache.invalidate(&key("user")));
        assert_eq!(cache.is_stale(&key("user")), Some(true));
        assert_eq!(cache.get::<String>(&key("user")), Ok(Some("ada".to_string())));
        assert_eq!(events.lock().last(), Some(&CacheEvent::Invalidated(key("user"))));

        cache.set(&key("user"), Some("grace".to_string()));
        assert_eq!(cache.is_stale(&key("user")), Some(false));
    }

    #[test]
    fn invalidate_absent_is_noop() {
        let cache = QueryCache::default();
        let (_sub, events) = recorder(&cache, &key("ghost"));
        assert!(!cache.invalidate(&key("ghost")));
        assert_eq!(cache.is_stale(&key("ghost")), None);
        assert!(events.lock().is_empty());
    }

    #[test]
    fn remove_notifies_and_listener_survives() {
        let cache = QueryCache::default();
        let (_sub, events) = recorder(&cache, &key("session"));
        cache.set(&key("session"), Some(1u64));

        assert!(cache.remove(&key("session")));
        assert!(!cache.remove(&key("session")));
        assert!(!cache.contains(&key("session")));

        cache.set(&key("session"), Some(2u64));
        assert_eq!(
            *events.lock(),
            vec![
                CacheEvent::Updated(key("session")),
                CacheEvent::Removed(key("session")),
                CacheEvent::Updated(key("session")),
            ]
        );
    }

    #[test]
    fn clear_removes_everything() {
        let cache = QueryCache::default();
        let (_sub, events) = recorder(&cache, &key("b"));
        cache.set(&key("a"), Some(1u8));
        cache.set(&key("b"), Some(2u8));

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(events.lock().last(), Some(&CacheEvent::Removed(key("b"))));
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let cache = QueryCache::default();
        let (sub, events) = recorder(&cache, &key("k"));
        assert_eq!(cache.subscriber_count(&key("k")), 1);

        drop(sub);
        cache.set(&key("k"), Some(1u8));

        assert_eq!(cache.subscriber_count(&key("k")), 0);
        assert!(events.lock().is_empty());
    }

    #[test]
    fn listener_may_write_back() {
        let cache = Arc::new(QueryCache::default());
        let writer = Arc::clone(&cache);
        let _sub = cache.subscribe(&key("source"), move |_| {
            let value = writer.get::<u32>(&key("source")).unwrap().unwrap_or(0);
            writer.set(&key("mirror"), Some(value * 10));
        });

        cache.set(&key("source"), Some(4u32));
        assert_eq!(cache.get::<u32>(&key("mirror")), Ok(Some(40)));
    }

    #[test]
    fn elapsed_stale_time_marks_stale() {
        let cache = QueryCache::new(StaleTime::After(Duration::ZERO));
        cache.set(&key("old"), Some(1u8));
        assert_eq!(cache.is_stale(&key("old")), Some(true));
    }

    #[test]
    fn keys_are_sorted() {
        let cache = QueryCache::default();
        cache.set(&key("b"), Some(1u8));
        cache.set(&key("a"), Some(1u8));
        assert_eq!(cache.keys(), vec![key("a"), key("b")]);
    }
}
