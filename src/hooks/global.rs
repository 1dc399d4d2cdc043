use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cache::{Key, NamespacedKey};
use crate::client::QueryClient;
use crate::error::Result;
use crate::runtime::{current_observer, ClientContext};

/// What hook mode returns: the current value and its three handles.
pub type GlobalState<T> = (Option<T>, SetGlobal<T>, Refresh, Reset);

/// Read a global value and subscribe the rendering island to it.
///
/// Seeds the entry with null if nobody has written it yet. Inside an
/// island render, later writes to the key re-render that island. Outside
/// any render the value is read but nothing is subscribed.
///
/// # Examples
///
/// ```
/// use islet::hooks::{use_global, use_global_or};
///
/// let (theme, set_theme, _refresh, _reset) = use_global_or("doc.hooks.theme", "light".to_string())?;
/// assert_eq!(theme.as_deref(), Some("light"));
///
/// set_theme.set("dark".to_string());
/// let (theme, ..) = use_global::<String>("doc.hooks.theme")?;
/// assert_eq!(theme.as_deref(), Some("dark"));
/// # Ok::<(), islet::GlobalError>(())
/// ```
pub fn use_global<T>(key: impl Into<Key>) -> Result<GlobalState<T>>
where
    T: Clone + Send + Sync + 'static,
{
    watch(key.into(), || None)
}

/// Like [`use_global`], seeding an absent entry with `initial`.
pub fn use_global_or<T>(key: impl Into<Key>, initial: T) -> Result<GlobalState<T>>
where
    T: Clone + Send + Sync + 'static,
{
    watch(key.into(), move || Some(initial))
}

/// Like [`use_global`], seeding an absent entry from `init`.
///
/// `init` only runs when the entry does not exist yet.
pub fn use_global_with<T, F>(key: impl Into<Key>, init: F) -> Result<GlobalState<T>>
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> T,
{
    watch(key.into(), move || Some(init()))
}

/// Get a non-subscribing reader for the current client.
///
/// Reads through the accessor always see the latest write, but never cause
/// the calling island to re-render.
pub fn use_global_accessor() -> Result<GlobalAccessor> {
    Ok(GlobalAccessor {
        client: ClientContext::resolve()?,
    })
}

fn watch<T, F>(key: Key, init: F) -> Result<GlobalState<T>>
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Option<T>,
{
    let client = ClientContext::resolve()?;
    let key = client.namespaced(&key);

    if let Some(observer) = current_observer() {
        observer.track(&client, &key);
    }
    let value = client.cache().get_or_seed(&key, init)?;

    let handle = Handle { client, key };
    Ok((
        value,
        SetGlobal {
            handle: handle.clone(),
            _value: PhantomData,
        },
        Refresh {
            handle: handle.clone(),
        },
        Reset { handle },
    ))
}

#[derive(Clone)]
struct Handle {
    client: Arc<QueryClient>,
    key: NamespacedKey,
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("client", &self.client.id())
            .field("key", &self.key)
            .finish()
    }
}

/// Writes the entry a hook read.
#[derive(Debug)]
pub struct SetGlobal<T> {
    handle: Handle,
    _value: PhantomData<fn() -> T>,
}

impl<T> SetGlobal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Replace the value; every island subscribed to the key re-renders.
    pub fn set(&self, value: T) {
        self.handle.client.cache().set(&self.handle.key, Some(value));
    }

    /// Compute the new value from the previous one (`None` if null).
    ///
    /// `f` runs under the cache's write lock, so concurrent updates to the
    /// key never lose a write. It must not read or write the cache itself.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(Option<T>) -> T,
    {
        self.handle
            .client
            .cache()
            .update(&self.handle.key, |previous| Some(f(previous)))
    }

    pub fn key(&self) -> &NamespacedKey {
        &self.handle.key
    }
}

impl<T> Clone for SetGlobal<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            _value: PhantomData,
        }
    }
}

/// Marks the entry a hook read as needing re-validation.
#[derive(Debug, Clone)]
pub struct Refresh {
    handle: Handle,
}

impl Refresh {
    /// Invalidate the entry and notify its subscribers. The value is kept.
    ///
    /// Returns `false` if the entry no longer exists, e.g. after a reset
    /// that no reader has re-seeded yet.
    pub fn run(&self) -> bool {
        let found = self.handle.client.cache().invalidate(&self.handle.key);
        if !found {
            trace!(key = %self.handle.key, "Refresh of absent global ignored");
        }
        found
    }
}

/// Removes the entry a hook read.
#[derive(Debug, Clone)]
pub struct Reset {
    handle: Handle,
}

impl Reset {
    /// Delete the entry and notify its subscribers.
    ///
    /// There is no canonical default to restore: the next hook-mode read
    /// seeds the entry from its own initial value, so whichever subscriber
    /// re-renders first decides what the others see.
    ///
    /// Returns `false` if there was nothing to remove.
    pub fn run(&self) -> bool {
        let removed = self.handle.client.cache().remove(&self.handle.key);
        if removed {
            debug!(key = %self.handle.key, "Reset global");
        } else {
            trace!(key = %self.handle.key, "Reset of absent global ignored");
        }
        removed
    }
}

/// Reads global values on demand without subscribing.
#[derive(Clone)]
pub struct GlobalAccessor {
    client: Arc<QueryClient>,
}

impl GlobalAccessor {
    /// The latest value under `key`, or `None` if absent or null.
    pub fn get<T>(&self, key: impl Into<Key>) -> Result<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let key = self.client.namespaced(&key.into());
        self.client.cache().get(&key)
    }

    /// Whether an entry exists under `key`, even if it holds null.
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        let key = self.client.namespaced(&key.into());
        self.client.cache().contains(&key)
    }

    pub fn client(&self) -> &Arc<QueryClient> {
        &self.client
    }
}

impl std::fmt::Debug for GlobalAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalAccessor")
            .field("client", &self.client.id())
            .finish()
    }
}
