use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::Component;
use crate::cache::{CacheEvent, NamespacedKey, Subscription};
use crate::client::QueryClient;
use crate::error::{GlobalError, Result};
use crate::runtime::{with_observer, ClientContext, ContextFrame, Observer};

/// Render passes allowed before an island is considered stuck.
pub const MAX_RENDER_PASSES: usize = 50;

/// Subscriptions are per client, since two clients may share an address.
type SubscriptionKey = (usize, NamespacedKey);

/// A mounted component instance.
///
/// Mounting captures the client context active at that moment and renders
/// once. Every later render re-enters the same context, so an island keeps
/// the provider it was mounted under no matter which write triggered it.
///
/// Hooks called during a render subscribe the island to the keys they
/// read; a write to any of those keys re-renders the island synchronously.
/// Keys a render stops reading are unsubscribed once it completes.
/// Dropping the island unsubscribes it from everything.
///
/// # Examples
///
/// ```
/// use islet::hooks::use_global_or;
/// use islet::island::{component, with_query_client, Island};
///
/// let counter = with_query_client(component("Counter", |_: &()| {
///     let (count, _set, _refresh, _reset) = use_global_or("doc.island.count", 0u32)?;
///     assert!(count.is_some());
///     Ok(())
/// }));
///
/// let island = Island::mount(counter, ()).unwrap();
/// assert_eq!(island.display_name(), "WithQueryClient(Counter)");
/// ```
pub struct Island<C: Component> {
    inner: Arc<IslandInner<C>>,
}

struct IslandInner<C: Component> {
    this: Weak<IslandInner<C>>,
    component: C,
    name: String,
    props: RwLock<Arc<C::Props>>,
    frame: ContextFrame,
    mounted: AtomicBool,
    rendering: AtomicBool,
    pending: AtomicBool,
    renders: AtomicUsize,
    subscriptions: Mutex<HashMap<SubscriptionKey, Subscription>>,
    touched: Mutex<HashSet<SubscriptionKey>>,
    last_error: Mutex<Option<GlobalError>>,
}

impl<C: Component> Island<C> {
    /// Mount `component` with `props` and render it once.
    pub fn mount(component: C, props: C::Props) -> Result<Self> {
        let name = component.display_name().into_owned();
        let frame = ClientContext::frame();
        debug!(component = %name, ?frame, "Mounting island");

        let inner = Arc::new_cyclic(|this| IslandInner {
            this: this.clone(),
            component,
            name,
            props: RwLock::new(Arc::new(props)),
            frame,
            mounted: AtomicBool::new(true),
            rendering: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            renders: AtomicUsize::new(0),
            subscriptions: Mutex::new(HashMap::new()),
            touched: Mutex::new(HashSet::new()),
            last_error: Mutex::new(None),
        });

        let island = Self { inner };
        island.render()?;
        Ok(island)
    }

    /// Re-render with the current props.
    pub fn render(&self) -> Result<()> {
        self.inner.render()
    }

    /// Replace the props and re-render.
    pub fn set_props(&self, props: C::Props) -> Result<()> {
        *self.inner.props.write() = Arc::new(props);
        self.inner.render()
    }

    /// Number of completed render passes, including the first.
    pub fn render_count(&self) -> usize {
        self.inner.renders.load(Ordering::SeqCst)
    }

    pub fn display_name(&self) -> &str {
        &self.inner.name
    }

    pub fn component(&self) -> &C {
        &self.inner.component
    }

    /// The context frame captured at mount time.
    pub fn frame(&self) -> &ContextFrame {
        &self.inner.frame
    }

    /// Number of entries this island is subscribed to.
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.lock().len()
    }

    /// The error from the most recent notification-driven render, if it failed.
    ///
    /// Renders requested directly return their error instead.
    pub fn last_error(&self) -> Option<GlobalError> {
        self.inner.last_error.lock().clone()
    }

    /// Unmount the island, dropping all of its subscriptions.
    pub fn unmount(self) {
        drop(self);
    }
}

impl<C: Component> Drop for Island<C> {
    fn drop(&mut self) {
        self.inner.mounted.store(false, Ordering::SeqCst);
        let subscriptions = std::mem::take(&mut *self.inner.subscriptions.lock());
        debug!(
            component = %self.inner.name,
            subscriptions = subscriptions.len(),
            "Unmounting island"
        );
        drop(subscriptions);
    }
}

impl<C: Component> std::fmt::Debug for Island<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Island")
            .field("name", &self.inner.name)
            .field("frame", &self.inner.frame)
            .field("renders", &self.render_count())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

impl<C: Component> IslandInner<C> {
    fn render(&self) -> Result<()> {
        loop {
            // Raised before claiming the flag, so an active renderer that is
            // about to finish always sees it.
            self.pending.store(true, Ordering::SeqCst);
            if self.rendering.swap(true, Ordering::SeqCst) {
                // Already rendering elsewhere; that loop picks it up.
                return Ok(());
            }

            let result = {
                let _rendering = RenderingGuard(&self.rendering);
                self.render_passes()
            };

            // A notification from another thread can land between the last
            // pending check and the flag reset.
            if result.is_err() || !self.pending.load(Ordering::SeqCst) {
                return result;
            }
        }
    }

    fn render_passes(&self) -> Result<()> {
        let mut passes = 0;
        loop {
            self.pending.store(false, Ordering::SeqCst);
            passes += 1;

            let outcome = self.render_once();
            if outcome.is_err() || !self.pending.load(Ordering::SeqCst) {
                return outcome;
            }
            if passes >= MAX_RENDER_PASSES {
                return Err(GlobalError::RenderLoop {
                    component: self.name.clone(),
                    limit: MAX_RENDER_PASSES,
                });
            }
        }
    }

    fn render_once(&self) -> Result<()> {
        let Some(this) = self.this.upgrade() else {
            return Ok(());
        };
        let observer: Arc<dyn Observer> = this;

        self.touched.lock().clear();
        let props = Arc::clone(&*self.props.read());
        let result = ClientContext::enter(self.frame.clone(), || {
            with_observer(observer, || self.component.render(&props))
        });
        self.renders.fetch_add(1, Ordering::SeqCst);

        if result.is_ok() {
            let touched = std::mem::take(&mut *self.touched.lock());
            let stale: Vec<Subscription> = {
                let mut subscriptions = self.subscriptions.lock();
                let keys: Vec<SubscriptionKey> = subscriptions
                    .keys()
                    .filter(|key| !touched.contains(*key))
                    .cloned()
                    .collect();
                keys.iter().filter_map(|key| subscriptions.remove(key)).collect()
            };
            drop(stale);
        }
        result
    }

    fn on_cache_event(&self, event: &CacheEvent) {
        if !self.mounted.load(Ordering::SeqCst) {
            return;
        }
        debug!(component = %self.name, key = %event.key(), "Re-rendering on cache event");
        let outcome = self.render();
        if let Err(err) = &outcome {
            warn!(component = %self.name, error = %err, "Notification-driven render failed");
        }
        *self.last_error.lock() = outcome.err();
    }
}

/// Clears the rendering flag even if the component panics.
struct RenderingGuard<'a>(&'a AtomicBool);

impl Drop for RenderingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<C: Component> Observer for IslandInner<C> {
    fn track(&self, client: &Arc<QueryClient>, key: &NamespacedKey) {
        if !self.mounted.load(Ordering::SeqCst) {
            return;
        }
        let id = (client.id(), key.clone());
        self.touched.lock().insert(id.clone());

        let mut subscriptions = self.subscriptions.lock();
        if subscriptions.contains_key(&id) {
            return;
        }
        let this = self.this.clone();
        let subscription = client.cache().subscribe(key, move |event| {
            if let Some(island) = this.upgrade() {
                island.on_cache_event(event);
            }
        });
        subscriptions.insert(id, subscription);
    }
}
