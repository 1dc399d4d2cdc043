use std::cell::RefCell;
use std::sync::Arc;
use std::thread::LocalKey;

use crate::cache::NamespacedKey;
use crate::client::QueryClient;
use crate::error::{GlobalError, Result};

/// Something that re-renders when the entries it reads change.
pub(crate) trait Observer: Send + Sync {
    /// Subscribe to `key` in `client` for the render in progress.
    fn track(&self, client: &Arc<QueryClient>, key: &NamespacedKey);
}

/// One level of the client context stack.
#[derive(Clone, Default)]
pub enum ContextFrame {
    /// No provider; hooks use the shared client.
    #[default]
    Root,
    /// A provider handed this client to the subtree.
    Provided(Arc<QueryClient>),
    /// The subtree opted out of the shared fallback and has no provider.
    Detached,
}

impl ContextFrame {
    /// The client hooks resolve to under this frame.
    pub fn resolve(&self) -> Result<Arc<QueryClient>> {
        match self {
            ContextFrame::Root => Ok(QueryClient::shared()),
            ContextFrame::Provided(client) => Ok(Arc::clone(client)),
            ContextFrame::Detached => Err(GlobalError::MissingClient),
        }
    }
}

impl std::fmt::Debug for ContextFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextFrame::Root => f.write_str("Root"),
            ContextFrame::Provided(client) => f.debug_tuple("Provided").field(&client.id()).finish(),
            ContextFrame::Detached => f.write_str("Detached"),
        }
    }
}

// Thread-local stacks: the innermost provider and the island being rendered.
thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextFrame>> = RefCell::new(vec![]);
    static OBSERVER_STACK: RefCell<Vec<Arc<dyn Observer>>> = RefCell::new(vec![]);
}

/// Scoped access to the query client of the current subtree.
///
/// Frames are pushed for the duration of a closure and popped afterwards,
/// even if the closure panics. The innermost frame wins; with no frame at
/// all, hooks fall back to [`QueryClient::shared`].
///
/// # Examples
///
/// ```
/// use islet::client::QueryClient;
/// use islet::runtime::ClientContext;
/// use std::sync::Arc;
///
/// let client = QueryClient::new();
/// ClientContext::provide(client.clone(), || {
///     let resolved = ClientContext::resolve().unwrap();
///     assert!(Arc::ptr_eq(&resolved, &client));
/// });
///
/// // Outside any provider the shared client is used.
/// assert!(ClientContext::resolve().unwrap().is_shared());
/// ```
pub struct ClientContext;

impl ClientContext {
    /// Run `f` with `client` provided to everything it renders.
    pub fn provide<F, R>(client: Arc<QueryClient>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::enter(ContextFrame::Provided(client), f)
    }

    /// Run `f` with no provider and no shared fallback.
    ///
    /// Hooks called inside fail with [`GlobalError::MissingClient`] unless
    /// an inner [`provide`](Self::provide) supplies a client.
    pub fn detached<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::enter(ContextFrame::Detached, f)
    }

    /// Run `f` with `frame` as the innermost context.
    pub fn enter<F, R>(frame: ContextFrame, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        scoped(&CONTEXT_STACK, frame, f)
    }

    /// The innermost frame, or [`ContextFrame::Root`] if none is active.
    pub fn frame() -> ContextFrame {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned().unwrap_or_default())
    }

    /// The client supplied by the innermost provider, if any.
    pub fn provided() -> Option<Arc<QueryClient>> {
        match Self::frame() {
            ContextFrame::Provided(client) => Some(client),
            _ => None,
        }
    }

    /// The client hooks should use right now.
    pub fn resolve() -> Result<Arc<QueryClient>> {
        Self::frame().resolve()
    }
}

/// Run `f` with `observer` recording the entries it reads.
pub(crate) fn with_observer<F, R>(observer: Arc<dyn Observer>, f: F) -> R
where
    F: FnOnce() -> R,
{
    scoped(&OBSERVER_STACK, observer, f)
}

/// The observer of the render in progress on this thread.
pub(crate) fn current_observer() -> Option<Arc<dyn Observer>> {
    OBSERVER_STACK.with(|stack| stack.borrow().last().cloned())
}

fn scoped<T, F, R>(stack: &'static LocalKey<RefCell<Vec<T>>>, item: T, f: F) -> R
where
    T: 'static,
    F: FnOnce() -> R,
{
    stack.with(|stack| {
        stack.borrow_mut().push(item);
    });

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    stack.with(|stack| {
        stack.borrow_mut().pop();
    });

    match result {
        Ok(r) => r,
        Err(e) => std::panic::resume_unwind(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn falls_back_to_shared() {
        assert!(matches!(ClientContext::frame(), ContextFrame::Root));
        assert!(ClientContext::provided().is_none());
        assert!(ClientContext::resolve().unwrap().is_shared());
    }

    #[test]
    fn innermost_provider_wins() {
        let outer = QueryClient::new();
        let inner = QueryClient::new();

        ClientContext::provide(outer.clone(), || {
            ClientContext::provide(inner.clone(), || {
                assert!(Arc::ptr_eq(&ClientContext::resolve().unwrap(), &inner));
            });
            assert!(Arc::ptr_eq(&ClientContext::resolve().unwrap(), &outer));
        });
    }

    #[test]
    fn detached_has_no_client() {
        ClientContext::detached(|| {
            assert_eq!(ClientContext::resolve().unwrap_err(), GlobalError::MissingClient);

            let client = QueryClient::new();
            ClientContext::provide(client.clone(), || {
                assert!(Arc::ptr_eq(&ClientContext::resolve().unwrap(), &client));
            });
        });
        assert!(ClientContext::resolve().is_ok());
    }

    #[test]
    fn frame_is_popped_after_panic() {
        let result = std::panic::catch_unwind(|| {
            ClientContext::detached(|| panic!("render failed"));
        });
        assert!(result.is_err());
        assert!(matches!(ClientContext::frame(), ContextFrame::Root));
    }

    struct Recorder(Mutex<Vec<NamespacedKey>>);

    impl Observer for Recorder {
        fn track(&self, _client: &Arc<QueryClient>, key: &NamespacedKey) {
            self.0.lock().push(key.clone());
        }
    }

    #[test]
    fn observer_is_scoped() {
        assert!(current_observer().is_none());

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let client = QueryClient::new();
        with_observer(recorder.clone(), || {
            let observer = current_observer().expect("observer is active");
            observer.track(&client, &NamespacedKey::new("global", "seen"));
        });

        assert!(current_observer().is_none());
        assert_eq!(*recorder.0.lock(), vec![NamespacedKey::new("global", "seen")]);
    }
}
