use std::borrow::Cow;
use std::sync::Arc;

use super::Component;
use crate::client::QueryClient;
use crate::error::Result;
use crate::runtime::ClientContext;

/// A component that provides a query client to the component it wraps.
///
/// Built with [`with_query_client`] (shared client) or
/// [`WithQueryClient::with_client`]. The provider is in place for the
/// duration of each render of the wrapped component; the client itself
/// outlives any island using it.
pub struct WithQueryClient<C> {
    inner: C,
    client: Arc<QueryClient>,
    name: String,
}

impl<C: Component> WithQueryClient<C> {
    /// Wrap `component` so it renders with `client` provided.
    pub fn with_client(component: C, client: Arc<QueryClient>) -> Self {
        let name = format!("WithQueryClient({})", component.display_name());
        Self {
            inner: component,
            client,
            name,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn client(&self) -> &Arc<QueryClient> {
        &self.client
    }
}

impl<C: Component> Component for WithQueryClient<C> {
    type Props = C::Props;

    fn render(&self, props: &C::Props) -> Result<()> {
        ClientContext::provide(Arc::clone(&self.client), || self.inner.render(props))
    }

    fn display_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.name.as_str())
    }
}

/// Wrap `component` so its subtree sees the shared query client.
///
/// The result takes the same props as `component` and is named
/// `WithQueryClient(<name>)`.
pub fn with_query_client<C: Component>(component: C) -> WithQueryClient<C> {
    WithQueryClient::with_client(component, QueryClient::shared())
}
