//! Components, mounted islands, and the context-providing wrapper.
//!
//! An island is an independently mounted component tree. Islands share
//! state only through the query client they resolve: the shared singleton
//! unless a [`WithQueryClient`] wrapper or an enclosing
//! [`ClientContext::provide`](crate::runtime::ClientContext::provide)
//! supplies another.

mod component;
#[allow(clippy::module_inception)]
mod island;
mod wrapper;

pub use component::{component, Component, FnComponent};
pub use island::{Island, MAX_RENDER_PASSES};
pub use wrapper::{with_query_client, WithQueryClient};
