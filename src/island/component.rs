use std::borrow::Cow;
use std::marker::PhantomData;

use crate::error::Result;

/// A renderable unit of UI.
///
/// `render` is where hooks are called. It returns a `Result` so hook
/// failures can be propagated with `?`.
pub trait Component: Send + Sync + 'static {
    type Props: Send + Sync + 'static;

    fn render(&self, props: &Self::Props) -> Result<()>;

    /// Name used in logs and errors.
    fn display_name(&self) -> Cow<'_, str> {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        Cow::Borrowed(base.rsplit("::").next().unwrap_or(base))
    }
}

/// A [`Component`] backed by a closure. Built with [`component`].
pub struct FnComponent<P, F> {
    name: Cow<'static, str>,
    render: F,
    _props: PhantomData<fn(&P)>,
}

/// Build a component from a name and a render closure.
///
/// # Examples
///
/// ```
/// use islet::island::{component, Component, Island};
///
/// let greeting = component("Greeting", |name: &String| {
///     assert!(!name.is_empty());
///     Ok(())
/// });
/// assert_eq!(greeting.display_name(), "Greeting");
///
/// let island = Island::mount(greeting, "ada".to_string()).unwrap();
/// assert_eq!(island.render_count(), 1);
/// ```
pub fn component<P, F>(name: impl Into<Cow<'static, str>>, render: F) -> FnComponent<P, F>
where
    P: Send + Sync + 'static,
    F: Fn(&P) -> Result<()> + Send + Sync + 'static,
{
    FnComponent {
        name: name.into(),
        render,
        _props: PhantomData,
    }
}

impl<P, F> Component for FnComponent<P, F>
where
    P: Send + Sync + 'static,
    F: Fn(&P) -> Result<()> + Send + Sync + 'static,
{
    type Props = P;

    fn render(&self, props: &P) -> Result<()> {
        (self.render)(props)
    }

    fn display_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.name.as_ref())
    }
}
