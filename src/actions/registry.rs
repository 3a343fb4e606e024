use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::verb::Verb;
use crate::Result;
use crate::render::Renderer;

/// Everything a handler gets to work with for one frame.
#[non_exhaustive]
pub struct Invocation<R: Renderer> {
    /// Renderer to apply changes through
    pub renderer: Arc<R>,
    /// Element resolved from the frame's noun
    pub target: R::Element,
    /// Verb that selected the handler
    pub verb: String,
    /// Primary argument
    pub subject: String,
    /// Remaining fields
    pub options: Vec<String>,
}

impl<R: Renderer> Invocation<R> {
    #[must_use]
    pub fn new(
        renderer: Arc<R>,
        target: R::Element,
        verb: String,
        subject: String,
        options: Vec<String>,
    ) -> Self {
        Self {
            renderer,
            target,
            verb,
            subject,
            options,
        }
    }
}

impl<R: Renderer> fmt::Debug for Invocation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("verb", &self.verb)
            .field("subject", &self.subject)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Application-defined action bound to a verb.
///
/// Handlers should only touch [`Invocation::target`]. A handler that does not need to
/// wait simply returns without awaiting; it then completes before the next frame is read.
/// One that awaits is detached and the next frame is processed without waiting for it.
///
/// Closures returning a future implement this trait:
///
/// ```
/// use ws_hypermedia::actions::{ActionRegistry, Invocation};
/// # use ws_hypermedia::render::Renderer;
///
/// fn register<R: Renderer>(registry: &ActionRegistry<R>) {
///     registry.register("flash", |invocation: Invocation<R>| async move {
///         invocation
///             .renderer
///             .add_classes(&invocation.target, &["flash"])
///     });
/// }
/// ```
#[async_trait]
pub trait ActionHandler<R: Renderer>: Send + Sync + 'static {
    async fn handle(&self, invocation: Invocation<R>) -> Result<()>;
}

#[async_trait]
impl<R, F, Fut> ActionHandler<R> for F
where
    R: Renderer,
    F: Fn(Invocation<R>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(&self, invocation: Invocation<R>) -> Result<()> {
        (self)(invocation).await
    }
}

/// What a registry entry does.
#[non_exhaustive]
pub enum Action<R: Renderer> {
    Builtin(Verb),
    Custom(Arc<dyn ActionHandler<R>>),
}

impl<R: Renderer> Clone for Action<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Builtin(verb) => Self::Builtin(*verb),
            Self::Custom(handler) => Self::Custom(Arc::clone(handler)),
        }
    }
}

impl<R: Renderer> fmt::Debug for Action<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(verb) => f.debug_tuple("Builtin").field(verb).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Result of looking a verb up.
#[non_exhaustive]
pub enum Resolution<R: Renderer> {
    Builtin(Verb),
    Custom(Arc<dyn ActionHandler<R>>),
    /// Not registered: an application-defined event to forward, not an error
    Unknown,
}

impl<R: Renderer> fmt::Debug for Resolution<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(verb) => f.debug_tuple("Builtin").field(verb).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Verb to action mapping, seeded with every built-in.
///
/// Registration and removal take `&self` so handlers can be changed while a connection
/// is processing frames. Either may shadow or remove a built-in.
pub struct ActionRegistry<R: Renderer> {
    entries: DashMap<String, Action<R>>,
}

impl<R: Renderer> Default for ActionRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Renderer> fmt::Debug for ActionRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<R: Renderer> ActionRegistry<R> {
    #[must_use]
    pub fn new() -> Self {
        let entries = DashMap::new();
        for (name, verb) in Verb::builtin_names() {
            entries.insert(name.to_owned(), Action::Builtin(verb));
        }
        Self { entries }
    }

    /// Registry with nothing in it; every verb is forwarded until registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Bind `verb` to `handler`, replacing whatever was bound before.
    pub fn register<H: ActionHandler<R>>(&self, verb: &str, handler: H) {
        self.register_arc(verb, Arc::new(handler));
    }

    pub fn register_arc(&self, verb: &str, handler: Arc<dyn ActionHandler<R>>) {
        #[cfg(feature = "tracing")]
        if let Some(Action::Builtin(builtin)) = self.entries.get(verb).as_deref() {
            tracing::debug!(verb, %builtin, "Custom handler shadows built-in");
        }

        self.entries.insert(verb.to_owned(), Action::Custom(handler));
    }

    /// Remove the binding for `verb`. Returns whether one existed.
    pub fn unregister(&self, verb: &str) -> bool {
        self.entries.remove(verb).is_some()
    }

    /// Restore the built-in meaning of `verb`, if it has one.
    pub fn restore_builtin(&self, verb: &str) -> bool {
        match Verb::from_name(verb) {
            Some(builtin) => {
                self.entries.insert(verb.to_owned(), Action::Builtin(builtin));
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn resolve(&self, verb: &str) -> Resolution<R> {
        match self.entries.get(verb).as_deref() {
            Some(Action::Builtin(builtin)) => Resolution::Builtin(*builtin),
            Some(Action::Custom(handler)) => Resolution::Custom(Arc::clone(handler)),
            None => Resolution::Unknown,
        }
    }

    #[must_use]
    pub fn contains(&self, verb: &str) -> bool {
        self.entries.contains_key(verb)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
