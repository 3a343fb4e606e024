//! Lifecycle callbacks for a connection.

use std::fmt;

use crate::error::Error;
use crate::protocol::ParsedMessage;

/// Receives connection lifecycle events and messages no action claimed.
///
/// Every method has a no-op default. Callbacks run on the connection task, so they must
/// not block; hand long work off to another task.
pub trait ConnectionObserver: Send + Sync + 'static {
    /// The transport opened.
    fn on_connect(&self) {}

    /// The transport closed, cleanly or not.
    fn on_disconnect(&self) {}

    /// Transport failure, version mismatch, or the reconnect budget running out.
    fn on_error(&self, _error: &Error) {}

    /// A frame whose verb has no registered action.
    fn on_message(&self, _frame: &str, _message: &ParsedMessage) {}
}

/// Observer that ignores everything.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ConnectionObserver for NoopObserver {}

type Callback = Box<dyn Fn() + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&Error) + Send + Sync>;
type MessageCallback = Box<dyn Fn(&str, &ParsedMessage) + Send + Sync>;

/// Closure-based [`ConnectionObserver`].
///
/// ```
/// use ws_hypermedia::ws::Hooks;
///
/// let hooks = Hooks::new()
///     .on_connect(|| println!("connected"))
///     .on_message(|frame, _message| println!("custom event: {frame}"));
/// ```
#[derive(Default)]
pub struct Hooks {
    on_connect: Option<Callback>,
    on_disconnect: Option<Callback>,
    on_error: Option<ErrorCallback>,
    on_message: Option<MessageCallback>,
}

impl Hooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_connect<F: Fn() + Send + Sync + 'static>(mut self, callback: F) -> Self {
        self.on_connect = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_disconnect<F: Fn() + Send + Sync + 'static>(mut self, callback: F) -> Self {
        self.on_disconnect = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_error<F: Fn(&Error) + Send + Sync + 'static>(mut self, callback: F) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_message<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &ParsedMessage) + Send + Sync + 'static,
    {
        self.on_message = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_message", &self.on_message.is_some())
            .finish()
    }
}

impl ConnectionObserver for Hooks {
    fn on_connect(&self) {
        if let Some(callback) = &self.on_connect {
            callback();
        }
    }

    fn on_disconnect(&self) {
        if let Some(callback) = &self.on_disconnect {
            callback();
        }
    }

    fn on_error(&self, error: &Error) {
        if let Some(callback) = &self.on_error {
            callback(error);
        }
    }

    fn on_message(&self, frame: &str, message: &ParsedMessage) {
        if let Some(callback) = &self.on_message {
            callback(frame, message);
        }
    }
}
