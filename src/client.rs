use std::sync::Arc;

use futures::Stream;
use tokio::sync::watch;

use crate::Result;
use crate::actions::{ActionHandler, ActionRegistry};
use crate::config::Config;
use crate::engine::Engine;
use crate::protocol::{self, ParsedMessage};
use crate::render::Renderer;
use crate::security::{SecurityLog, validate_url};
use crate::ws::{ConnectionManager, ConnectionObserver, ConnectionState, NoopObserver};

/// One protocol instance: a socket, a registry and the renderer they drive.
///
/// # Examples
///
/// ```rust, no_run
/// use ws_hypermedia::Client;
/// use ws_hypermedia::config::Config;
/// # use ws_hypermedia::render::Renderer;
///
/// # async fn run<R: Renderer>(renderer: R) -> ws_hypermedia::Result<()> {
/// let client = Client::new("wss://example.com/live", Config::default(), renderer)?;
///
/// client.add_message_handler("flash", |invocation: ws_hypermedia::actions::Invocation<R>| async move {
///     invocation.renderer.add_classes(&invocation.target, &["flash"])
/// });
/// client.send_escaped("search", "results", "a | b", &[] as &[&str])?;
/// # Ok(())
/// # }
/// ```
pub struct Client<R: Renderer> {
    inner: Arc<ClientInner<R>>,
}

impl<R: Renderer> Clone for Client<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Renderer> std::fmt::Debug for Client<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("connection", &self.inner.connection)
            .finish()
    }
}

struct ClientInner<R: Renderer> {
    /// Configuration this instance was built with
    config: Config,
    connection: ConnectionManager<R>,
}

impl<R: Renderer> Client<R> {
    /// Validate `endpoint` and `config`, then start connecting right away.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(endpoint: &str, config: Config, renderer: R) -> Result<Self> {
        Self::with_observer(endpoint, config, renderer, NoopObserver)
    }

    /// Like [`Self::new`], reporting lifecycle events to `observer`.
    pub fn with_observer<O: ConnectionObserver>(
        endpoint: &str,
        config: Config,
        renderer: R,
        observer: O,
    ) -> Result<Self> {
        let client = Self::unconnected(endpoint, config, renderer, observer)?;
        client.connect();
        Ok(client)
    }

    /// Build the instance in the `Closed` state. Nothing is opened until [`Self::connect`].
    pub fn unconnected<O: ConnectionObserver>(
        endpoint: &str,
        config: Config,
        renderer: R,
        observer: O,
    ) -> Result<Self> {
        config.validate()?;

        let endpoint = validate_url(endpoint).inspect_err(|violation| {
            SecurityLog::from(&config.security).rejected(violation);
        })?;

        let engine = Arc::new(Engine::new(&config, Arc::new(renderer)));
        let connection = ConnectionManager::new(
            endpoint,
            config.reconnect.clone(),
            config.max_message_size,
            engine,
            Arc::new(observer),
        );

        Ok(Self {
            inner: Arc::new(ClientInner { config, connection }),
        })
    }

    /// Send a raw frame. Fails unless the connection is open.
    pub fn send<S: Into<String>>(&self, frame: S) -> Result<()> {
        self.inner.connection.send(frame)
    }

    /// Build a frame with [`protocol::create_escaped_message`] using this instance's escape
    /// character and send it.
    pub fn send_escaped<S: AsRef<str>>(
        &self,
        verb: &str,
        noun: &str,
        subject: &str,
        options: &[S],
    ) -> Result<()> {
        let frame = protocol::create_escaped_message(
            verb,
            noun,
            subject,
            options,
            self.inner.config.escape_char,
        )?;
        self.send(frame)
    }

    /// Join fields into a frame without escaping.
    #[must_use]
    pub fn create_message<S: AsRef<str>>(
        verb: &str,
        noun: &str,
        subject: &str,
        options: &[S],
    ) -> String {
        protocol::create_message(verb, noun, subject, options)
    }

    /// Bind `verb` to `handler`. Replaces a built-in of the same name.
    pub fn add_message_handler<H: ActionHandler<R>>(&self, verb: &str, handler: H) {
        self.registry().register(verb, handler);
    }

    /// Remove whatever `verb` is bound to, built-ins included. Frames with that verb are
    /// then forwarded as custom events.
    pub fn remove_message_handler(&self, verb: &str) -> bool {
        self.registry().unregister(verb)
    }

    #[must_use]
    pub fn registry(&self) -> &ActionRegistry<R> {
        self.inner.connection.engine().registry()
    }

    /// Open the connection if it is not already running.
    pub fn connect(&self) {
        self.inner.connection.connect();
    }

    /// Close the connection and stop reconnecting. Idempotent.
    pub fn disconnect(&self) {
        self.inner.connection.disconnect();
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.state_receiver()
    }

    /// Messages whose verb has no registered action.
    pub fn messages(&self) -> impl Stream<Item = Result<ParsedMessage>> + use<R> {
        self.inner.connection.messages()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<Engine<R>> {
        self.inner.connection.engine()
    }

    #[must_use]
    pub fn renderer(&self) -> &Arc<R> {
        self.engine().renderer()
    }
}
