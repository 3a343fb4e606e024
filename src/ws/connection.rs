#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Instant;

use async_stream::try_stream;
use backoff::backoff::Backoff as _;
use futures::future::BoxFuture;
use futures::{FutureExt as _, SinkExt as _, Stream, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::error::{Error as TungsteniteError, ProtocolError as WireError};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::error::WsError;
use super::reconnect::ReconnectBackoff;
use super::traits::ConnectionObserver;
use crate::Result;
use crate::config::ReconnectConfig;
use crate::engine::{Dispatch, Engine};
use crate::error::{Error, ProtocolError};
use crate::protocol::ParsedMessage;
use crate::render::Renderer;
use crate::security::validate_message_size;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Broadcast channel capacity for forwarded messages.
const BROADCAST_CAPACITY: usize = 1024;

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Opening the transport, first time or after a backoff delay
    Connecting,
    /// Transport open, frames flowing
    Open {
        /// When the connection was established
        since: Instant,
    },
    /// `disconnect()` was called and the transport is shutting down
    Closing,
    /// No transport. Either waiting to reconnect or stopped for good.
    Closed,
}

impl ConnectionState {
    /// Check if frames can currently be sent.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open { .. })
    }

    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Owns one WebSocket transport and feeds its frames to an [`Engine`].
///
/// - Frames are handed to the engine strictly in arrival order
/// - Unknown verbs go to [`ConnectionObserver::on_message`] and to [`Self::messages`]
/// - Closed transports are reopened with a doubling delay until the attempt budget is spent
///
/// Cloning is cheap; clones drive the same connection.
pub struct ConnectionManager<R: Renderer> {
    inner: Arc<Shared<R>>,
}

impl<R: Renderer> Clone for ConnectionManager<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Shared<R: Renderer> {
    endpoint: Url,
    reconnect: ReconnectConfig,
    max_message_size: usize,
    engine: Arc<Engine<R>>,
    observer: Arc<dyn ConnectionObserver>,
    state_tx: watch::Sender<ConnectionState>,
    /// Writer half of the current transport, present only while open
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    /// Stop signal for the running connection loop
    shutdown: Mutex<Option<CancellationToken>>,
    broadcast_tx: broadcast::Sender<ParsedMessage>,
}

impl<R: Renderer> fmt::Debug for ConnectionManager<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("state", &self.state())
            .field("reconnect", &self.inner.reconnect)
            .finish_non_exhaustive()
    }
}

impl<R: Renderer> ConnectionManager<R> {
    /// Create a manager in the `Closed` state. Nothing happens until [`Self::connect`].
    #[must_use]
    pub fn new(
        endpoint: Url,
        reconnect: ReconnectConfig,
        max_message_size: usize,
        engine: Arc<Engine<R>>,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Closed);
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);

        Self {
            inner: Arc::new(Shared {
                endpoint,
                reconnect,
                max_message_size,
                engine,
                observer,
                state_tx,
                outbound: Mutex::new(None),
                shutdown: Mutex::new(None),
                broadcast_tx,
            }),
        }
    }

    /// Start the connection loop. Does nothing while a loop is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self) {
        let mut shutdown = lock(&self.inner.shutdown);
        if shutdown.as_ref().is_some_and(|token| !token.is_cancelled()) {
            return;
        }

        let token = CancellationToken::new();
        *shutdown = Some(token.clone());
        drop(shutdown);

        self.inner.state_tx.send_replace(ConnectionState::Connecting);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.connection_loop(token).await;
        });
    }

    /// Close the transport and cancel any pending reconnect. Idempotent.
    ///
    /// Handler futures already detached keep running.
    pub fn disconnect(&self) {
        let token = lock(&self.inner.shutdown).take();

        match token {
            Some(token) if !token.is_cancelled() => {
                self.inner.state_tx.send_replace(ConnectionState::Closing);
                token.cancel();
            }
            _ => {
                self.inner.state_tx.send_if_modified(set_closed);
            }
        }
    }

    /// Queue a raw frame for the server.
    pub fn send<S: Into<String>>(&self, frame: S) -> Result<()> {
        let frame = frame.into();

        if let Err(violation) = validate_message_size(&frame, self.inner.max_message_size) {
            self.inner.engine.security_log().rejected(&violation);
            return Err(violation.into());
        }
        if !self.state().is_open() {
            return Err(WsError::NotConnected.into());
        }

        let outbound = lock(&self.inner.outbound);
        let sender = outbound.as_ref().ok_or(WsError::NotConnected)?;
        sender.send(frame).map_err(|_e| WsError::NotConnected)?;
        Ok(())
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<Engine<R>> {
        &self.inner.engine
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Stream of messages whose verb has no registered action.
    ///
    /// Each call returns an independent stream that starts with the next forwarded message.
    /// A subscriber that falls behind by more than the channel capacity receives
    /// [`WsError::Lagged`] as its last item.
    pub fn messages(&self) -> impl Stream<Item = Result<ParsedMessage>> + use<R> {
        let mut rx = self.inner.broadcast_tx.subscribe();

        try_stream! {
            loop {
                match rx.recv().await {
                    Ok(message) => yield message,
                    Err(RecvError::Lagged(n)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Message stream lagged, missed {n} messages");
                        Err(WsError::Lagged { count: n })?;
                    }
                    Err(RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }
}

impl<R: Renderer> Shared<R> {
    /// Main connection loop with automatic reconnection.
    async fn connection_loop(self: Arc<Self>, token: CancellationToken) {
        let mut backoff = ReconnectBackoff::new(self.reconnect.clone());

        loop {
            self.set_state(&token, ConnectionState::Connecting);

            let attempt = timeout(
                self.reconnect.connect_timeout,
                connect_async(self.endpoint.as_str()),
            );
            let connected = tokio::select! {
                () = token.cancelled() => break,
                result = attempt => match result {
                    Ok(connected) => connected.map_err(Error::from),
                    Err(_elapsed) => Err(WsError::Timeout.into()),
                },
            };

            match connected {
                Ok((ws_stream, _)) => {
                    backoff.reset();
                    self.engine.reset_session();

                    let (sender_tx, sender_rx) = mpsc::unbounded_channel();
                    *lock(&self.outbound) = Some(sender_tx.clone());
                    self.set_state(
                        &token,
                        ConnectionState::Open {
                            since: Instant::now(),
                        },
                    );

                    #[cfg(feature = "tracing")]
                    tracing::debug!(endpoint = %self.endpoint, "WebSocket connected");
                    self.observer.on_connect();

                    let outcome = self.handle_connection(ws_stream, sender_rx, &token).await;
                    self.release_outbound(&sender_tx);

                    if let Err(e) = outcome {
                        #[cfg(feature = "tracing")]
                        tracing::error!("Error handling connection: {e:?}");
                        self.observer.on_error(&e);
                    }
                    self.observer.on_disconnect();
                }
                Err(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Unable to connect: {error:?}");
                    self.observer.on_error(&error);
                    self.observer.on_disconnect();
                }
            }

            if token.is_cancelled() {
                break;
            }
            self.set_state(&token, ConnectionState::Closed);

            if !self.reconnect.auto_reconnect {
                break;
            }

            let Some(delay) = backoff.next_backoff() else {
                let error = Error::from(WsError::ReconnectExhausted {
                    attempts: backoff.attempts(),
                });
                #[cfg(feature = "tracing")]
                tracing::error!(endpoint = %self.endpoint, "{error}");
                self.observer.on_error(&error);
                break;
            };

            #[cfg(feature = "tracing")]
            tracing::debug!(
                attempt = backoff.attempts(),
                max = self.reconnect.max_reconnect_attempts,
                ?delay,
                "Reconnecting"
            );

            tokio::select! {
                () = token.cancelled() => break,
                () = sleep(delay) => {}
            }
        }

        // Lets connect() start a fresh loop and completes a pending disconnect().
        token.cancel();
        self.state_tx.send_if_modified(|state| {
            if matches!(state, ConnectionState::Closing) {
                *state = ConnectionState::Closed;
                true
            } else {
                false
            }
        });
    }

    /// Handle an active WebSocket connection.
    ///
    /// Returns `Ok` when the server sent a close frame or the client shut down. A transport
    /// that ends without a close frame is [`WsError::ConnectionClosed`].
    async fn handle_connection(
        &self,
        ws_stream: WsStream,
        mut sender_rx: mpsc::UnboundedReceiver<String>,
        token: &CancellationToken,
    ) -> Result<()> {
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                () = token.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(endpoint = %self.endpoint, "Closing WebSocket");
                    let close = write.send(Message::Close(None));
                    _ = timeout(self.reconnect.close_timeout, close).await;
                    return Ok(());
                }

                // Handle incoming messages
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let frame = text.as_str();
                            #[cfg(feature = "tracing")]
                            tracing::trace!(%frame, "Received frame");
                            if panic::catch_unwind(AssertUnwindSafe(|| self.handle_frame(frame))).is_err() {
                                #[cfg(feature = "tracing")]
                                tracing::error!(%frame, "Observer panicked while handling frame");
                            }
                        }
                        Some(Ok(Message::Close(_))) => return Ok(()),
                        None
                        | Some(Err(TungsteniteError::Protocol(
                            WireError::ResetWithoutClosingHandshake,
                        ))) => return Err(WsError::ConnectionClosed.into()),
                        Some(Err(e)) => return Err(e.into()),
                        Some(Ok(_)) => {
                            // Binary frames and control frames carry no actions.
                        }
                    }
                }

                // Handle outgoing frames
                Some(text) = sender_rx.recv() => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(frame = %text, "Sending frame");
                    write.send(Message::Text(text.into())).await?;
                }
            }
        }
    }

    fn handle_frame(&self, frame: &str) {
        match self.engine.process(frame) {
            Dispatch::Applied(_) | Dispatch::Negotiated(_) | Dispatch::Failed(_) => {}
            Dispatch::Pending(task) => run_handler(task),
            Dispatch::Forwarded(message) => {
                self.observer.on_message(frame, &message);
                _ = self.broadcast_tx.send(message);
            }
            Dispatch::Skipped(error) => {
                if matches!(
                    error.downcast_ref::<ProtocolError>(),
                    Some(ProtocolError::VersionMismatch { .. })
                ) {
                    self.observer.on_error(&error);
                }
            }
        }
    }

    fn release_outbound(&self, sender: &mpsc::UnboundedSender<String>) {
        release_sender(&mut lock(&self.outbound), sender);
    }

    /// State change from the loop. Ignored once the loop was told to stop, so a late
    /// transition cannot overwrite what `disconnect()` set.
    fn set_state(&self, token: &CancellationToken, next: ConnectionState) {
        self.state_tx.send_if_modified(|state| {
            if token.is_cancelled() || *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }
}

/// Poll a handler once in place; detach it if it has to wait.
fn run_handler(mut task: BoxFuture<'static, Result<()>>) {
    let mut cx = Context::from_waker(futures::task::noop_waker_ref());

    match task.poll_unpin(&mut cx) {
        Poll::Ready(outcome) => report_handler(outcome),
        Poll::Pending => {
            tokio::spawn(async move {
                report_handler(task.await);
            });
        }
    }
}

fn report_handler(outcome: Result<()>) {
    if let Err(e) = outcome {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %e, "Action handler failed");
        #[cfg(not(feature = "tracing"))]
        let _ = &e;
    }
}

/// Clear `slot` only if it still holds `sender`. A loop that finishes late must not take
/// the sender of the loop that replaced it.
fn release_sender(
    slot: &mut Option<mpsc::UnboundedSender<String>>,
    sender: &mpsc::UnboundedSender<String>,
) -> bool {
    if slot
        .as_ref()
        .is_some_and(|current| current.same_channel(sender))
    {
        slot.take();
        true
    } else {
        false
    }
}

fn set_closed(state: &mut ConnectionState) -> bool {
    if state.is_closed() {
        false
    } else {
        *state = ConnectionState::Closed;
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
