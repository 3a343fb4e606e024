//! Frame pipeline: tokenize, check, resolve, apply.
//!
//! [`Engine::process`] never panics and never returns an error. Each frame ends in exactly
//! one [`Dispatch`] outcome that the caller may log, forward or await, but a bad frame can
//! never stop the frames behind it. The engine does no I/O; the WebSocket layer feeds it,
//! and so can any other host loop.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt as _;
use futures::future::BoxFuture;

use crate::Result;
use crate::actions::builtin;
use crate::actions::{ActionRegistry, Invocation, Resolution, Verb};
use crate::config::Config;
use crate::error::{Error, ProtocolError};
use crate::protocol::{FrameLimits, ParsedMessage, ProtocolVersion, VERSION_VERB, parse};
use crate::render::Renderer;
use crate::security::{JsonPolicy, SecurityLog, validate_element_id};

/// How one frame was handled.
#[non_exhaustive]
pub enum Dispatch {
    /// A built-in verb ran to completion
    Applied(Verb),
    /// A custom handler was bound. The future runs the handler and has not been polled;
    /// poll it right away to keep arrival order, then detach it if it is still pending.
    /// Panics inside it surface as [`Kind::Handler`](crate::error::Kind::Handler) errors.
    Pending(BoxFuture<'static, Result<()>>),
    /// Verb has no binding; the application decides what it means
    Forwarded(ParsedMessage),
    /// A `version` control frame with a compatible version
    Negotiated(ProtocolVersion),
    /// Frame was dropped before reaching a handler
    Skipped(Error),
    /// Handler ran and failed
    Failed(Error),
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied(verb) => f.debug_tuple("Applied").field(verb).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
            Self::Forwarded(message) => f.debug_tuple("Forwarded").field(message).finish(),
            Self::Negotiated(version) => f.debug_tuple("Negotiated").field(version).finish(),
            Self::Skipped(e) => f.debug_tuple("Skipped").field(e).finish(),
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

/// Parser, validator and registry bound to one renderer.
pub struct Engine<R: Renderer> {
    renderer: Arc<R>,
    registry: ActionRegistry<R>,
    limits: FrameLimits,
    json: JsonPolicy,
    security: SecurityLog,
    protocol_version: ProtocolVersion,
    require_version: bool,
    /// Set once the server announced a compatible version on the current connection
    negotiated: AtomicBool,
}

impl<R: Renderer> fmt::Debug for Engine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("limits", &self.limits)
            .field("protocol_version", &self.protocol_version)
            .field("require_version", &self.require_version)
            .field("negotiated", &self.negotiated)
            .finish_non_exhaustive()
    }
}

impl<R: Renderer> Engine<R> {
    #[must_use]
    pub fn new(config: &Config, renderer: Arc<R>) -> Self {
        Self::with_registry(config, renderer, ActionRegistry::new())
    }

    #[must_use]
    pub fn with_registry(config: &Config, renderer: Arc<R>, registry: ActionRegistry<R>) -> Self {
        Self {
            renderer,
            registry,
            limits: config.frame_limits(),
            json: config.json_policy(),
            security: SecurityLog::from(&config.security),
            protocol_version: config.protocol_version,
            require_version: config.require_version,
            negotiated: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ActionRegistry<R> {
        &self.registry
    }

    #[must_use]
    pub fn renderer(&self) -> &Arc<R> {
        &self.renderer
    }

    #[must_use]
    pub fn limits(&self) -> &FrameLimits {
        &self.limits
    }

    #[must_use]
    pub fn security_log(&self) -> &SecurityLog {
        &self.security
    }

    /// Forget the negotiated version. Called for every new connection.
    pub fn reset_session(&self) {
        self.negotiated.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_negotiated(&self) -> bool {
        self.negotiated.load(Ordering::Acquire)
    }

    /// Run one raw frame through the whole pipeline.
    pub fn process(&self, frame: &str) -> Dispatch {
        #[cfg(feature = "tracing")]
        tracing::trace!(%frame, "Processing frame");

        match parse(frame, &self.limits) {
            Ok(message) => self.dispatch(message),
            Err(violation) => {
                self.security.rejected(&violation);
                Dispatch::Skipped(violation.into())
            }
        }
    }

    /// Run an already tokenized message. Panics raised by built-ins or by the renderer
    /// are caught here and reported as [`Dispatch::Failed`].
    pub fn dispatch(&self, message: ParsedMessage) -> Dispatch {
        let verb = message.verb.clone();

        panic::catch_unwind(AssertUnwindSafe(|| self.dispatch_unguarded(message))).unwrap_or_else(
            |payload| {
                let error = Error::handler(&verb, panic_message(payload.as_ref()));
                #[cfg(feature = "tracing")]
                tracing::error!(%verb, %error, "Action panicked");
                Dispatch::Failed(error)
            },
        )
    }

    fn dispatch_unguarded(&self, message: ParsedMessage) -> Dispatch {
        if message.verb == VERSION_VERB {
            return self.negotiate(&message.subject);
        }

        if self.require_version && !self.is_negotiated() {
            #[cfg(feature = "tracing")]
            tracing::warn!(verb = %message.verb, "Dropping frame received before protocol version");
            return Dispatch::Skipped(ProtocolError::VersionRequired.into());
        }

        let resolution = self.registry.resolve(&message.verb);
        if matches!(resolution, Resolution::Unknown) {
            #[cfg(feature = "tracing")]
            tracing::debug!(verb = %message.verb, "Forwarding unknown verb");
            return Dispatch::Forwarded(message);
        }

        if let Err(violation) = validate_element_id(&message.noun) {
            self.security.rejected(&violation);
            return Dispatch::Skipped(violation.into());
        }

        let Some(target) = self.renderer.resolve_element(&message.noun) else {
            #[cfg(feature = "tracing")]
            tracing::warn!(verb = %message.verb, noun = %message.noun, "Element not found");
            return Dispatch::Skipped(Error::element_not_found(&message.noun));
        };

        match resolution {
            Resolution::Builtin(verb) => {
                match builtin::apply(verb, self.renderer.as_ref(), &target, &message, &self.json) {
                    Ok(()) => Dispatch::Applied(verb),
                    Err(error) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(%verb, noun = %message.noun, %error, "Action failed");
                        Dispatch::Failed(error)
                    }
                }
            }
            Resolution::Custom(handler) => {
                let ParsedMessage {
                    verb,
                    subject,
                    options,
                    ..
                } = message;
                let invocation = Invocation::new(
                    Arc::clone(&self.renderer),
                    target,
                    verb.clone(),
                    subject,
                    options,
                );

                let task = async move { handler.handle(invocation).await };
                Dispatch::Pending(
                    AssertUnwindSafe(task)
                        .catch_unwind()
                        .map(move |outcome| {
                            outcome.unwrap_or_else(|payload| {
                                Err(Error::handler(&verb, panic_message(payload.as_ref())))
                            })
                        })
                        .boxed(),
                )
            }
            Resolution::Unknown => Dispatch::Forwarded(message),
        }
    }

    fn negotiate(&self, raw: &str) -> Dispatch {
        let received = match raw.parse::<ProtocolVersion>() {
            Ok(version) => version,
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%error, "Ignoring malformed version frame");
                return Dispatch::Skipped(error);
            }
        };

        if received.is_compatible_with(self.protocol_version) {
            self.negotiated.store(true, Ordering::Release);
            #[cfg(feature = "tracing")]
            tracing::debug!(%received, "Protocol version negotiated");
            Dispatch::Negotiated(received)
        } else {
            self.negotiated.store(false, Ordering::Release);
            let error = ProtocolError::VersionMismatch {
                expected: self.protocol_version,
                received,
            };
            #[cfg(feature = "tracing")]
            tracing::warn!(%error, "Incompatible protocol version");
            Dispatch::Skipped(error.into())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_owned()
    }
}
