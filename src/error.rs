use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use crate::protocol::ProtocolVersion;
pub use crate::security::SecurityViolation;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Error related to invalid arguments or configuration
    Validation,
    /// A frame, URL, identifier or JSON payload was rejected by a security check
    Security,
    /// A frame could not be applied (missing element, missing argument, version gate)
    Protocol,
    /// A custom action handler failed or panicked
    Handler,
    /// Error related to WebSocket connections
    WebSocket,
    /// Internal error from dependencies or from the host renderer
    Internal,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Validation {
            reason: message.into(),
        }
        .into()
    }

    /// Failure reported by a custom action handler.
    pub fn handler<S: Into<String>>(verb: &str, message: S) -> Self {
        HandlerError {
            verb: verb.to_owned(),
            message: message.into(),
        }
        .into()
    }

    /// Failure reported by the host [`Renderer`](crate::render::Renderer).
    pub fn render<S: Into<String>>(message: S) -> Self {
        RenderError {
            message: message.into(),
        }
        .into()
    }

    #[must_use]
    pub fn element_not_found(id: &str) -> Self {
        ProtocolError::ElementNotFound(id.to_owned()).into()
    }

    #[must_use]
    pub fn missing_argument(verb: &'static str, argument: &'static str) -> Self {
        ProtocolError::MissingArgument { verb, argument }.into()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Validation {}

/// A frame that parsed cleanly but could not be applied.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The noun did not resolve to an element
    ElementNotFound(String),
    /// A verb was sent without an argument it cannot work without
    MissingArgument {
        verb: &'static str,
        argument: &'static str,
    },
    /// `require_version` is set and the server has not announced a version yet
    VersionRequired,
    /// The server announced a version with a different major number
    VersionMismatch {
        expected: ProtocolVersion,
        received: ProtocolVersion,
    },
    /// A `version` frame did not carry `major.minor`
    InvalidVersion(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElementNotFound(id) => write!(f, "element not found: {id}"),
            Self::MissingArgument { verb, argument } => write!(f, "{verb}: missing {argument}"),
            Self::VersionRequired => write!(f, "frame received before protocol version"),
            Self::VersionMismatch { expected, received } => write!(
                f,
                "protocol version mismatch: expected {expected}, server speaks {received}"
            ),
            Self::InvalidVersion(raw) => write!(f, "invalid protocol version: {raw:?}"),
        }
    }
}

impl StdError for ProtocolError {}

#[non_exhaustive]
#[derive(Debug)]
pub struct HandlerError {
    pub verb: String,
    pub message: String,
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler for {:?} failed: {}", self.verb, self.message)
    }
}

impl StdError for HandlerError {}

#[non_exhaustive]
#[derive(Debug)]
pub struct RenderError {
    pub message: String,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "renderer error: {}", self.message)
    }
}

impl StdError for RenderError {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Validation, e)
    }
}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

impl From<SecurityViolation> for Error {
    fn from(err: SecurityViolation) -> Self {
        Error::with_source(Kind::Security, err)
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::with_source(Kind::Protocol, err)
    }
}

impl From<HandlerError> for Error {
    fn from(err: HandlerError) -> Self {
        Error::with_source(Kind::Handler, err)
    }
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        Error::with_source(Kind::Internal, err)
    }
}
