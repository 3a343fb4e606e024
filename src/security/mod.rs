//! Input validation for everything that arrives over, or is about to open, a socket.
//!
//! Every check is a free function returning a [`SecurityViolation`] on rejection so the
//! caller decides whether to skip the operation or fail construction. None of them panic,
//! and turning a check off in [`SecurityConfig`] only skips that check: frames are still
//! parsed and JSON is still required to be well formed.

mod json;

use std::error::Error as StdError;
use std::fmt;

use url::Url;

pub use json::{FORBIDDEN_KEYS, JsonPolicy, safe_merge, validate_json};

use crate::config::{SecurityConfig, SecurityLogLevel};

/// Longest element identifier accepted by [`validate_element_id`].
pub const MAX_ELEMENT_ID_LEN: usize = 100;

/// Reason an input was refused.
#[non_exhaustive]
#[derive(Debug)]
pub enum SecurityViolation {
    /// Frame is larger than `max_message_size`
    MessageTooLarge { size: usize, max: usize },
    /// Frame has more than `max_parts` pipe-separated fields
    TooManyParts { max: usize },
    /// Endpoint is not a parseable URL
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    /// Endpoint uses something other than `ws` or `wss`
    UnsupportedScheme(String),
    /// Noun is empty, too long, or contains characters outside `[A-Za-z0-9_-]`
    InvalidElementId(String),
    /// JSON payload is larger than `max_json_size`
    JsonTooLarge { size: usize, max: usize },
    /// JSON payload carries a key that could reach a shared prototype
    ForbiddenJsonKey(&'static str),
    /// JSON payload does not parse
    MalformedJson(serde_json::Error),
}

impl SecurityViolation {
    /// Short, stable name of the check that produced this violation.
    #[must_use]
    pub const fn check(&self) -> &'static str {
        match self {
            Self::MessageTooLarge { .. } => "message_size",
            Self::TooManyParts { .. } => "message_parts",
            Self::InvalidUrl { .. } | Self::UnsupportedScheme(_) => "url",
            Self::InvalidElementId(_) => "element_id",
            Self::JsonTooLarge { .. } | Self::ForbiddenJsonKey(_) | Self::MalformedJson(_) => {
                "json"
            }
        }
    }
}

impl fmt::Display for SecurityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageTooLarge { size, max } => {
                write!(f, "message of {size} bytes exceeds limit of {max} bytes")
            }
            Self::TooManyParts { max } => write!(f, "message has more than {max} parts"),
            Self::InvalidUrl { url, source } => write!(f, "invalid URL {url:?}: {source}"),
            Self::UnsupportedScheme(scheme) => {
                write!(f, "unsupported URL scheme {scheme:?}, expected ws or wss")
            }
            Self::InvalidElementId(id) => write!(f, "invalid element id {id:?}"),
            Self::JsonTooLarge { size, max } => {
                write!(f, "JSON payload of {size} bytes exceeds limit of {max} bytes")
            }
            Self::ForbiddenJsonKey(key) => write!(f, "JSON payload contains forbidden key {key}"),
            Self::MalformedJson(e) => write!(f, "malformed JSON payload: {e}"),
        }
    }
}

impl StdError for SecurityViolation {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::InvalidUrl { source, .. } => Some(source),
            Self::MalformedJson(e) => Some(e),
            _ => None,
        }
    }
}

/// Accept only `ws://` and `wss://` endpoints.
pub fn validate_url(url: &str) -> Result<Url, SecurityViolation> {
    let parsed = Url::parse(url).map_err(|source| SecurityViolation::InvalidUrl {
        url: url.to_owned(),
        source,
    })?;

    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(SecurityViolation::UnsupportedScheme(other.to_owned())),
    }
}

/// Accept 1 to 100 characters from `[A-Za-z0-9_-]`.
pub fn validate_element_id(id: &str) -> Result<(), SecurityViolation> {
    let well_formed = !id.is_empty()
        && id.len() <= MAX_ELEMENT_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');

    if well_formed {
        Ok(())
    } else {
        Err(SecurityViolation::InvalidElementId(id.to_owned()))
    }
}

/// Reject frames longer than `max_size` bytes.
pub fn validate_message_size(frame: &str, max_size: usize) -> Result<(), SecurityViolation> {
    if frame.len() > max_size {
        return Err(SecurityViolation::MessageTooLarge {
            size: frame.len(),
            max: max_size,
        });
    }
    Ok(())
}

/// Reject a running field count above `max_parts`.
pub fn validate_part_count(parts: usize, max_parts: usize) -> Result<(), SecurityViolation> {
    if parts > max_parts {
        return Err(SecurityViolation::TooManyParts { max: max_parts });
    }
    Ok(())
}

/// Emits one structured event per rejected input when security logging is on.
#[derive(Debug, Clone, Copy)]
pub struct SecurityLog {
    enabled: bool,
    level: SecurityLogLevel,
}

impl SecurityLog {
    #[must_use]
    pub const fn new(enabled: bool, level: SecurityLogLevel) -> Self {
        Self { enabled, level }
    }

    #[must_use]
    pub const fn disabled() -> Self {
        Self::new(false, SecurityLogLevel::Warn)
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a rejection. Silent unless enabled.
    pub fn rejected(&self, violation: &SecurityViolation) {
        if !self.enabled {
            return;
        }

        #[cfg(feature = "tracing")]
        match self.level {
            SecurityLogLevel::Warn => tracing::warn!(
                target: "ws_hypermedia::security",
                check = violation.check(),
                %violation,
                "Security check rejected input"
            ),
            SecurityLogLevel::Error => tracing::error!(
                target: "ws_hypermedia::security",
                check = violation.check(),
                %violation,
                "Security check rejected input"
            ),
        }
        #[cfg(not(feature = "tracing"))]
        let _ = (violation, self.level);
    }
}

impl From<&SecurityConfig> for SecurityLog {
    fn from(config: &SecurityConfig) -> Self {
        Self::new(config.enable_security_logging, config.security_log_level)
    }
}
