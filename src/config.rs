#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::str::FromStr;
use std::time::Duration;

use bon::Builder;

use crate::Result;
use crate::error::Error;
use crate::protocol::{FrameLimits, ProtocolVersion, SEPARATOR};
use crate::security::{JsonPolicy, SecurityLog};

pub const DEFAULT_ESCAPE_CHAR: char = '~';
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;
pub const DEFAULT_MAX_PARTS: usize = 100;
pub const DEFAULT_MAX_JSON_SIZE: usize = 1024 * 1024;
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for one protocol instance. Immutable once a client is built from it.
///
/// ```
/// use std::time::Duration;
///
/// use ws_hypermedia::config::{Config, ReconnectConfig};
///
/// let config = Config::builder()
///     .escape_char('^')
///     .max_parts(16)
///     .reconnect(
///         ReconnectConfig::builder()
///             .reconnect_delay(Duration::from_millis(250))
///             .build(),
///     )
///     .build();
///
/// assert_eq!(config.escape_char, '^');
/// assert!(config.reconnect.auto_reconnect);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// Reconnection strategy configuration
    #[builder(default)]
    pub reconnect: ReconnectConfig,
    /// Character bracketing a field that contains a literal `|`
    #[builder(default = DEFAULT_ESCAPE_CHAR)]
    pub escape_char: char,
    /// Largest accepted frame, in bytes, inbound and outbound
    #[builder(default = DEFAULT_MAX_MESSAGE_SIZE)]
    pub max_message_size: usize,
    /// Largest accepted number of pipe-separated fields
    #[builder(default = DEFAULT_MAX_PARTS)]
    pub max_parts: usize,
    /// JSON validation and security logging toggles
    #[builder(default)]
    pub security: SecurityConfig,
    /// Version this client speaks
    #[builder(default)]
    pub protocol_version: ProtocolVersion,
    /// Drop action frames until the server has announced a compatible version
    #[builder(default)]
    pub require_version: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Config {
    /// Reject configurations the tokenizer or the reconnect loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.escape_char == SEPARATOR {
            return Err(Error::validation(
                "escape character must differ from the field separator",
            ));
        }
        if self.max_message_size == 0 {
            return Err(Error::validation("max_message_size must be > 0"));
        }
        if self.max_parts == 0 {
            return Err(Error::validation("max_parts must be > 0"));
        }
        if self.security.max_json_size == 0 {
            return Err(Error::validation("max_json_size must be > 0"));
        }
        if self.reconnect.auto_reconnect && self.reconnect.reconnect_delay.is_zero() {
            return Err(Error::validation("reconnect_delay must be > 0"));
        }
        if self.reconnect.connect_timeout.is_zero() {
            return Err(Error::validation("connect_timeout must be > 0"));
        }
        Ok(())
    }

    #[must_use]
    pub const fn frame_limits(&self) -> FrameLimits {
        FrameLimits {
            escape_char: self.escape_char,
            max_size: self.max_message_size,
            max_parts: self.max_parts,
        }
    }

    #[must_use]
    pub fn json_policy(&self) -> JsonPolicy {
        JsonPolicy::new(
            self.security.enable_json_validation,
            self.security.max_json_size,
            SecurityLog::from(&self.security),
        )
    }
}

/// Configuration for automatic reconnection behavior.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct ReconnectConfig {
    /// Reconnect after the transport closes or fails
    #[builder(default = true)]
    pub auto_reconnect: bool,
    /// Delay before the first reconnection attempt; doubles for each further attempt
    #[builder(default = DEFAULT_RECONNECT_DELAY)]
    pub reconnect_delay: Duration,
    /// Attempts made before the connection is given up for good
    #[builder(default = DEFAULT_MAX_RECONNECT_ATTEMPTS)]
    pub max_reconnect_attempts: u32,
    /// Upper bound for any single delay
    #[builder(default = DEFAULT_MAX_RECONNECT_DELAY)]
    pub max_reconnect_delay: Duration,
    /// Longest wait for the TCP connect and WebSocket handshake of one attempt
    #[builder(default = DEFAULT_CONNECT_TIMEOUT)]
    pub connect_timeout: Duration,
    /// Longest wait for the close frame to be written on `disconnect()`
    #[builder(default = DEFAULT_CLOSE_TIMEOUT)]
    pub close_timeout: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ReconnectConfig {
    /// Delay before attempt `attempt` (1-indexed): `min(delay * 2^(attempt-1), max)`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.reconnect_delay
            .checked_mul(1_u32 << shift)
            .unwrap_or(self.max_reconnect_delay)
            .min(self.max_reconnect_delay)
    }
}

/// Optional checks. All default to off.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct SecurityConfig {
    /// Run `validate_json` on `trigger` and `keyframe` payloads
    #[builder(default)]
    pub enable_json_validation: bool,
    /// Largest accepted JSON payload when validation is on
    #[builder(default = DEFAULT_MAX_JSON_SIZE)]
    pub max_json_size: usize,
    /// Emit a log event for each rejected input
    #[builder(default)]
    pub enable_security_logging: bool,
    /// Level used for those events
    #[builder(default)]
    pub security_log_level: SecurityLogLevel,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SecurityLogLevel {
    #[default]
    Warn,
    Error,
}

impl FromStr for SecurityLogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(Error::validation(format!(
                "unknown security log level {other:?}, expected warn or error"
            ))),
        }
    }
}
