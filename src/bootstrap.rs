//! Build a [`Client`] from `data-*` attributes on a host element.
//!
//! ```
//! use ws_hypermedia::bootstrap::BootstrapOptions;
//!
//! let options = BootstrapOptions::from_attributes([
//!     ("data-ws-url", "wss://example.com/live"),
//!     ("data-reconnect-delay", "250"),
//!     ("data-escape-char", "^"),
//! ])
//! .unwrap()
//! .expect("url attribute is present");
//!
//! assert_eq!(options.endpoint, "wss://example.com/live");
//! assert_eq!(options.config.escape_char, '^');
//! ```

use std::str::FromStr;
use std::time::Duration;

use crate::Result;
use crate::client::Client;
use crate::config::Config;
use crate::error::Error;
use crate::render::Renderer;
use crate::ws::ConnectionObserver;

/// Attribute naming the endpoint. Without it there is nothing to bootstrap.
pub const URL_ATTRIBUTE: &str = "data-ws-url";

/// Endpoint and configuration read from element attributes.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub endpoint: String,
    pub config: Config,
}

impl BootstrapOptions {
    /// Read `data-ws-url` and any configuration attributes.
    ///
    /// Returns `Ok(None)` when `data-ws-url` is missing or blank. Unknown attributes are
    /// ignored; a recognized attribute with an unparseable value is an error.
    pub fn from_attributes<I, K, V>(attributes: I) -> Result<Option<Self>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut endpoint = None;
        let mut config = Config::default();

        for (name, value) in attributes {
            let name = name.as_ref();
            let value = value.as_ref().trim();

            match name {
                URL_ATTRIBUTE => {
                    if !value.is_empty() {
                        endpoint = Some(value.to_owned());
                    }
                }
                "data-auto-reconnect" => config.reconnect.auto_reconnect = flag(name, value)?,
                "data-reconnect-delay" => {
                    config.reconnect.reconnect_delay = Duration::from_millis(number(name, value)?);
                }
                "data-max-reconnect-attempts" => {
                    config.reconnect.max_reconnect_attempts = number(name, value)?;
                }
                "data-escape-char" => config.escape_char = single_char(name, value)?,
                "data-max-message-size" => config.max_message_size = number(name, value)?,
                "data-max-parts" => config.max_parts = number(name, value)?,
                "data-max-json-size" => config.security.max_json_size = number(name, value)?,
                "data-enable-json-validation" => {
                    config.security.enable_json_validation = flag(name, value)?;
                }
                "data-enable-security-logging" => {
                    config.security.enable_security_logging = flag(name, value)?;
                }
                "data-security-log-level" => config.security.security_log_level = value.parse()?,
                "data-protocol-version" => config.protocol_version = value.parse()?,
                "data-require-version" => config.require_version = flag(name, value)?,
                _ => {}
            }
        }

        Ok(endpoint.map(|endpoint| Self { endpoint, config }))
    }
}

/// Build and connect a client from element attributes.
///
/// Returns `Ok(None)` when there is no `data-ws-url`. Must be called from within a Tokio
/// runtime.
pub fn bootstrap<I, K, V, R, O>(attributes: I, renderer: R, observer: O) -> Result<Option<Client<R>>>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
    R: Renderer,
    O: ConnectionObserver,
{
    let Some(options) = BootstrapOptions::from_attributes(attributes)? else {
        #[cfg(feature = "tracing")]
        tracing::debug!("No {URL_ATTRIBUTE} attribute, skipping bootstrap");
        return Ok(None);
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(endpoint = %options.endpoint, "Bootstrapping from attributes");

    Client::with_observer(&options.endpoint, options.config, renderer, observer).map(Some)
}

fn flag(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_e| invalid(name, value))
}

fn single_char(name: &str, value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch),
        _ => Err(invalid(name, value)),
    }
}

fn invalid(name: &str, value: &str) -> Error {
    Error::validation(format!("attribute {name} has invalid value {value:?}"))
}
