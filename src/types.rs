//! Re-exported types from external crates for convenience.
//!
//! These types appear in this crate's public API and are re-exported here
//! so users don't need to add these dependencies to their `Cargo.toml`.

/// JSON object and value types carried by `trigger` event data.
pub use serde_json::{Map, Value};
/// Parsed WebSocket endpoint, as returned by [`validate_url`](crate::security::validate_url).
pub use url::Url;
