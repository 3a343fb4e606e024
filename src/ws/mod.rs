//! WebSocket transport.
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: owns the socket, feeds frames to the [`Engine`](crate::engine::Engine)
//!   and reconnects with [`ReconnectBackoff`]
//! - [`ConnectionObserver`]: lifecycle callbacks, also implemented by the closure-based [`Hooks`]
//!
//! Most applications go through [`Client`](crate::client::Client) instead of using these directly.

pub mod connection;
pub mod error;
pub mod reconnect;
pub mod traits;

pub use connection::{ConnectionManager, ConnectionState};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use reconnect::ReconnectBackoff;
pub use traits::*;
