//! Verb to action dispatch.
//!
//! # Architecture
//!
//! - [`Verb`]: the built-in table, one variant per renderer primitive
//! - [`ActionRegistry`]: verb to [`Action`] mapping, seeded with every built-in
//! - [`ActionHandler`]: trait implemented by application-defined actions
//!
//! A verb missing from the registry resolves to [`Resolution::Unknown`] and is handed
//! back to the application as a custom event instead of being dropped.

pub(crate) mod builtin;
pub mod registry;
pub mod verb;

pub use builtin::ANIMATION_STATE_EVENT;
pub use registry::{ActionHandler, ActionRegistry, Action, Invocation, Resolution};
pub use verb::Verb;
