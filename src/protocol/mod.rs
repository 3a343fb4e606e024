//! The wire format: `verb|noun|subject[|option1|option2|...]`.
//!
//! Any field from the subject onwards may carry a literal `|` when its content is
//! bracketed by the instance's escape character (`~` by default):
//!
//! ```
//! use ws_hypermedia::protocol::{FrameLimits, parse};
//!
//! let message = parse("update|content|~<p>A | B</p>~", &FrameLimits::default()).unwrap();
//!
//! assert_eq!(message.noun, "content");
//! assert_eq!(message.subject, "<p>A | B</p>");
//! ```
//!
//! Fields are never sanitized. Whatever the server sends is what the renderer receives.

pub mod parser;
pub mod version;

pub use parser::{
    FrameLimits, ParsedMessage, SEPARATOR, create_escaped_message, create_message, escape_field,
    parse,
};
pub use version::ProtocolVersion;

/// Verb of the control frame a server uses to announce its protocol version.
pub const VERSION_VERB: &str = "version";
