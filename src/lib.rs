#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod actions;
#[cfg(feature = "ws")]
pub mod bootstrap;
#[cfg(feature = "ws")]
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod render;
pub mod security;
pub mod types;
#[cfg(feature = "ws")]
pub mod ws;

#[cfg(feature = "ws")]
pub use client::Client;
pub use config::Config;
pub use engine::{Dispatch, Engine};
pub use error::Error;
pub use protocol::ParsedMessage;
pub use render::Renderer;

pub type Result<T> = std::result::Result<T, Error>;
