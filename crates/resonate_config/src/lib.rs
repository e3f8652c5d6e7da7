//! Build settings for the resonate compiler core.
//!
//! Limits such as the call-stack budget or the longest allowed delay line
//! are read from the `[build]` table of a `resonate.toml` file into a
//! strongly-typed [`BuildSettings`].

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_settings, load_settings_from_str};
pub use types::*;
