//! Shared foundational types used across the resonate compiler core.
//!
//! This crate provides the program-wide string dictionary and its [`Ident`]
//! handles, content hashing for fingerprints and cache keys, and the
//! [`InternalError`] type used for implementer errors.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod result;

pub use hash::ContentHash;
pub use ident::{Ident, StringDictionary};
pub use result::{InternalError, InternalResult};
