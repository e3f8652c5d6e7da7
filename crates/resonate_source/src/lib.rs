//! Source text bookkeeping for diagnostics.
//!
//! HEART text handed to the parser is registered in a [`SourceDb`], which
//! assigns it a [`FileId`]. IR nodes and diagnostics carry a [`Span`] into
//! that text, or [`Span::DUMMY`] when they were built programmatically.

#![warn(missing_docs)]

pub mod source_db;
pub mod span;

pub use source_db::{Location, SourceDb, SourceFile};
pub use span::{FileId, Span};
