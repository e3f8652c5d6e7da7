//! Structured diagnostics for the resonate compiler core.
//!
//! Every user-facing failure is a [`Diagnostic`] carrying a severity, a
//! categorised [`DiagnosticCode`], a message and a source [`Span`]. Passes
//! return the first one they hit as `Err`. The pipeline collects them into a
//! [`DiagnosticList`], which a [`DiagnosticRenderer`] turns into terminal text
//! or JSON.
//!
//! [`Span`]: resonate_source::Span

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod label;
pub mod list;
pub mod renderer;
pub mod severity;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use label::{Label, LabelStyle};
pub use list::DiagnosticList;
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use severity::Severity;
