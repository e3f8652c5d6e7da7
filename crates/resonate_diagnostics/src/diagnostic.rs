//! The structured diagnostic message.

use crate::code::{Category, DiagnosticCode};
use crate::label::Label;
use crate::severity::Severity;
use resonate_common::InternalError;
use resonate_source::Span;
use serde::{Deserialize, Serialize};

/// Code used when an [`InternalError`] has to be reported as a diagnostic.
pub const INTERNAL_ERROR: DiagnosticCode = DiagnosticCode::new(Category::Invariant, 999);

/// A single message about the program being compiled.
///
/// Besides the severity, code, message and primary span, a diagnostic can
/// carry:
/// - secondary labels pointing at related source locations
/// - notes explaining the rule that was broken
/// - help lines suggesting a fix
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The code identifying the kind of problem.
    pub code: DiagnosticCode,
    /// The main, human-readable message.
    pub message: String,
    /// Where the problem was detected, or [`Span::DUMMY`].
    pub primary_span: Span,
    /// Additional annotated source locations.
    pub labels: Vec<Label>,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
    /// Suggestions for fixing the problem.
    pub help: Vec<String>,
}

impl Diagnostic {
    fn with_severity(
        severity: Severity,
        code: DiagnosticCode,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            primary_span: span,
            labels: Vec::new(),
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Creates an error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self::with_severity(Severity::Error, code, message, span)
    }

    /// Creates a warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self::with_severity(Severity::Warning, code, message, span)
    }

    /// Wraps an internal compiler error so it can travel with user
    /// diagnostics. It is always fatal.
    pub fn internal(error: &InternalError) -> Self {
        Self::error(INTERNAL_ERROR, error.to_string(), Span::DUMMY)
            .with_note("this is a bug in the compiler, not in the program being compiled")
    }

    /// Adds a label to this diagnostic.
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    /// Replaces the primary span if it is currently a dummy.
    pub fn or_span(mut self, span: Span) -> Self {
        if self.primary_span.is_dummy() {
            self.primary_span = span;
        }
        self
    }
}

impl From<InternalError> for Diagnostic {
    fn from(error: InternalError) -> Self {
        Diagnostic::internal(&error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resonate_source::FileId;

    #[test]
    fn create_error() {
        let code = DiagnosticCode::new(Category::Resolution, 101);
        let diag = Diagnostic::error(code, "Cannot find source 'osc.out'", Span::DUMMY);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.code.to_string(), "R101");
    }

    #[test]
    fn builder_methods() {
        let diag = Diagnostic::error(
            DiagnosticCode::new(Category::Structure, 201),
            "duplicate",
            Span::DUMMY,
        )
        .with_label(Label::secondary(Span::DUMMY, "first declared here"))
        .with_note("names must be unique within a module")
        .with_help("rename one of them");
        assert_eq!(diag.labels.len(), 1);
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.help.len(), 1);
    }

    #[test]
    fn internal_errors_become_fatal_diagnostics() {
        let diag: Diagnostic = InternalError::new("unmapped function").into();
        assert!(diag.severity.is_error());
        assert_eq!(diag.code, INTERNAL_ERROR);
        assert!(diag.message.contains("unmapped function"));
    }

    #[test]
    fn or_span_only_fills_dummy() {
        let real = Span::new(FileId::from_raw(0), 1, 2);
        let other = Span::new(FileId::from_raw(0), 5, 9);
        let code = DiagnosticCode::new(Category::Graph, 1);
        assert_eq!(Diagnostic::error(code, "x", Span::DUMMY).or_span(real).primary_span, real);
        assert_eq!(Diagnostic::error(code, "x", real).or_span(other).primary_span, real);
    }
}
