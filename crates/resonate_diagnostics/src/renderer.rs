//! Rendering backends for human-readable and machine-readable output.

use crate::diagnostic::Diagnostic;
use crate::label::LabelStyle;
use crate::list::DiagnosticList;
use resonate_source::SourceDb;

/// Formats diagnostics for one kind of output.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic.
    fn render(&self, diag: &Diagnostic, sources: &SourceDb) -> String;

    /// Renders every diagnostic of a list, in order.
    fn render_all(&self, list: &DiagnosticList, sources: &SourceDb) -> String {
        list.iter().map(|d| self.render(d, sources)).collect()
    }
}

/// Renders diagnostics in a rustc-like terminal format:
///
/// ```text
/// error[G301]: Feedback cycle in graph: a -> b -> a
///   --> dump.heart:12:5
///    |
/// 12 |     connection a.out -> b.in;
///    |     ^^^^^^^^^^^^^^^^^^^^^^^^^
///    = note: ...
/// ```
pub struct TerminalRenderer {
    /// Whether to wrap the severity in ANSI colour codes.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn severity_text(&self, diag: &Diagnostic) -> String {
        if !self.color {
            return diag.severity.to_string();
        }
        let colour = if diag.severity.is_error() { "31" } else { "33" };
        format!("\x1b[1;{colour}m{}\x1b[0m", diag.severity)
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic, sources: &SourceDb) -> String {
        let mut out = format!(
            "{}[{}]: {}\n",
            self.severity_text(diag),
            diag.code,
            diag.message
        );

        if let (Some(location), Some(file)) = (
            sources.locate(diag.primary_span),
            sources.file(diag.primary_span.file),
        ) {
            let line_num = location.line.to_string();
            let gutter = " ".repeat(line_num.len());
            let underline = "^".repeat(diag.primary_span.len().max(1) as usize);
            let indent = " ".repeat(location.column.saturating_sub(1) as usize);
            let primary_msg = diag
                .labels
                .iter()
                .find(|l| l.style == LabelStyle::Primary)
                .map(|l| format!(" {}", l.message))
                .unwrap_or_default();

            out.push_str(&format!("  --> {location}\n"));
            out.push_str(&format!("{gutter} |\n"));
            out.push_str(&format!(
                "{line_num} | {}\n",
                file.line_text(diag.primary_span.start)
            ));
            out.push_str(&format!("{gutter} | {indent}{underline}{primary_msg}\n"));
        }

        for label in diag.labels.iter().filter(|l| l.style == LabelStyle::Secondary) {
            match sources.locate(label.span) {
                Some(location) => {
                    out.push_str(&format!("   = {}: {location}\n", label.message))
                }
                None => out.push_str(&format!("   = {}\n", label.message)),
            }
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

/// Renders each diagnostic as one line of JSON for tooling.
pub struct JsonRenderer;

impl DiagnosticRenderer for JsonRenderer {
    fn render(&self, diag: &Diagnostic, sources: &SourceDb) -> String {
        let location = sources.locate(diag.primary_span).map(|l| {
            serde_json::json!({
                "file": l.file_name,
                "line": l.line,
                "column": l.column,
            })
        });
        let value = serde_json::json!({
            "severity": diag.severity.to_string(),
            "code": diag.code.to_string(),
            "message": diag.message,
            "location": location,
            "notes": diag.notes,
            "help": diag.help,
        });
        format!("{value}\n")
    }
}
