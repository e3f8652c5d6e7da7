//! Syntax diagnostics raised while reading HEART text.

use resonate_diagnostics::{Category, Diagnostic, DiagnosticCode};
use resonate_source::Span;

/// P001: a character that starts no token.
pub const P001: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 1);
/// P002: a string literal without its closing quote.
pub const P002: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 2);
/// P003: a token other than the one the grammar requires.
pub const P003: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 3);
/// P004: a name that does not refer to anything declared.
pub const P004: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 4);
/// P005: a literal whose value cannot be represented.
pub const P005: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 5);
/// P006: a missing or unsupported `#HEART` header.
pub const P006: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 6);

/// Creates an error for a stray character.
pub fn unexpected_character(c: char, span: Span) -> Diagnostic {
    Diagnostic::error(P001, format!("Unexpected character '{c}'"), span)
}

/// Creates an error for an unterminated string literal.
pub fn unterminated_string(span: Span) -> Diagnostic {
    Diagnostic::error(P002, "Unterminated string literal", span)
}

/// Creates an error for an unexpected token.
pub fn expected(what: &str, found: &str, span: Span) -> Diagnostic {
    Diagnostic::error(P003, format!("Expected {what}, found {found}"), span)
}

/// Creates an error for an unknown name.
pub fn unknown_name(kind: &str, name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(P004, format!("Cannot find {kind} '{name}'"), span)
}

/// Creates an error for an out-of-range or malformed literal.
pub fn invalid_literal(text: &str, span: Span) -> Diagnostic {
    Diagnostic::error(P005, format!("Invalid literal '{text}'"), span)
}

/// Creates an error for a bad header line.
pub fn unsupported_version(found: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        P006,
        format!("Expected '#HEART {}' header, found '{found}'", crate::HEART_VERSION),
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_messages() {
        assert_eq!(unexpected_character('%', Span::DUMMY).code.to_string(), "P001");
        assert_eq!(unterminated_string(Span::DUMMY).code, P002);
        let diag = expected("';'", "'}'", Span::DUMMY);
        assert_eq!(diag.message, "Expected ';', found '}'");
        assert_eq!(unknown_name("function", "Gain::mix", Span::DUMMY).code, P004);
        assert_eq!(invalid_literal("99999999999", Span::DUMMY).code, P005);
        assert!(unsupported_version("#HEART 9", Span::DUMMY).message.contains("#HEART 1"));
    }
}
