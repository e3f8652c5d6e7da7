//! Diagnostics raised while constructing IR objects.
//!
//! Error codes in this module use the `S1xx` range for type structure and
//! `L1xx` for construction-time limits.

use resonate_diagnostics::{Category, Diagnostic, DiagnosticCode};
use resonate_source::Span;

/// S101: a struct has a member of its own type.
pub const S101: DiagnosticCode = DiagnosticCode::new(Category::Structure, 101);
/// S102: two structs contain each other.
pub const S102: DiagnosticCode = DiagnosticCode::new(Category::Structure, 102);
/// S103: a longer cycle of structs contain each other.
pub const S103: DiagnosticCode = DiagnosticCode::new(Category::Structure, 103);
/// L101: a clock multiplier or divider is out of range or not a power of two.
pub const L101: DiagnosticCode = DiagnosticCode::new(Category::Limit, 101);

/// Creates an error for a struct that directly contains itself.
pub fn type_contains_itself(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(S101, format!("The type '{name}' cannot contain itself"), span)
}

/// Creates an error for a pair of structs that contain each other.
pub fn types_refer_to_each_other(first: &str, second: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        S102,
        format!("The types '{first}' and '{second}' refer to each other recursively"),
        span,
    )
}

/// Creates an error for a longer cycle of recursive struct members.
pub fn recursive_types(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        S103,
        format!("The type '{name}' is recursive through a chain of members"),
        span,
    )
}

/// Creates an error for an invalid clock multiplier or divider.
pub fn invalid_clock_ratio(value: i64, span: Span) -> Diagnostic {
    Diagnostic::error(
        L101,
        format!("Clock ratio {value} must be a power of 2 between 1 and 512"),
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_recursion_codes() {
        assert_eq!(type_contains_itself("Voice", Span::DUMMY).code.to_string(), "S101");
        let diag = types_refer_to_each_other("A", "B", Span::DUMMY);
        assert_eq!(diag.code, S102);
        assert!(diag.message.contains("'A' and 'B'"));
        assert_eq!(recursive_types("A", Span::DUMMY).code, S103);
    }

    #[test]
    fn clock_ratio_message() {
        let diag = invalid_clock_ratio(3, Span::DUMMY);
        assert_eq!(diag.code.to_string(), "L101");
        assert!(diag.message.starts_with("Clock ratio 3"));
    }
}
