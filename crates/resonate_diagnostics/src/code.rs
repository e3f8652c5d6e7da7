//! Diagnostic codes with category prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The class of problem a diagnostic reports. Each category has a
/// one-letter prefix used when the code is displayed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Malformed HEART text, prefixed with `P`.
    Syntax,
    /// A name that does not resolve, or resolves to the wrong kind of thing, prefixed with `R`.
    Resolution,
    /// Incompatible types, prefixed with `T`.
    Type,
    /// Duplicate names, malformed blocks, recursive structs, prefixed with `S`.
    Structure,
    /// Feedback cycles and endpoint array/index violations, prefixed with `G`.
    Graph,
    /// Whole-program invariants such as recursion or misuse of advance, prefixed with `I`.
    Invariant,
    /// A configured maximum was exceeded, prefixed with `L`.
    Limit,
    /// A construct that is recognised but not yet supported, prefixed with `U`.
    Unsupported,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Syntax => 'P',
            Category::Resolution => 'R',
            Category::Type => 'T',
            Category::Structure => 'S',
            Category::Graph => 'G',
            Category::Invariant => 'I',
            Category::Limit => 'L',
            Category::Unsupported => 'U',
        }
    }
}

/// A category plus a number, displayed as e.g. `R101` or `G301`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        assert_eq!(DiagnosticCode::new(Category::Resolution, 101).to_string(), "R101");
        assert_eq!(DiagnosticCode::new(Category::Graph, 7).to_string(), "G007");
        assert_eq!(DiagnosticCode::new(Category::Unsupported, 900).to_string(), "U900");
    }

    #[test]
    fn prefixes_are_distinct() {
        let all = [
            Category::Syntax,
            Category::Resolution,
            Category::Type,
            Category::Structure,
            Category::Graph,
            Category::Invariant,
            Category::Limit,
            Category::Unsupported,
        ];
        let mut prefixes: Vec<char> = all.iter().map(|c| c.prefix()).collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), all.len());
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::new(Category::Limit, 501);
        let json = serde_json::to_string(&code).unwrap();
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
