//! Secondary source annotations within a diagnostic.

use resonate_source::Span;
use serde::{Deserialize, Serialize};

/// Whether a label marks the main location or supporting context.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum LabelStyle {
    /// The main error location.
    Primary,
    /// Related context, e.g. where a duplicate was first declared.
    Secondary,
}

/// A span with a short message attached.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Label {
    /// The annotated range.
    pub span: Span,
    /// Text shown next to the range.
    pub message: String,
    /// Primary or secondary.
    pub style: LabelStyle,
}

impl Label {
    /// Creates a primary label.
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Primary,
        }
    }

    /// Creates a secondary label.
    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Secondary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styles() {
        assert_eq!(Label::primary(Span::DUMMY, "here").style, LabelStyle::Primary);
        let l = Label::secondary(Span::DUMMY, "first declared here");
        assert_eq!(l.style, LabelStyle::Secondary);
        assert_eq!(l.message, "first declared here");
    }
}
