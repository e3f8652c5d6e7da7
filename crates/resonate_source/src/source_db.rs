//! Registered source texts and line/column resolution.

use crate::span::{FileId, Span};
use std::fmt;

/// One registered text, with the byte offsets of its line starts.
pub struct SourceFile {
    /// The id this file was registered under.
    pub id: FileId,
    /// A display name, e.g. a path or `"internal test dump"`.
    pub name: String,
    /// The full text.
    pub content: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    fn new(id: FileId, name: String, content: String) -> Self {
        let mut line_starts = vec![0u32];
        line_starts.extend(
            content
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i as u32 + 1),
        );
        Self {
            id,
            name,
            content,
            line_starts,
        }
    }

    /// Converts a byte offset into 1-based `(line, column)`.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (line as u32 + 1, offset - self.line_starts[line] + 1)
    }

    /// Returns the full text of the line containing `offset`, without its
    /// newline.
    pub fn line_text(&self, offset: u32) -> &str {
        let offset = (offset as usize).min(self.content.len());
        let start = self.content[..offset].rfind('\n').map_or(0, |p| p + 1);
        let end = self.content[offset..]
            .find('\n')
            .map_or(self.content.len(), |p| offset + p);
        &self.content[start..end]
    }
}

/// A span resolved to a file name and 1-based line/column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Display name of the file.
    pub file_name: String,
    /// 1-based line of the span start.
    pub line: u32,
    /// 1-based column of the span start.
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file_name, self.line, self.column)
    }
}

/// Owns every text handed to the compiler during one session.
#[derive(Default)]
pub struct SourceDb {
    files: Vec<SourceFile>,
}

impl SourceDb {
    /// Creates an empty source database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a text under a display name and returns its id.
    pub fn add_source(&mut self, name: impl Into<String>, content: impl Into<String>) -> FileId {
        let id = FileId::from_raw(self.files.len() as u32);
        self.files.push(SourceFile::new(id, name.into(), content.into()));
        id
    }

    /// Returns the file registered under `id`, if any.
    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.as_raw() as usize)
    }

    /// Resolves a span to a display location. Dummy or foreign spans
    /// resolve to `None`.
    pub fn locate(&self, span: Span) -> Option<Location> {
        let file = self.file(span.file)?;
        let (line, column) = file.line_col(span.start);
        Some(Location {
            file_name: file.name.clone(),
            line,
            column,
        })
    }

    /// Returns the text covered by a span.
    pub fn snippet(&self, span: Span) -> Option<&str> {
        self.file(span.file)?
            .content
            .get(span.start as usize..span.end as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_resolution() {
        let mut db = SourceDb::new();
        let id = db.add_source("dump.heart", "#HEART 1\ngraph G\n{\n}\n");
        let file = db.file(id).unwrap();
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(9), (2, 1));
        assert_eq!(file.line_col(15), (2, 7));
    }

    #[test]
    fn locate_and_snippet() {
        let mut db = SourceDb::new();
        let id = db.add_source("a.heart", "node x = Gain;");
        let span = Span::new(id, 5, 6);
        assert_eq!(db.locate(span).unwrap().to_string(), "a.heart:1:6");
        assert_eq!(db.snippet(span), Some("x"));
        assert_eq!(db.file(id).unwrap().line_text(5), "node x = Gain;");
    }

    #[test]
    fn dummy_span_has_no_location() {
        let db = SourceDb::new();
        assert!(db.locate(Span::DUMMY).is_none());
    }
}
