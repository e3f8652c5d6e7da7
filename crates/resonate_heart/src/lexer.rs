//! Lexical analyser for HEART text.
//!
//! Whitespace and `//` comments are skipped. A `-` immediately followed by a
//! digit starts a negative number literal; otherwise it must be part of
//! `->`.

use crate::errors;
use crate::token::{HeartToken, Token};
use resonate_diagnostics::Diagnostic;
use resonate_source::{FileId, Span};

/// Lexes `source` into tokens ending with [`HeartToken::Eof`], stopping at
/// the first lexical error.
pub fn lex(source: &str, file: FileId) -> Result<Vec<Token>, Diagnostic> {
    let mut lexer = Lexer {
        source: source.as_bytes(),
        pos: 0,
        file,
    };
    lexer.lex_all()
}

struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    file: FileId,
}

impl<'a> Lexer<'a> {
    fn lex_all(&mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            if self.pos >= self.source.len() {
                tokens.push(Token {
                    kind: HeartToken::Eof,
                    span: self.span_from(self.pos),
                });
                return Ok(tokens);
            }
            tokens.push(self.next_token()?);
        }
    }

    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        self.source.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.file, start as u32, self.pos as u32)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let c = self.peek();
            if c.is_ascii_whitespace() {
                self.pos += 1;
            } else if c == b'/' && self.peek_at(1) == b'/' {
                while self.pos < self.source.len() && self.peek() != b'\n' {
                    self.pos += 1;
                }
            } else {
                return;
            }
        }
    }

    fn eat_identifier_chars(&mut self) {
        while is_identifier_char(self.peek()) {
            self.pos += 1;
        }
    }

    fn next_token(&mut self) -> Result<Token, Diagnostic> {
        let start = self.pos;
        let c = self.peek();
        let kind = match c {
            b'$' | b'@' => {
                self.pos += 1;
                self.eat_identifier_chars();
                if self.pos == start + 1 {
                    return Err(errors::unexpected_character(c as char, self.span_from(start)));
                }
                if c == b'$' {
                    HeartToken::LocalName
                } else {
                    HeartToken::BlockLabel
                }
            }
            b'"' => self.lex_string(start)?,
            b'-' if self.peek_at(1).is_ascii_digit() => {
                self.pos += 1;
                self.lex_number()
            }
            b'-' if self.peek_at(1) == b'>' => {
                self.pos += 2;
                HeartToken::Arrow
            }
            b':' if self.peek_at(1) == b':' => {
                self.pos += 2;
                HeartToken::DoubleColon
            }
            c if c.is_ascii_digit() => self.lex_number(),
            c if is_identifier_start(c) => {
                self.eat_identifier_chars();
                HeartToken::Identifier
            }
            _ => {
                let kind = match c {
                    b'#' => HeartToken::Hash,
                    b'{' => HeartToken::LeftBrace,
                    b'}' => HeartToken::RightBrace,
                    b'(' => HeartToken::LeftParen,
                    b')' => HeartToken::RightParen,
                    b'[' => HeartToken::LeftBracket,
                    b']' => HeartToken::RightBracket,
                    b'<' => HeartToken::Less,
                    b'>' => HeartToken::Greater,
                    b',' => HeartToken::Comma,
                    b';' => HeartToken::Semicolon,
                    b':' => HeartToken::Colon,
                    b'.' => HeartToken::Dot,
                    b'=' => HeartToken::Equals,
                    b'?' => HeartToken::Question,
                    b'&' => HeartToken::Ampersand,
                    b'*' => HeartToken::Star,
                    b'/' => HeartToken::Slash,
                    _ => {
                        let ch = std::str::from_utf8(&self.source[start..])
                            .ok()
                            .and_then(|s| s.chars().next())
                            .unwrap_or('?');
                        self.pos += ch.len_utf8().max(1);
                        return Err(errors::unexpected_character(ch, self.span_from(start)));
                    }
                };
                self.pos += 1;
                kind
            }
        };
        Ok(Token {
            kind,
            span: self.span_from(start),
        })
    }

    fn lex_number(&mut self) -> HeartToken {
        let mut is_float = false;
        while self.peek().is_ascii_digit() {
            self.pos += 1;
        }
        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            is_float = true;
            self.pos += 1;
            while self.peek().is_ascii_digit() {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), b'e' | b'E') {
            let sign = usize::from(matches!(self.peek_at(1), b'+' | b'-'));
            if self.peek_at(1 + sign).is_ascii_digit() {
                is_float = true;
                self.pos += 1 + sign;
                while self.peek().is_ascii_digit() {
                    self.pos += 1;
                }
            }
        }
        match self.peek() {
            b'f' if is_float => {
                self.pos += 1;
                HeartToken::Float
            }
            b'L' if !is_float => {
                self.pos += 1;
                HeartToken::Integer
            }
            _ if is_float => HeartToken::Float,
            _ => HeartToken::Integer,
        }
    }

    fn lex_string(&mut self, start: usize) -> Result<HeartToken, Diagnostic> {
        self.pos += 1;
        loop {
            if self.pos >= self.source.len() || self.peek() == b'\n' {
                return Err(errors::unterminated_string(self.span_from(start)));
            }
            match self.peek() {
                b'"' => {
                    self.pos += 1;
                    return Ok(HeartToken::StringLiteral);
                }
                b'\\' => self.pos = (self.pos + 2).min(self.source.len()),
                _ => self.pos += 1,
            }
        }
    }
}

fn is_identifier_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_identifier_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Decodes the text of a string literal token, quotes included.
pub fn unescape_string(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Encodes a string as a HEART string literal.
pub fn escape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<HeartToken> {
        lex(source, FileId::from_raw(0))
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn punctuation_and_names() {
        use HeartToken::*;
        assert_eq!(
            kinds("node osc = Synth::Osc[2];"),
            vec![
                Identifier, Identifier, Equals, Identifier, DoubleColon, Identifier, LeftBracket,
                Integer, RightBracket, Semicolon, Eof
            ]
        );
        assert_eq!(kinds("$x @loop ->"), vec![LocalName, BlockLabel, Arrow, Eof]);
    }

    #[test]
    fn numbers() {
        use HeartToken::*;
        assert_eq!(kinds("1 1L -3 1.5 1.5f 1e-7 2.0e10f"), vec![
            Integer, Integer, Integer, Float, Float, Float, Float, Eof
        ]);
    }

    #[test]
    fn number_spans_include_suffix() {
        let source = "-12L;";
        let tokens = lex(source, FileId::from_raw(0)).unwrap();
        let span = tokens[0].span;
        assert_eq!(&source[span.start as usize..span.end as usize], "-12L");
    }

    #[test]
    fn comments_are_skipped() {
        use HeartToken::*;
        assert_eq!(kinds("advance; // tick\n}"), vec![Identifier, Semicolon, RightBrace, Eof]);
    }

    #[test]
    fn strings() {
        let source = r#""a \"quoted\" word""#;
        let tokens = lex(source, FileId::from_raw(0)).unwrap();
        assert_eq!(tokens[0].kind, HeartToken::StringLiteral);
        assert_eq!(unescape_string(source), "a \"quoted\" word");
        assert_eq!(escape_string("tab\there"), "\"tab\\there\"");
        assert_eq!(unescape_string(&escape_string("x\\y\n")), "x\\y\n");
    }

    #[test]
    fn errors() {
        let err = lex("input %", FileId::from_raw(0)).unwrap_err();
        assert_eq!(err.code, errors::P001);
        assert_eq!(err.primary_span.start, 6);
        let err = lex("\"open", FileId::from_raw(0)).unwrap_err();
        assert_eq!(err.code, errors::P002);
    }
}
