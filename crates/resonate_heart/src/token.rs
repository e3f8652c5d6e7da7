//! Token kinds for the HEART lexer.
//!
//! HEART keywords are context-sensitive, so they are lexed as plain
//! [`HeartToken::Identifier`]s and matched by text in the parser. Literal
//! values are not stored in the token; the parser reads them back from the
//! source through the token's span.

use resonate_source::Span;

/// A HEART token kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum HeartToken {
    /// A name or keyword: `processor`, `float32`, `gain`, `_nan32`.
    Identifier,
    /// A function-local name: `$x`.
    LocalName,
    /// A block label: `@loop`.
    BlockLabel,
    /// An integer literal, optionally negative and optionally `L`-suffixed.
    Integer,
    /// A float literal, optionally negative and optionally `f`-suffixed.
    Float,
    /// A double-quoted string literal.
    StringLiteral,
    /// `#`
    Hash,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// `::`
    DoubleColon,
    /// `.`
    Dot,
    /// `=`
    Equals,
    /// `->`
    Arrow,
    /// `?`
    Question,
    /// `&`
    Ampersand,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// End of input.
    Eof,
}

impl HeartToken {
    /// Returns a short description for error messages.
    pub fn describe(self) -> &'static str {
        match self {
            HeartToken::Identifier => "identifier",
            HeartToken::LocalName => "local variable name",
            HeartToken::BlockLabel => "block label",
            HeartToken::Integer => "integer literal",
            HeartToken::Float => "float literal",
            HeartToken::StringLiteral => "string literal",
            HeartToken::Hash => "'#'",
            HeartToken::LeftBrace => "'{'",
            HeartToken::RightBrace => "'}'",
            HeartToken::LeftParen => "'('",
            HeartToken::RightParen => "')'",
            HeartToken::LeftBracket => "'['",
            HeartToken::RightBracket => "']'",
            HeartToken::Less => "'<'",
            HeartToken::Greater => "'>'",
            HeartToken::Comma => "','",
            HeartToken::Semicolon => "';'",
            HeartToken::Colon => "':'",
            HeartToken::DoubleColon => "'::'",
            HeartToken::Dot => "'.'",
            HeartToken::Equals => "'='",
            HeartToken::Arrow => "'->'",
            HeartToken::Question => "'?'",
            HeartToken::Ampersand => "'&'",
            HeartToken::Star => "'*'",
            HeartToken::Slash => "'/'",
            HeartToken::Eof => "end of file",
        }
    }
}

/// A token kind paired with its location in the source text.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    /// What kind of token this is.
    pub kind: HeartToken,
    /// Where the token appears.
    pub span: Span,
}
