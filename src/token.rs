//! The token definition shared by both filter syntaxes.

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Keywords (infix syntax only, plain words in the prefix syntax)
    And,   // "and"
    Or,    // "or"
    In,    // "in"
    NotIn, // "not_in"

    // Literals
    Word(&'a str),
    /// A `~`-led regular expression value, the marker included.
    Pattern(&'a str),

    // Punctuation
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    Comma,    // ,

    // Operators
    Eq,    // =
    NotEq, // !=
    Gt,    // >
    Lt,    // <
    Gte,   // >=
    Lte,   // <=

    // Special
    Illegal, // An illegal/unknown character
}

impl<'a> TokenKind<'a> {
    /// The source text a word-like token stands for.
    ///
    /// Keywords are only reserved in the infix syntax; the prefix syntax
    /// reads them back as ordinary words (`and(...)`, `eq(kind,in)`).
    pub fn word_text(&self) -> Option<&'a str> {
        match self {
            TokenKind::Word(s) | TokenKind::Pattern(s) => Some(s),
            TokenKind::And => Some("and"),
            TokenKind::Or => Some("or"),
            TokenKind::In => Some("in"),
            TokenKind::NotIn => Some("not_in"),
            _ => None,
        }
    }

    /// Human readable form used in error messages.
    pub fn describe(&self) -> String {
        let symbol = match self {
            TokenKind::Word(s) => return format!("word `{}`", s),
            TokenKind::Pattern(s) => return format!("pattern `{}`", s),
            TokenKind::Illegal => return "illegal character".to_string(),
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::In => "in",
            TokenKind::NotIn => "not_in",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Eq => "=",
            TokenKind::NotEq => "!=",
            TokenKind::Gt => ">",
            TokenKind::Lt => "<",
            TokenKind::Gte => ">=",
            TokenKind::Lte => "<=",
        };
        format!("`{}`", symbol)
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
