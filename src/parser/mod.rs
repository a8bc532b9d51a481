//! Filter parsers.
//!
//! Two front-ends share one token cursor and feed one AST:
//!
//! ```text
//! prefix::parse()   q(and(eq(name,ocp),contains(tags,debug)))
//!   └─ CallExpr ── lower() ──┐
//!                            ├─> ast::Node
//! infix::parse()             │
//!   (a.b=x) and (c not_in [y, z]) ─┘
//! ```
//!
//! Both parsers are recursive descent and recurse once per nesting level, so
//! input length and nesting depth are bounded by [`CompilerConfig`].

pub mod infix;
pub mod prefix;

use crate::config::CompilerConfig;
use crate::error::{QueryError, Result};
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};

/// Tokenizes `input` after checking the length limit.
pub(crate) fn tokenize<'a>(input: &'a str, config: &CompilerConfig) -> Result<Vec<Token<'a>>> {
    if input.len() > config.max_input_len {
        return Err(QueryError::syntax(
            format!(
                "query is {} bytes long, the limit is {}",
                input.len(),
                config.max_input_len
            ),
            None,
        ));
    }
    let tokens: Vec<_> = Lexer::new(input).collect();
    log::trace!("tokenized {:?} into {} tokens", input, tokens.len());
    if tokens.is_empty() {
        return Err(QueryError::syntax("empty query", None));
    }
    if let Some(token) = tokens.iter().find(|t| t.kind == TokenKind::Illegal) {
        return Err(QueryError::at(
            format!("illegal character `{}`", &input[token.span.start..token.span.end]),
            token.span,
        ));
    }
    Ok(tokens)
}

pub(crate) struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: &'a [Token<'a>], max_depth: usize) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
            max_depth,
        }
    }

    /// Returns the current token without advancing
    pub(crate) fn peek(&self) -> Option<&'a Token<'a>> {
        self.tokens.get(self.position)
    }

    /// Returns the current token and advances
    pub(crate) fn advance(&mut self) -> Option<&'a Token<'a>> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    /// Span just past the last token, used for end-of-input errors.
    fn end_span(&self) -> Span {
        let end = self.tokens.last().map(|t| t.span.end).unwrap_or(0);
        Span::new(end, end)
    }

    pub(crate) fn unexpected_end(&self, expected: &str) -> QueryError {
        QueryError::at(
            format!("expected {}, but reached end of input", expected),
            self.end_span(),
        )
    }

    /// Expects a token of the given kind and advances, otherwise errors
    pub(crate) fn expect(&mut self, expected: TokenKind) -> Result<&'a Token<'a>> {
        match self.peek() {
            Some(token)
                if std::mem::discriminant(&token.kind) == std::mem::discriminant(&expected) =>
            {
                self.position += 1;
                Ok(token)
            }
            Some(token) => Err(QueryError::at(
                format!("expected {}, found {}", expected.describe(), token.kind.describe()),
                token.span,
            )),
            None => Err(self.unexpected_end(&expected.describe())),
        }
    }

    /// Checks whether the current token has the given kind
    pub(crate) fn match_token(&self, kind: &TokenKind) -> bool {
        self.peek()
            .map(|token| std::mem::discriminant(&token.kind) == std::mem::discriminant(kind))
            .unwrap_or(false)
    }

    /// Enters one nesting level, failing once `max_depth` is exceeded.
    pub(crate) fn descend(&mut self, span: Span) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(QueryError::at(
                format!("expression nested deeper than {} levels", self.max_depth),
                span,
            ));
        }
        Ok(())
    }

    pub(crate) fn ascend(&mut self) {
        self.depth -= 1;
    }

    /// Fails if any token is left after a complete expression.
    pub(crate) fn expect_end(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(QueryError::at(
                format!("unexpected {} after end of expression", token.kind.describe()),
                token.span,
            )),
        }
    }
}
