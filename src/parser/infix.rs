//! Infix comparison syntax used by search-index filters.
//!
//! ```text
//! comparison := FIELD OP VALUE                  OP ∈ {=, !=, <, <=, >, >=}
//! membership := FIELD ('not_in' | 'in') '[' VALUE (',' VALUE)* ']'
//! expr       := comparison | membership
//!             | '(' expr ')' ('and' | 'or') '(' expr ')'
//!             | '(' expr ')'
//! ```
//!
//! Every `and`/`or` operand is bracketed, so there is no precedence to
//! resolve and a third unbracketed operand is an error.

use crate::ast::{CompOp, FieldRef, Literal, LogicOp, Node};
use crate::config::CompilerConfig;
use crate::error::{QueryError, Result};
use crate::parser::{tokenize, Parser};
use crate::token::TokenKind;

pub fn parse(input: &str, config: &CompilerConfig) -> Result<Node> {
    let tokens = tokenize(input, config)?;
    let mut parser = Parser::new(&tokens, config.max_depth);
    let node = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(node)
}

impl<'a> Parser<'a> {
    fn parse_expr(&mut self) -> Result<Node> {
        let Some(open) = self.peek() else {
            return Err(self.unexpected_end("a comparison or `(`"));
        };
        if open.kind != TokenKind::LParen {
            return self.parse_leaf();
        }

        self.descend(open.span)?;
        let left = self.parse_group()?;
        let op = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::And) => Some(LogicOp::And),
            Some(TokenKind::Or) => Some(LogicOp::Or),
            _ => None,
        };
        let node = match op {
            Some(op) => {
                self.advance(); // consume and/or
                if !self.match_token(&TokenKind::LParen) {
                    return Err(match self.peek() {
                        Some(token) => QueryError::at(
                            format!(
                                "operands of and/or must be parenthesised, found {}",
                                token.kind.describe()
                            ),
                            token.span,
                        ),
                        None => self.unexpected_end("`(`"),
                    });
                }
                let right = self.parse_group()?;
                Node::Logical {
                    op,
                    operands: vec![left, right],
                }
            }
            None => left,
        };
        self.ascend();
        Ok(node)
    }

    /// `'(' expr ')'`
    fn parse_group(&mut self) -> Result<Node> {
        self.expect(TokenKind::LParen)?;
        let node = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(node)
    }

    fn parse_leaf(&mut self) -> Result<Node> {
        let field_token = self.expect(TokenKind::Word(""))?;
        let TokenKind::Word(name) = field_token.kind else {
            return Err(QueryError::at("expected a field name", field_token.span));
        };
        let field = FieldRef(name.to_string());

        let Some(op_token) = self.advance() else {
            return Err(self.unexpected_end("a comparison operator or `not_in`"));
        };
        let op = match op_token.kind {
            TokenKind::Eq => CompOp::Eq,
            TokenKind::NotEq => CompOp::NotEq,
            TokenKind::Gt => CompOp::Gt,
            TokenKind::Lt => CompOp::Lt,
            TokenKind::Gte => CompOp::Gte,
            TokenKind::Lte => CompOp::Lte,
            TokenKind::NotIn | TokenKind::In => {
                let negated = op_token.kind == TokenKind::NotIn;
                let values = self.parse_list()?;
                return Ok(Node::Membership {
                    field,
                    negated,
                    values,
                });
            }
            ref other => {
                return Err(QueryError::at(
                    format!(
                        "expected a comparison operator or `not_in` after `{}`, found {}",
                        field,
                        other.describe()
                    ),
                    op_token.span,
                ))
            }
        };
        let value = self.parse_value()?;
        Ok(Node::Comparison { field, op, value })
    }

    /// `'[' VALUE (',' VALUE)* ']'`
    fn parse_list(&mut self) -> Result<Vec<Literal>> {
        self.expect(TokenKind::LBracket)?;
        let mut values = vec![self.parse_value()?];
        while self.match_token(&TokenKind::Comma) {
            self.advance(); // consume ,
            values.push(self.parse_value()?);
        }
        self.expect(TokenKind::RBracket)?;
        Ok(values)
    }

    fn parse_value(&mut self) -> Result<Literal> {
        let Some(token) = self.advance() else {
            return Err(self.unexpected_end("a value"));
        };
        match token.kind.word_text() {
            Some(text) => Ok(Literal::from_lexeme(text)),
            None => Err(QueryError::at(
                format!("expected a value, found {}", token.kind.describe()),
                token.span,
            )),
        }
    }
}
