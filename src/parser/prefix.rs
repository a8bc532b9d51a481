//! Prefix call syntax used by relational filters.
//!
//! ```text
//! call    := IDENT '(' arglist ')'
//! arglist := arg (',' arg)*
//! arg     := call | literal
//! ```
//!
//! Parsing only checks the call structure. Function names and argument
//! counts are checked when the [`CallExpr`] is lowered into an AST, so
//! `eq(a)` parses and then fails with an arity error.

use std::fmt;

use crate::ast::{CompOp, FieldRef, Literal, LogicOp, Node};
use crate::config::CompilerConfig;
use crate::error::{Arity, QueryError, Result};
use crate::parser::{tokenize, Parser};
use crate::token::{Span, TokenKind};

/// Syntax tree of the prefix form, before any function is resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum CallExpr {
    Call {
        name: String,
        args: Vec<CallExpr>,
        span: Span,
    },
    Atom { text: String, span: Span },
}

impl CallExpr {
    pub fn span(&self) -> Span {
        match self {
            CallExpr::Call { span, .. } | CallExpr::Atom { span, .. } => *span,
        }
    }

    /// Resolves every call against [`Function`] and builds the AST.
    pub fn lower(&self) -> Result<Node> {
        let (name, args, span) = match self {
            CallExpr::Call { name, args, span } => (name, args, *span),
            CallExpr::Atom { text, span } => {
                return Err(QueryError::at(
                    format!("expected a function call, found `{}`", text),
                    *span,
                ))
            }
        };
        let function = Function::from_name(name)
            .ok_or_else(|| QueryError::at(format!("invalid function {}", name), span))?;
        let arity = function.arity();
        if !arity.accepts(args.len()) {
            return Err(QueryError::Arity {
                function: function.name().to_string(),
                expected: arity,
                actual: args.len(),
            });
        }
        log::debug!("lowering {} with {} args", function.name(), args.len());

        let node = match function {
            Function::Q => args[0].lower()?,
            Function::And => Node::Logical {
                op: LogicOp::And,
                operands: lower_all(args)?,
            },
            Function::Or => Node::Logical {
                op: LogicOp::Or,
                operands: lower_all(args)?,
            },
            Function::Not => Node::not(args[0].lower()?),
            Function::Eq => comparison(args, CompOp::Eq)?,
            Function::Ne => comparison(args, CompOp::NotEq)?,
            Function::Gt => comparison(args, CompOp::Gt)?,
            Function::Ge => comparison(args, CompOp::Gte)?,
            Function::Lt => comparison(args, CompOp::Lt)?,
            Function::Le => comparison(args, CompOp::Lte)?,
            Function::Like => comparison(args, CompOp::Like)?,
            Function::ILike => comparison(args, CompOp::ILike)?,
            Function::Contains => membership(args, false)?,
            Function::NotContains => membership(args, true)?,
            Function::Null => Node::IsNull {
                field: FieldRef(args[0].atom()?.to_string()),
            },
        };
        Ok(node)
    }

    /// The text of an atom argument; calls are rejected.
    fn atom(&self) -> Result<&str> {
        match self {
            CallExpr::Atom { text, .. } => Ok(text),
            CallExpr::Call { name, span, .. } => Err(QueryError::at(
                format!("expected a field name or value, found call to `{}`", name),
                *span,
            )),
        }
    }
}

fn lower_all(args: &[CallExpr]) -> Result<Vec<Node>> {
    args.iter().map(CallExpr::lower).collect()
}

fn comparison(args: &[CallExpr], op: CompOp) -> Result<Node> {
    Ok(Node::Comparison {
        field: FieldRef(args[0].atom()?.to_string()),
        op,
        value: Literal::from_lexeme(args[1].atom()?),
    })
}

fn membership(args: &[CallExpr], negated: bool) -> Result<Node> {
    let values = args[1..]
        .iter()
        .map(|arg| arg.atom().map(Literal::from_lexeme))
        .collect::<Result<Vec<_>>>()?;
    Ok(Node::Membership {
        field: FieldRef(args[0].atom()?.to_string()),
        negated,
        values,
    })
}

/// Renders the nested-list form, e.g. `["q",["eq","name","ocp"]]`.
impl fmt::Display for CallExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallExpr::Atom { text, .. } => write!(f, "\"{}\"", text),
            CallExpr::Call { name, args, .. } => {
                write!(f, "[\"{}\"", name)?;
                for arg in args {
                    write!(f, ",{}", arg)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// The closed set of functions of the prefix syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Q,
    And,
    Or,
    Not,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    ILike,
    Contains,
    NotContains,
    Null,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "q" => Function::Q,
            "and" => Function::And,
            "or" => Function::Or,
            "not" => Function::Not,
            "eq" => Function::Eq,
            "ne" => Function::Ne,
            "gt" => Function::Gt,
            "ge" => Function::Ge,
            "lt" => Function::Lt,
            "le" => Function::Le,
            "like" => Function::Like,
            "ilike" => Function::ILike,
            "contains" => Function::Contains,
            "not_contains" => Function::NotContains,
            "null" => Function::Null,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Q => "q",
            Function::And => "and",
            Function::Or => "or",
            Function::Not => "not",
            Function::Eq => "eq",
            Function::Ne => "ne",
            Function::Gt => "gt",
            Function::Ge => "ge",
            Function::Lt => "lt",
            Function::Le => "le",
            Function::Like => "like",
            Function::ILike => "ilike",
            Function::Contains => "contains",
            Function::NotContains => "not_contains",
            Function::Null => "null",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Function::Q | Function::Not | Function::Null => Arity::Exactly(1),
            Function::And | Function::Or | Function::Contains | Function::NotContains => {
                Arity::AtLeast(2)
            }
            Function::Eq
            | Function::Ne
            | Function::Gt
            | Function::Ge
            | Function::Lt
            | Function::Le
            | Function::Like
            | Function::ILike => Arity::Exactly(2),
        }
    }
}

/// Parses the prefix syntax into a [`CallExpr`]. A lone word parses as an
/// atom; lowering rejects it.
pub fn parse(input: &str, config: &CompilerConfig) -> Result<CallExpr> {
    let tokens = tokenize(input, config)?;
    let mut parser = Parser::new(&tokens, config.max_depth);
    let expr = parser.parse_arg()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parses and lowers in one step.
pub fn parse_node(input: &str, config: &CompilerConfig) -> Result<Node> {
    parse(input, config)?.lower()
}

impl<'a> Parser<'a> {
    /// `arg := call | literal`
    fn parse_arg(&mut self) -> Result<CallExpr> {
        let token = self
            .advance()
            .ok_or_else(|| self.unexpected_end("a function call or value"))?;
        let Some(text) = token.kind.word_text() else {
            return Err(QueryError::at(
                format!("expected a function call or value, found {}", token.kind.describe()),
                token.span,
            ));
        };

        if !self.match_token(&TokenKind::LParen) {
            return Ok(CallExpr::Atom {
                text: text.to_string(),
                span: token.span,
            });
        }

        self.descend(token.span)?;
        self.advance(); // consume (
        let args = self.parse_arglist()?;
        let close = self.expect(TokenKind::RParen)?;
        self.ascend();

        Ok(CallExpr::Call {
            name: text.to_string(),
            args,
            span: Span::new(token.span.start, close.span.end),
        })
    }

    /// Splits on top-level commas only; nested calls are consumed whole by
    /// the recursive `parse_arg`.
    fn parse_arglist(&mut self) -> Result<Vec<CallExpr>> {
        let mut args = vec![self.parse_arg()?];
        while self.match_token(&TokenKind::Comma) {
            self.advance(); // consume ,
            args.push(self.parse_arg()?);
        }
        Ok(args)
    }
}
