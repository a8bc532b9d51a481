//! Error taxonomy of the filter compiler.
//!
//! Every failure is deterministic and caused by the input alone, so none of
//! them is retryable. The facade wraps them in [`MalformedQuery`] together
//! with the offending text.

use std::fmt;

use thiserror::Error;

use crate::token::Span;

/// Expected operand count of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Malformed text: bad token, unbalanced parens, unknown function,
    /// exceeded limits.
    #[error("syntax error{}: {message}", location(.span))]
    Syntax { message: String, span: Option<Span> },

    /// A field that is not part of the caller's whitelist.
    #[error("invalid field name: {field}")]
    Validation { field: String },

    /// A function called with the wrong number of arguments.
    #[error("invalid number of args {actual} for {function}, expected {expected}")]
    Arity {
        function: String,
        expected: Arity,
        actual: usize,
    },

    /// An operator applied to a column or backend that cannot support it.
    #[error("{message}")]
    Type { message: String },
}

impl QueryError {
    pub fn syntax(message: impl Into<String>, span: Option<Span>) -> Self {
        QueryError::Syntax {
            message: message.into(),
            span,
        }
    }

    pub fn at(message: impl Into<String>, span: Span) -> Self {
        Self::syntax(message, Some(span))
    }

    pub fn validation(field: impl Into<String>) -> Self {
        QueryError::Validation {
            field: field.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        QueryError::Type {
            message: message.into(),
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Syntax { .. } => "syntax",
            QueryError::Validation { .. } => "validation",
            QueryError::Arity { .. } => "arity",
            QueryError::Type { .. } => "type",
        }
    }
}

/// The caller-facing "malformed request" shape: the raw query plus the reason
/// it was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("malformed query `{query}`: {reason}")]
pub struct MalformedQuery {
    pub query: String,
    #[source]
    pub reason: QueryError,
}

fn location(span: &Option<Span>) -> String {
    span.map(|s| format!(" at {}", s)).unwrap_or_default()
}

pub type Result<T, E = QueryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = QueryError::at("unexpected `)`", Span::new(3, 4));
        assert_eq!(err.to_string(), "syntax error at 3..4: unexpected `)`");

        let err = QueryError::syntax("unexpected end of input", None);
        assert_eq!(err.to_string(), "syntax error: unexpected end of input");

        let err = QueryError::Arity {
            function: "eq".to_string(),
            expected: Arity::Exactly(2),
            actual: 1,
        };
        assert_eq!(err.to_string(), "invalid number of args 1 for eq, expected 2");
        assert_eq!(err.kind(), "arity");

        let err = QueryError::validation("type");
        assert_eq!(err.to_string(), "invalid field name: type");
    }

    #[test]
    fn test_arity_accepts() {
        assert!(Arity::Exactly(2).accepts(2));
        assert!(!Arity::Exactly(2).accepts(3));
        assert!(Arity::AtLeast(2).accepts(5));
        assert!(!Arity::AtLeast(2).accepts(1));
        assert_eq!(Arity::AtLeast(2).to_string(), "at least 2");
    }

    #[test]
    fn test_malformed_query_keeps_reason() {
        let err = MalformedQuery {
            query: "eq(a)".to_string(),
            reason: QueryError::validation("a"),
        };
        assert_eq!(err.to_string(), "malformed query `eq(a)`: invalid field name: a");
        assert_eq!(err.reason.kind(), "validation");
    }
}
