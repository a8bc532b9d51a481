//! Field validation against the caller's column whitelist.
//!
//! Runs between parsing and compilation and mutates nothing. Besides field
//! names it re-checks the structural invariants of the tree (operand counts,
//! non-empty membership lists, depth) so hand-built trees get the same
//! guarantees as parsed ones.

use crate::ast::{FieldRef, LogicOp, Node};
use crate::config::CompilerConfig;
use crate::error::{Arity, QueryError, Result};
use crate::model::Schema;

/// Which field names a target accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// The whole name must be a column of the schema; dots are not traversed.
    Column,
    /// Dotted names are nested document paths; only the first segment has
    /// to be a known field.
    Document,
}

pub struct Validator<'s> {
    schema: Schema<'s>,
    policy: FieldPolicy,
    max_depth: usize,
}

impl<'s> Validator<'s> {
    pub fn new(schema: Schema<'s>, policy: FieldPolicy, config: &CompilerConfig) -> Self {
        Self {
            schema,
            policy,
            max_depth: config.max_depth,
        }
    }

    pub fn validate(&self, node: &Node) -> Result<()> {
        self.walk(node, 1)
    }

    fn walk(&self, node: &Node, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(QueryError::syntax(
                format!("expression nested deeper than {} levels", self.max_depth),
                None,
            ));
        }
        match node {
            Node::Logical { op, operands } => {
                let (name, arity) = match op {
                    LogicOp::And => ("and", Arity::AtLeast(2)),
                    LogicOp::Or => ("or", Arity::AtLeast(2)),
                    LogicOp::Not => ("not", Arity::Exactly(1)),
                };
                if !arity.accepts(operands.len()) {
                    return Err(QueryError::Arity {
                        function: name.to_string(),
                        expected: arity,
                        actual: operands.len(),
                    });
                }
                for operand in operands {
                    self.walk(operand, depth + 1)?;
                }
                Ok(())
            }
            Node::Membership { field, values, .. } if values.is_empty() => Err(QueryError::syntax(
                format!("empty value list for {}", field),
                None,
            )),
            Node::Membership { field, .. } => {
                self.check_field(field)?;
                self.check_array(field)
            }
            Node::Comparison { field, .. } | Node::IsNull { field } => self.check_field(field),
        }
    }

    /// Column targets read membership as array containment.
    fn check_array(&self, field: &FieldRef) -> Result<()> {
        if self.policy != FieldPolicy::Column {
            return Ok(());
        }
        match self.schema.resolve(field.as_str()) {
            Some(column) if !column.column_type.is_array() => Err(QueryError::type_error(
                format!("{} is not an array", field),
            )),
            _ => Ok(()),
        }
    }

    fn check_field(&self, field: &FieldRef) -> Result<()> {
        let name = match self.policy {
            FieldPolicy::Column => field.as_str(),
            FieldPolicy::Document => field.namespace().unwrap_or(field.as_str()),
        };
        if self.schema.resolve(name).is_none() {
            return Err(QueryError::validation(field.as_str()));
        }
        log::debug!("field {} accepted", field);
        Ok(())
    }
}
