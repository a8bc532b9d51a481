//! Relational compiler: AST to sea-query predicates bound to whitelisted columns.
//!
//! Two modes:
//! - [`SqlCompiler::apply`] filters a running `SELECT`. Top-level AND chains
//!   become successive `and_where` calls.
//! - [`SqlCompiler::predicate`] returns a standalone [`SimpleExpr`], used for
//!   OR/NOT children and anything that must be combined before application.
//!
//! Literal values are bound as text; the database coerces them to the
//! column type.

use sea_query::extension::postgres::{PgBinOper, PgExpr};
use sea_query::{
    ArrayType, Asterisk, Expr, Iden, PostgresQueryBuilder, Query, QueryStatementWriter,
    SelectStatement, SimpleExpr, Value,
};

use crate::ast::{CompOp, FieldRef, Literal, LogicOp, Node};
use crate::error::{QueryError, Result};
use crate::model::{ColumnType, Schema};

/// Table identifier for sea-query
#[derive(Debug, Clone)]
pub struct TableName(pub String);

impl Iden for TableName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        let _ = s.write_str(&self.0);
    }
}

/// Column identifier for sea-query
#[derive(Debug, Clone)]
pub struct ColumnName(pub String);

impl Iden for ColumnName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        let _ = s.write_str(&self.0);
    }
}

/// Compiles filters against one [`Schema`].
pub struct SqlCompiler<'s> {
    schema: Schema<'s>,
}

impl<'s> SqlCompiler<'s> {
    pub fn new(schema: Schema<'s>) -> Self {
        Self { schema }
    }

    /// `SELECT * FROM <primary table>`, the running query [`compile`] filters.
    ///
    /// [`compile`]: SqlCompiler::compile
    pub fn select(&self) -> SelectStatement {
        let mut select = Query::select();
        select
            .column(Asterisk)
            .from(TableName(self.schema.primary.table_name().to_string()));
        select
    }

    /// Compiles `node` into a fresh `SELECT` over the primary model.
    pub fn compile(&self, node: &Node) -> Result<SelectStatement> {
        let mut select = self.select();
        self.apply(&mut select, node)?;
        Ok(select)
    }

    /// Applies `node` as filters on a running query. `select` is left
    /// untouched when any part of `node` fails to compile.
    pub fn apply(&self, select: &mut SelectStatement, node: &Node) -> Result<()> {
        let mut conditions = Vec::new();
        self.conjuncts(node, &mut conditions)?;
        for condition in conditions {
            select.and_where(condition);
        }
        Ok(())
    }

    /// Flattens top-level AND chains into separate conditions.
    fn conjuncts(&self, node: &Node, out: &mut Vec<SimpleExpr>) -> Result<()> {
        match node {
            Node::Logical {
                op: LogicOp::And,
                operands,
            } => operands
                .iter()
                .try_for_each(|operand| self.conjuncts(operand, out)),
            _ => {
                out.push(self.predicate(node)?);
                Ok(())
            }
        }
    }

    /// Compiles `node` into a standalone predicate.
    pub fn predicate(&self, node: &Node) -> Result<SimpleExpr> {
        match node {
            Node::Comparison { field, op, value } => self.compile_comparison(field, *op, value),
            Node::Membership {
                field,
                negated,
                values,
            } => {
                let contains = self.compile_contains(field, values)?;
                Ok(if *negated { contains.not() } else { contains })
            }
            Node::IsNull { field } => {
                log::debug!("null({})", field);
                Ok(self.column(field)?.0.is_null())
            }
            Node::Logical {
                op: LogicOp::Not,
                operands,
            } => {
                let operand = operands
                    .first()
                    .ok_or_else(|| QueryError::syntax("not without operand", None))?;
                log::debug!("not");
                Ok(self.predicate(operand)?.not())
            }
            Node::Logical { op, operands } => self.combine(*op, operands),
        }
    }

    /// Folds operands left to right with one AND or OR.
    fn combine(&self, op: LogicOp, operands: &[Node]) -> Result<SimpleExpr> {
        log::debug!("{:?} of {} operands", op, operands.len());
        let mut predicates = operands.iter().map(|operand| self.predicate(operand));
        let first = predicates
            .next()
            .ok_or_else(|| QueryError::syntax(format!("{:?} without operands", op), None))??;
        predicates.try_fold(first, |acc, next: Result<SimpleExpr>| -> Result<SimpleExpr> {
            let next = next?;
            Ok(match op {
                LogicOp::Or => acc.or(next),
                _ => acc.and(next),
            })
        })
    }

    /// Resolves a whitelisted column. Secondary-model columns are qualified
    /// with their table name.
    fn column(&self, field: &FieldRef) -> Result<(Expr, ColumnType)> {
        let resolved = self
            .schema
            .resolve(field.as_str())
            .ok_or_else(|| QueryError::validation(field.as_str()))?;
        let column = ColumnName(field.as_str().to_string());
        let expr = if resolved.secondary {
            Expr::col((TableName(resolved.table.to_string()), column))
        } else {
            Expr::col(column)
        };
        Ok((expr, resolved.column_type))
    }

    fn compile_comparison(&self, field: &FieldRef, op: CompOp, value: &Literal) -> Result<SimpleExpr> {
        log::debug!("{:?}({}, {})", op, field, value);
        let (col, _) = self.column(field)?;
        let val = literal_to_value(value);

        let expr = match op {
            CompOp::Eq => col.eq(val),
            CompOp::NotEq => col.ne(val),
            CompOp::Gt => col.gt(val),
            CompOp::Lt => col.lt(val),
            CompOp::Gte => col.gte(val),
            CompOp::Lte => col.lte(val),
            // wildcards are the caller's; the value goes through unescaped
            CompOp::Like => col.like(value.as_text()),
            CompOp::ILike => col.ilike(value.as_text()),
        };
        Ok(expr)
    }

    /// `column @> ARRAY[values]`: the array column holds every value.
    fn compile_contains(&self, field: &FieldRef, values: &[Literal]) -> Result<SimpleExpr> {
        log::debug!("contains({}, {} values)", field, values.len());
        let (col, column_type) = self.column(field)?;
        if !column_type.is_array() {
            return Err(QueryError::type_error(format!("{} is not an array", field)));
        }
        let items = values.iter().map(literal_to_value).collect();
        let array = Value::Array(ArrayType::String, Some(Box::new(items)));
        Ok(col.binary(PgBinOper::Contains, SimpleExpr::Value(array)))
    }
}

/// Literals are always bound as text.
fn literal_to_value(literal: &Literal) -> Value {
    Value::String(Some(Box::new(literal.as_text())))
}

/// Renders a compiled statement as PostgreSQL text with inlined values.
pub fn to_sql(select: &SelectStatement) -> String {
    select.to_string(PostgresQueryBuilder)
}
