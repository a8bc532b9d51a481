//! One-call entry point: raw filter text in, compiled query or
//! [`MalformedQuery`] out.
//!
//! Relational and text targets read the prefix call syntax, the search-index
//! target reads the infix syntax.

use std::fmt;

use sea_query::SelectStatement;

use crate::ast::Node;
use crate::config::CompilerConfig;
use crate::error::{MalformedQuery, Result};
use crate::es_compiler::{CompiledDocument, EsCompiler};
use crate::model::Schema;
use crate::parser::{infix, prefix};
use crate::sql_compiler::{self, SqlCompiler};
use crate::validator::{FieldPolicy, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Relational,
    SearchIndex,
    Text,
}

impl Target {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sql" | "relational" => Some(Target::Relational),
            "es" | "search" => Some(Target::SearchIndex),
            "text" => Some(Target::Text),
            _ => None,
        }
    }

    fn field_policy(&self) -> FieldPolicy {
        match self {
            Target::SearchIndex => FieldPolicy::Document,
            Target::Relational | Target::Text => FieldPolicy::Column,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Compiled {
    Relational(SelectStatement),
    Search(CompiledDocument),
    Text(String),
}

/// SQL text, pretty-printed request body, or the text render.
impl fmt::Display for Compiled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compiled::Relational(select) => f.write_str(&sql_compiler::to_sql(select)),
            Compiled::Search(doc) => write!(f, "{:#}", doc.clone().into_request_body()),
            Compiled::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QueryCompiler {
    config: CompilerConfig,
}

impl QueryCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn compile(
        &self,
        raw: &str,
        target: Target,
        schema: &Schema<'_>,
    ) -> std::result::Result<Compiled, MalformedQuery> {
        self.try_compile(raw, target, schema).map_err(|reason| {
            log::debug!("rejected {:?}: {}", raw, reason);
            MalformedQuery {
                query: raw.to_string(),
                reason,
            }
        })
    }

    /// Applies a prefix-syntax filter to a running relational query.
    pub fn compile_into(
        &self,
        raw: &str,
        select: &mut SelectStatement,
        schema: &Schema<'_>,
    ) -> std::result::Result<(), MalformedQuery> {
        let result = self
            .parse_and_validate(raw, Target::Relational, schema)
            .and_then(|node| SqlCompiler::new(*schema).apply(select, &node));
        result.map_err(|reason| MalformedQuery {
            query: raw.to_string(),
            reason,
        })
    }

    fn try_compile(&self, raw: &str, target: Target, schema: &Schema<'_>) -> Result<Compiled> {
        let node = self.parse_and_validate(raw, target, schema)?;
        let compiled = match target {
            Target::Relational => Compiled::Relational(SqlCompiler::new(*schema).compile(&node)?),
            Target::SearchIndex => Compiled::Search(EsCompiler::new(&self.config).compile(&node)?),
            Target::Text => Compiled::Text(node.to_string()),
        };
        Ok(compiled)
    }

    fn parse_and_validate(&self, raw: &str, target: Target, schema: &Schema<'_>) -> Result<Node> {
        let node = match target {
            Target::SearchIndex => infix::parse(raw, &self.config)?,
            Target::Relational | Target::Text => prefix::parse_node(raw, &self.config)?,
        };
        Validator::new(*schema, target.field_policy(), &self.config).validate(&node)?;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Arity, QueryError};
    use crate::model::{ColumnType, TableModel};
    use sea_query::{Expr, Query};
    use serde_json::json;

    fn jobs() -> TableModel {
        TableModel::new("jobs")
            .column("name", ColumnType::Text)
            .column("type", ColumnType::Text)
            .column("scalar_col", ColumnType::Text)
            .column("tags", ColumnType::Array)
            .column("components", ColumnType::Json)
            .column("team", ColumnType::Json)
    }

    fn compile(raw: &str, target: Target) -> std::result::Result<Compiled, MalformedQuery> {
        let model = jobs();
        QueryCompiler::default().compile(raw, target, &Schema::new(&model))
    }

    #[test]
    fn test_relational_equality() {
        let compiled = compile("q(eq(name,ocp))", Target::Relational).unwrap();
        assert_eq!(
            compiled.to_string(),
            r#"SELECT * FROM "jobs" WHERE "name" = 'ocp'"#
        );
    }

    #[test]
    fn test_text_render() {
        let compiled = compile("q(and(eq(name,install),eq(type,ocp)))", Target::Text).unwrap();
        assert_eq!(compiled.to_string(), "name='install' AND type='ocp'");
    }

    #[test]
    fn test_search_nested_merge() {
        let Compiled::Search(doc) =
            compile("(components.type=ocp) and (components.version=4.14.27)", Target::SearchIndex)
                .unwrap()
        else {
            panic!("expected a search document");
        };
        assert_eq!(
            doc.0,
            json!({"nested": {"path": "components", "query": {"bool": {"filter": [
                {"term": {"components.type": "ocp"}},
                {"term": {"components.version": "4.14.27"}}
            ]}}}})
        );
    }

    #[test]
    fn test_search_not_in() {
        let Compiled::Search(doc) =
            compile("(team.name not_in [telcoci, RedHat])", Target::SearchIndex).unwrap()
        else {
            panic!("expected a search document");
        };
        assert_eq!(
            doc.into_request_body(),
            json!({"query": {"nested": {"path": "team", "query": {"bool": {"must_not":
                {"terms": {"team.name": ["telcoci", "RedHat"]}}
            }}}}})
        );
    }

    #[test]
    fn test_arity_error() {
        let err = compile("eq(a)", Target::Relational).unwrap_err();
        assert_eq!(err.query, "eq(a)");
        assert_eq!(
            err.reason,
            QueryError::Arity {
                function: "eq".to_string(),
                expected: Arity::Exactly(2),
                actual: 1,
            }
        );
    }

    #[test]
    fn test_contains_on_scalar() {
        let err = compile("contains(scalar_col,x)", Target::Relational).unwrap_err();
        assert_eq!(err.reason, QueryError::type_error("scalar_col is not an array"));
        assert_eq!(
            err.to_string(),
            "malformed query `contains(scalar_col,x)`: scalar_col is not an array"
        );
    }

    #[test]
    fn test_contains_on_scalar_for_text_target() {
        for raw in ["contains(scalar_col,x)", "q(not(not_contains(scalar_col,x)))"] {
            let err = compile(raw, Target::Text).unwrap_err();
            assert_eq!(err.reason, QueryError::type_error("scalar_col is not an array"));
        }
        let compiled = compile("contains(tags,x)", Target::Text).unwrap();
        assert_eq!(compiled.to_string(), "tags CONTAINS ['x']");
    }

    #[test]
    fn test_unknown_field_for_every_target() {
        for (raw, target) in [
            ("q(eq(owner,me))", Target::Relational),
            ("q(eq(owner,me))", Target::Text),
            ("(owner.name=me)", Target::SearchIndex),
        ] {
            let err = compile(raw, target).unwrap_err();
            assert_eq!(err.reason.kind(), "validation", "{}", raw);
        }
    }

    #[test]
    fn test_dotted_field_is_not_a_column() {
        let err = compile("q(eq(components.type,ocp))", Target::Relational).unwrap_err();
        assert_eq!(err.reason, QueryError::validation("components.type"));
    }

    #[test]
    fn test_length_limit() {
        let model = jobs();
        let compiler = QueryCompiler::new(CompilerConfig {
            max_input_len: 10,
            ..Default::default()
        });
        let err = compiler
            .compile("q(eq(name,openshift))", Target::Relational, &Schema::new(&model))
            .unwrap_err();
        assert!(matches!(err.reason, QueryError::Syntax { .. }));
    }

    #[test]
    fn test_compile_into_running_query() {
        let model = jobs();
        let mut select = Query::select()
            .column(sea_query::Asterisk)
            .from(sql_compiler::TableName("jobs".to_string()))
            .and_where(Expr::col(sql_compiler::ColumnName("type".to_string())).eq("ocp"))
            .to_owned();
        QueryCompiler::default()
            .compile_into("q(eq(name,install))", &mut select, &Schema::new(&model))
            .unwrap();
        assert_eq!(
            sql_compiler::to_sql(&select),
            r#"SELECT * FROM "jobs" WHERE "type" = 'ocp' AND "name" = 'install'"#
        );

        let before = sql_compiler::to_sql(&select);
        assert!(QueryCompiler::default()
            .compile_into("q(eq(missing,x))", &mut select, &Schema::new(&model))
            .is_err());
        assert_eq!(sql_compiler::to_sql(&select), before);
    }

    #[test]
    fn test_target_names() {
        assert_eq!(Target::from_name("sql"), Some(Target::Relational));
        assert_eq!(Target::from_name("es"), Some(Target::SearchIndex));
        assert_eq!(Target::from_name("text"), Some(Target::Text));
        assert_eq!(Target::from_name("xml"), None);
    }
}
