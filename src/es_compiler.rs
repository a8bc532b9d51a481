//! Search-index compiler: AST to an Elasticsearch boolean query document.
//!
//! ```text
//! and  -> {"bool": {"filter": [c1, c2]}}
//! or   -> {"bool": {"should": [c1, c2]}}
//! not  -> {"bool": {"must_not": c}}
//! a=b  -> {"term": {"a": "b"}}          a=~re -> {"regexp": {"a": {...}}}
//! a!=b -> {"bool": {"must_not": {"term": ...}}}
//! a<b  -> {"range": {"a": {"lt": "b"}}}
//! a not_in [..] -> {"bool": {"must_not": {"terms": {"a": [..]}}}}
//! ```
//!
//! Nested objects: when every immediate operand of an and/or is a leaf on a
//! dotted field with the same first segment, the combination is wrapped once
//! in `{"nested": {"path": ns, "query": ...}}` so the conditions must match
//! within one sub-object. The check only looks at immediate operands; compound
//! operands expose no namespace. Membership and null leaves on a dotted field
//! that are not already inside a nested query for their path wrap themselves.

use serde_json::{json, Map, Value};

use crate::ast::{CompOp, FieldRef, Literal, LogicOp, Node};
use crate::config::CompilerConfig;
use crate::error::{QueryError, Result};

/// Leading character of a value that selects a `regexp` clause.
pub const REGEXP_MARKER: char = '~';

/// A compiled search-index query clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDocument(pub Value);

impl CompiledDocument {
    /// The full search request body, `{"query": <clause>}`.
    pub fn into_request_body(self) -> Value {
        json!({ "query": self.0 })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EsCompiler {
    max_depth: usize,
}

impl Default for EsCompiler {
    fn default() -> Self {
        Self::new(&CompilerConfig::default())
    }
}

impl EsCompiler {
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            max_depth: config.max_depth,
        }
    }

    /// Compiles a tree whose fields have already been validated. Trees deeper
    /// than the configured limit are rejected before any recursion.
    pub fn compile(&self, node: &Node) -> Result<CompiledDocument> {
        if node.depth() > self.max_depth {
            return Err(QueryError::syntax(
                format!("expression nested deeper than {} levels", self.max_depth),
                None,
            ));
        }
        self.compile_node(node, None).map(CompiledDocument)
    }

    /// `scope` is the path of the enclosing `nested` query, if any.
    fn compile_node(&self, node: &Node, scope: Option<&str>) -> Result<Value> {
        match node {
            Node::Comparison { field, op, value } => self.compile_comparison(field, *op, value),
            Node::Membership {
                field,
                negated,
                values,
            } => {
                log::debug!("membership on {} (negated: {})", field, negated);
                let values: Vec<Value> = values.iter().map(literal_to_json).collect();
                let terms = object("terms", object(field.as_str(), Value::Array(values)));
                let clause = if *negated { must_not(terms) } else { terms };
                Ok(self_wrap(field, clause, scope))
            }
            Node::IsNull { field } => {
                log::debug!("null check on {}", field);
                let clause = must_not(json!({ "exists": { "field": field.as_str() } }));
                Ok(self_wrap(field, clause, scope))
            }
            Node::Logical {
                op: LogicOp::Not,
                operands,
            } => {
                let operand = operands
                    .first()
                    .ok_or_else(|| QueryError::syntax("not without operand", None))?;
                Ok(must_not(self.compile_node(operand, scope)?))
            }
            Node::Logical { op, operands } => {
                let shared = shared_namespace(operands);
                let inner_scope = shared.or(scope);
                let clauses = operands
                    .iter()
                    .map(|operand| self.compile_node(operand, inner_scope))
                    .collect::<Result<Vec<_>>>()?;
                let occurrence = if *op == LogicOp::Or { "should" } else { "filter" };
                let combined = object("bool", object(occurrence, Value::Array(clauses)));
                match shared {
                    Some(path) if scope != Some(path) => {
                        log::debug!("merging {} operands under nested path {}", operands.len(), path);
                        Ok(nested(path, combined))
                    }
                    _ => Ok(combined),
                }
            }
        }
    }

    fn compile_comparison(&self, field: &FieldRef, op: CompOp, value: &Literal) -> Result<Value> {
        log::debug!("{:?}({}, {})", op, field, value);
        if let Literal::Text(text) = value {
            if let Some(pattern) = text.strip_prefix(REGEXP_MARKER) {
                return compile_regexp(field, op, pattern);
            }
        }

        let value = literal_to_json(value);
        let clause = match op {
            CompOp::Eq => object("term", object(field.as_str(), value)),
            CompOp::NotEq => must_not(object("term", object(field.as_str(), value))),
            CompOp::Gt => range(field, "gt", value),
            CompOp::Gte => range(field, "gte", value),
            CompOp::Lt => range(field, "lt", value),
            CompOp::Lte => range(field, "lte", value),
            CompOp::Like | CompOp::ILike => {
                return Err(QueryError::type_error(format!(
                    "{:?} on {} is not supported by the search index",
                    op, field
                )))
            }
        };
        Ok(clause)
    }
}

fn compile_regexp(field: &FieldRef, op: CompOp, pattern: &str) -> Result<Value> {
    if pattern.is_empty() {
        return Err(QueryError::syntax(
            format!("empty regular expression for {}", field),
            None,
        ));
    }
    let regexp = object(
        "regexp",
        object(
            field.as_str(),
            json!({ "value": pattern, "case_insensitive": true }),
        ),
    );
    match op {
        CompOp::Eq => Ok(regexp),
        CompOp::NotEq => Ok(must_not(regexp)),
        _ => Err(QueryError::type_error(format!(
            "regular expressions on {} only support = and !=",
            field
        ))),
    }
}

/// Namespace a node exposes to its parent: only leaves on dotted fields.
fn nested_namespace(node: &Node) -> Option<&str> {
    match node {
        Node::Logical { .. } => None,
        leaf => leaf.field().and_then(FieldRef::namespace),
    }
}

/// The namespace shared by every operand, if there is one.
fn shared_namespace(operands: &[Node]) -> Option<&str> {
    if operands.len() < 2 {
        return None;
    }
    let first = nested_namespace(&operands[0])?;
    operands[1..]
        .iter()
        .all(|operand| nested_namespace(operand) == Some(first))
        .then_some(first)
}

fn self_wrap(field: &FieldRef, clause: Value, scope: Option<&str>) -> Value {
    match field.namespace() {
        Some(path) if scope != Some(path) => nested(path, clause),
        _ => clause,
    }
}

fn nested(path: &str, query: Value) -> Value {
    json!({ "nested": { "path": path, "query": query } })
}

fn must_not(clause: Value) -> Value {
    json!({ "bool": { "must_not": clause } })
}

fn range(field: &FieldRef, bound: &str, value: Value) -> Value {
    object("range", object(field.as_str(), object(bound, value)))
}

fn object(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

/// Values are sent as the lexeme text; the index mapping decides the type.
fn literal_to_json(literal: &Literal) -> Value {
    Value::String(literal.as_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::parser::infix;

    fn build(input: &str) -> Value {
        let node = infix::parse(input, &CompilerConfig::default()).unwrap();
        EsCompiler::default().compile(&node).unwrap().into_request_body()
    }

    fn clause(input: &str) -> Result<Value> {
        let node = infix::parse(input, &CompilerConfig::default())?;
        EsCompiler::default().compile(&node).map(|doc| doc.0)
    }

    #[test]
    fn test_single_term() {
        assert_eq!(build("f1=v1"), json!({"query": {"term": {"f1": "v1"}}}));
        assert_eq!(build("(f1=v1)"), json!({"query": {"term": {"f1": "v1"}}}));
    }

    #[test]
    fn test_and_or() {
        assert_eq!(
            build("(f1=v1) and (f2=v2)"),
            json!({"query": {"bool": {"filter": [{"term": {"f1": "v1"}}, {"term": {"f2": "v2"}}]}}})
        );
        assert_eq!(
            build("((f1=v1) and (f2=v2)) or (f3=v3)"),
            json!({"query": {"bool": {"should": [
                {"bool": {"filter": [{"term": {"f1": "v1"}}, {"term": {"f2": "v2"}}]}},
                {"term": {"f3": "v3"}}
            ]}}})
        );
    }

    #[test]
    fn test_deep_tree() {
        assert_eq!(
            build("((f1=v1) and ((f2=v2) or (f2=v22))) or ((f3=v3) and (f4=v4))"),
            json!({"query": {"bool": {"should": [
                {"bool": {"filter": [
                    {"term": {"f1": "v1"}},
                    {"bool": {"should": [{"term": {"f2": "v2"}}, {"term": {"f2": "v22"}}]}}
                ]}},
                {"bool": {"filter": [{"term": {"f3": "v3"}}, {"term": {"f4": "v4"}}]}}
            ]}}})
        );
    }

    #[test]
    fn test_same_namespace_pair_is_merged_once() {
        assert_eq!(
            clause("(components.type=ocp) and (components.version=4.14.27)").unwrap(),
            json!({"nested": {"path": "components", "query": {"bool": {"filter": [
                {"term": {"components.type": "ocp"}},
                {"term": {"components.version": "4.14.27"}}
            ]}}}})
        );
        assert_eq!(
            clause("(components.type=ocp) or (components.type=rhel)").unwrap(),
            json!({"nested": {"path": "components", "query": {"bool": {"should": [
                {"term": {"components.type": "ocp"}},
                {"term": {"components.type": "rhel"}}
            ]}}}})
        );
    }

    #[test]
    fn test_merge_is_not_transitive() {
        assert_eq!(
            build("(name=vcp) and (((components.type=ocp) and (components.version=4.14.27)) and ((components.type=aspenmesh) and (components.version=1.18.7-am1)))"),
            json!({"query": {"bool": {"filter": [
                {"term": {"name": "vcp"}},
                {"bool": {"filter": [
                    {"nested": {"path": "components", "query": {"bool": {"filter": [
                        {"term": {"components.type": "ocp"}},
                        {"term": {"components.version": "4.14.27"}}
                    ]}}}},
                    {"nested": {"path": "components", "query": {"bool": {"filter": [
                        {"term": {"components.type": "aspenmesh"}},
                        {"term": {"components.version": "1.18.7-am1"}}
                    ]}}}}
                ]}}
            ]}}})
        );
    }

    #[test]
    fn test_differing_or_absent_namespaces_never_merge() {
        assert_eq!(
            clause("(components.type=ocp) and (team.name=ci)").unwrap(),
            json!({"bool": {"filter": [
                {"term": {"components.type": "ocp"}},
                {"term": {"team.name": "ci"}}
            ]}})
        );
        assert_eq!(
            clause("(components.type=ocp) and (name=ci)").unwrap(),
            json!({"bool": {"filter": [
                {"term": {"components.type": "ocp"}},
                {"term": {"name": "ci"}}
            ]}})
        );
    }

    #[test]
    fn test_not_in_self_wraps() {
        assert_eq!(
            clause("(team.name not_in [telcoci, RedHat])").unwrap(),
            json!({"nested": {"path": "team", "query": {"bool": {"must_not":
                {"terms": {"team.name": ["telcoci", "RedHat"]}}
            }}}})
        );
        assert_eq!(
            clause("name not_in [lol, kikoolol]").unwrap(),
            json!({"bool": {"must_not": {"terms": {"name": ["lol", "kikoolol"]}}}})
        );
        assert_eq!(
            build("(components.type=cnf-certification-test) and (team.name not_in [telcoci, RedHat])"),
            json!({"query": {"bool": {"filter": [
                {"term": {"components.type": "cnf-certification-test"}},
                {"nested": {"path": "team", "query": {"bool": {"must_not":
                    {"terms": {"team.name": ["telcoci", "RedHat"]}}
                }}}}
            ]}}})
        );
    }

    #[test]
    fn test_merged_membership_does_not_wrap_twice() {
        assert_eq!(
            clause("(team.name not_in [ci]) and (team.country=FR)").unwrap(),
            json!({"nested": {"path": "team", "query": {"bool": {"filter": [
                {"bool": {"must_not": {"terms": {"team.name": ["ci"]}}}},
                {"term": {"team.country": "FR"}}
            ]}}}})
        );
    }

    #[test]
    fn test_positive_membership() {
        assert_eq!(
            clause("status in [success, failure]").unwrap(),
            json!({"terms": {"status": ["success", "failure"]}})
        );
    }

    #[test]
    fn test_regexp_marker() {
        assert_eq!(
            clause("(components.version=~4\\.14.*)").unwrap(),
            json!({"regexp": {"components.version": {"value": "4\\.14.*", "case_insensitive": true}}})
        );
        assert_eq!(
            clause("name!=~ocp.*").unwrap(),
            json!({"bool": {"must_not": {"regexp": {"name": {"value": "ocp.*", "case_insensitive": true}}}}})
        );
        assert!(matches!(clause("name=~"), Err(QueryError::Syntax { .. })));
        assert!(matches!(clause("name>~a"), Err(QueryError::Type { .. })));
    }

    #[test]
    fn test_range_and_not_equal() {
        assert_eq!(
            clause("(duration>=60) and (created_at<2024-01-01)").unwrap(),
            json!({"bool": {"filter": [
                {"range": {"duration": {"gte": "60"}}},
                {"range": {"created_at": {"lt": "2024-01-01"}}}
            ]}})
        );
        assert_eq!(
            clause("status!=failure").unwrap(),
            json!({"bool": {"must_not": {"term": {"status": "failure"}}}})
        );
    }

    #[test]
    fn test_values_keep_their_lexeme() {
        assert_eq!(
            clause("(components.version=4)").unwrap(),
            json!({"term": {"components.version": "4"}})
        );
        assert_eq!(
            clause("team.id in [1, 2, 007]").unwrap(),
            json!({"nested": {"path": "team", "query":
                {"terms": {"team.id": ["1", "2", "007"]}}
            }})
        );
    }

    #[test]
    fn test_depth_limit_on_hand_built_trees() {
        let mut node = Node::comparison("name", CompOp::Eq, "a");
        for _ in 0..3 {
            node = Node::not(node);
        }
        let shallow = EsCompiler::new(&CompilerConfig {
            max_depth: 3,
            ..Default::default()
        });
        assert!(matches!(shallow.compile(&node), Err(QueryError::Syntax { .. })));

        let enough = EsCompiler::new(&CompilerConfig {
            max_depth: 4,
            ..Default::default()
        });
        assert!(enough.compile(&node).is_ok());
    }

    #[test]
    fn test_like_is_unsupported() {
        let node = Node::comparison("name", CompOp::Like, "ocp%");
        let err = EsCompiler::default().compile(&node).unwrap_err();
        assert_eq!(err.kind(), "type");
    }

    #[test]
    fn test_not_and_null() {
        let node = Node::not(Node::IsNull {
            field: "team.name".into(),
        });
        assert_eq!(
            EsCompiler::default().compile(&node).unwrap().0,
            json!({"bool": {"must_not": {"nested": {"path": "team", "query":
                {"bool": {"must_not": {"exists": {"field": "team.name"}}}}
            }}}})
        );
    }

    #[test]
    fn test_n_ary_merge_requires_every_operand() {
        let all_same = Node::and(vec![
            Node::comparison("components.type", CompOp::Eq, "ocp"),
            Node::comparison("components.name", CompOp::Eq, "4.14"),
            Node::comparison("components.state", CompOp::Eq, "active"),
        ]);
        let doc = EsCompiler::default().compile(&all_same).unwrap().0;
        assert_eq!(doc["nested"]["path"], json!("components"));
        assert_eq!(doc["nested"]["query"]["bool"]["filter"].as_array().unwrap().len(), 3);

        let mixed = Node::and(vec![
            Node::comparison("components.type", CompOp::Eq, "ocp"),
            Node::comparison("components.name", CompOp::Eq, "4.14"),
            Node::comparison("team.name", CompOp::Eq, "ci"),
        ]);
        let doc = EsCompiler::default().compile(&mixed).unwrap().0;
        assert!(doc.get("nested").is_none());
        assert_eq!(doc["bool"]["filter"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_determinism() {
        let input = "((components.type=ocp) and (components.version=4.14)) or (team.name not_in [a, b])";
        assert_eq!(clause(input).unwrap(), clause(input).unwrap());
    }
}
