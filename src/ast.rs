//! Backend-agnostic filter AST shared by both syntaxes.
//!
//! A tree is built once per request string, validated, consumed by exactly
//! one compiler and dropped. Its `Display` impl is the plain textual rendering
//! (`name='install' AND type='ocp'`).

use std::fmt;

/// A filter expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Leaf comparison of a field against a single literal.
    Comparison {
        field: FieldRef,
        op: CompOp,
        value: Literal,
    },
    /// Leaf membership test against an ordered, non-empty list of literals.
    /// Relational targets read it as "array column contains all values",
    /// search targets as "field is one of the values".
    Membership {
        field: FieldRef,
        negated: bool,
        values: Vec<Literal>,
    },
    /// Leaf null check.
    IsNull { field: FieldRef },
    /// `Not` holds exactly one operand, `And`/`Or` at least two.
    Logical { op: LogicOp, operands: Vec<Node> },
}

impl Node {
    pub fn comparison(field: impl Into<FieldRef>, op: CompOp, value: impl Into<Literal>) -> Self {
        Node::Comparison {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn and(operands: Vec<Node>) -> Self {
        Node::Logical {
            op: LogicOp::And,
            operands,
        }
    }

    pub fn or(operands: Vec<Node>) -> Self {
        Node::Logical {
            op: LogicOp::Or,
            operands,
        }
    }

    pub fn not(operand: Node) -> Self {
        Node::Logical {
            op: LogicOp::Not,
            operands: vec![operand],
        }
    }

    /// The field of a leaf node, `None` for logical combinations.
    pub fn field(&self) -> Option<&FieldRef> {
        match self {
            Node::Comparison { field, .. } | Node::Membership { field, .. } | Node::IsNull { field } => {
                Some(field)
            }
            Node::Logical { .. } => None,
        }
    }

    /// Number of node levels, a leaf counting as one.
    pub fn depth(&self) -> usize {
        match self {
            Node::Logical { operands, .. } => {
                1 + operands.iter().map(Node::depth).max().unwrap_or(0)
            }
            _ => 1,
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, Node::Logical { .. })
    }
}

/// A possibly dotted field reference (`name`, `components.version`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef(pub String);

impl FieldRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Segment before the first dot, only for dotted names.
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once('.').map(|(head, _)| head)
    }
}

impl From<&str> for FieldRef {
    fn from(s: &str) -> Self {
        FieldRef(s.to_string())
    }
}

impl From<String> for FieldRef {
    fn from(s: String) -> Self {
        FieldRef(s)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,    // =
    NotEq, // !=
    Gt,    // >
    Lt,    // <
    Gte,   // >=
    Lte,   // <=
    Like,
    ILike,
}

impl CompOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompOp::Eq => "=",
            CompOp::NotEq => "!=",
            CompOp::Gt => ">",
            CompOp::Lt => "<",
            CompOp::Gte => ">=",
            CompOp::Lte => "<=",
            CompOp::Like => " LIKE ",
            CompOp::ILike => " ILIKE ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Not,
}

/// Literal values. The lexeme is kept verbatim so it reaches the compiled
/// output unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Integer(i64),
}

impl Literal {
    /// Classifies a lexeme. Only canonical decimal integers become
    /// `Integer`, so `007` or `+1` stay text and round-trip intact.
    pub fn from_lexeme(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => Literal::Integer(n),
            _ => Literal::Text(s.to_string()),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Literal::Text(s) => s.clone(),
            Literal::Integer(n) => n.to_string(),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::from_lexeme(s)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Integer(n)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.as_text())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Comparison { field, op, value } => write!(f, "{}{}{}", field, op.symbol(), value),
            Node::Membership {
                field,
                negated,
                values,
            } => {
                if *negated {
                    f.write_str("NOT ")?;
                }
                write!(f, "{} CONTAINS [", field)?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str("]")
            }
            Node::IsNull { field } => write!(f, "{} IS NULL", field),
            Node::Logical { op: LogicOp::Not, operands } => {
                f.write_str("NOT ")?;
                match operands.first() {
                    Some(operand) => write_operand(f, operand),
                    None => Ok(()),
                }
            }
            Node::Logical { op, operands } => {
                let joiner = if *op == LogicOp::And { " AND " } else { " OR " };
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(joiner)?;
                    }
                    write_operand(f, operand)?;
                }
                Ok(())
            }
        }
    }
}

/// Nested combinations are parenthesised so the rendering keeps the tree shape.
fn write_operand(f: &mut fmt::Formatter<'_>, node: &Node) -> fmt::Result {
    if node.is_compound() {
        write!(f, "({})", node)
    } else {
        write!(f, "{}", node)
    }
}
