//! Filter-expression compiler.
//!
//! Untrusted filter text is parsed into one backend-agnostic AST, checked
//! against a column whitelist and compiled to a sea-query `SELECT`, an
//! Elasticsearch query document or a plain text rendering.

pub mod ast;
pub mod config;
pub mod error;
pub mod es_compiler;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod query;
pub mod sql_compiler;
pub mod token;
pub mod validator;

pub use ast::{CompOp, FieldRef, Literal, LogicOp, Node};
pub use config::{CompilerConfig, ConfigError, SchemaConfig};
pub use error::{MalformedQuery, QueryError};
pub use es_compiler::{CompiledDocument, EsCompiler};
pub use model::{ColumnType, Model, Schema, TableModel};
pub use query::{Compiled, QueryCompiler, Target};
pub use sql_compiler::SqlCompiler;
pub use validator::{FieldPolicy, Validator};
