//! The "model with named, typed columns" the compilers validate against.
//!
//! The compiler never touches the ORM; anything implementing [`Model`] can be
//! used as the column whitelist. [`TableModel`] is the serde-loadable
//! implementation used by the configuration file and the tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Storage type of a column, as far as the compilers care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Boolean,
    Timestamp,
    Uuid,
    Json,
    /// Array column; the only type `contains`/`not_contains` accept.
    Array,
}

impl ColumnType {
    pub fn is_array(&self) -> bool {
        matches!(self, ColumnType::Array)
    }
}

pub trait Model {
    /// Name of the backing table, used to qualify columns.
    fn table_name(&self) -> &str;

    /// Type of a legal column, `None` when the column is not whitelisted.
    fn column_type(&self, column: &str) -> Option<ColumnType>;

    fn column_names(&self) -> Vec<&str>;

    fn has_column(&self, column: &str) -> bool {
        self.column_type(column).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableModel {
    pub table: String,
    pub columns: BTreeMap<String, ColumnType>,
}

impl TableModel {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: BTreeMap::new(),
        }
    }

    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.insert(name.into(), column_type);
        self
    }
}

impl Model for TableModel {
    fn table_name(&self) -> &str {
        &self.table
    }

    fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.columns.get(column).copied()
    }

    fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }
}

/// The models a filter may reference: the queried model and, optionally,
/// a secondary model joined by the caller.
#[derive(Clone, Copy)]
pub struct Schema<'m> {
    pub primary: &'m dyn Model,
    pub secondary: Option<&'m dyn Model>,
}

/// A whitelisted column and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumn<'m> {
    pub table: &'m str,
    pub column_type: ColumnType,
    /// Set for secondary-model columns, which must be table-qualified.
    pub secondary: bool,
}

impl<'m> Schema<'m> {
    pub fn new(primary: &'m dyn Model) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secondary: &'m dyn Model) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Looks the column up in the primary model, then the secondary one.
    pub fn resolve(&self, column: &str) -> Option<ResolvedColumn<'m>> {
        if let Some(column_type) = self.primary.column_type(column) {
            return Some(ResolvedColumn {
                table: self.primary.table_name(),
                column_type,
                secondary: false,
            });
        }
        let secondary = self.secondary?;
        secondary.column_type(column).map(|column_type| ResolvedColumn {
            table: secondary.table_name(),
            column_type,
            secondary: true,
        })
    }
}
