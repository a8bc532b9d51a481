//! Configuration: compiler limits and model definitions loaded from JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ColumnType, TableModel};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Limits that bound the recursive parsers and compilers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Longest accepted query, in bytes
    pub max_input_len: usize,
    /// Deepest accepted nesting of calls or parenthesised groups
    pub max_depth: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_input_len: 4096,
            max_depth: 64,
        }
    }
}

/// Limits plus the named models filters are compiled against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub limits: CompilerConfig,
    pub models: BTreeMap<String, TableModel>,
}

impl SchemaConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_ref.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&content)?;
        log::info!(
            "loaded {} models from {}",
            config.models.len(),
            path_ref.display()
        );
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn model(&self, name: &str) -> Option<&TableModel> {
        self.models.get(name)
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }
}

/// Built-in models of the CI service, used when no config file is present.
impl Default for SchemaConfig {
    fn default() -> Self {
        use ColumnType::*;

        let mut models = BTreeMap::new();
        models.insert(
            "jobs".to_string(),
            TableModel::new("jobs")
                .column("id", Uuid)
                .column("name", Text)
                .column("comment", Text)
                .column("status", Text)
                .column("configuration", Text)
                .column("url", Text)
                .column("duration", Integer)
                .column("tags", Array)
                .column("team_id", Uuid)
                .column("remoteci_id", Uuid)
                .column("topic_id", Uuid)
                .column("created_at", Timestamp)
                .column("updated_at", Timestamp),
        );
        models.insert(
            "components".to_string(),
            TableModel::new("components")
                .column("id", Uuid)
                .column("name", Text)
                .column("type", Text)
                .column("version", Text)
                .column("display_name", Text)
                .column("url", Text)
                .column("state", Text)
                .column("tags", Array)
                .column("data", Json)
                .column("topic_id", Uuid)
                .column("released_at", Timestamp)
                .column("created_at", Timestamp),
        );
        models.insert(
            "teams".to_string(),
            TableModel::new("teams")
                .column("id", Uuid)
                .column("name", Text)
                .column("country", Text)
                .column("state", Text)
                .column("external", Boolean)
                .column("has_pre_release_access", Boolean)
                .column("created_at", Timestamp),
        );
        models.insert(
            "topics".to_string(),
            TableModel::new("topics")
                .column("id", Uuid)
                .column("name", Text)
                .column("state", Text)
                .column("component_types", Array)
                .column("export_control", Boolean)
                .column("product_id", Uuid)
                .column("created_at", Timestamp),
        );
        models.insert(
            "remotecis".to_string(),
            TableModel::new("remotecis")
                .column("id", Uuid)
                .column("name", Text)
                .column("state", Text)
                .column("public", Boolean)
                .column("team_id", Uuid)
                .column("created_at", Timestamp),
        );
        // Search-index job documents; object fields hold nested sub-documents.
        models.insert(
            "job_documents".to_string(),
            TableModel::new("jobs")
                .column("id", Text)
                .column("name", Text)
                .column("status", Text)
                .column("tags", Array)
                .column("created_at", Timestamp)
                .column("components", Json)
                .column("team", Json)
                .column("topic", Json)
                .column("remoteci", Json),
        );

        Self {
            limits: CompilerConfig::default(),
            models,
        }
    }
}
