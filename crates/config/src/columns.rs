//! Declarative column configuration.
//!
//! Tables are described by a list of `ColumnSpec`s, loaded from TOML
//! (`[[columns]]` tables) or JSON (`{"columns": [...]}`). Behavior that
//! cannot be expressed as data (predicates, lookups, custom codecs) is
//! attached by the engine after conversion.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use budgetgrid_core::{CellValue, ColumnKind, ColumnRole};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_editable() -> bool {
    true
}

/// One column as written in a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(default)]
    pub column_kind: ColumnKind,
    #[serde(default)]
    pub role: ColumnRole,
    #[serde(default = "default_editable")]
    pub editable: bool,
    /// Overrides the kind's default null sentinel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_value: Option<CellValue>,
    #[serde(default)]
    pub aggregable: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl ColumnSpec {
    pub fn new(field: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            field: field.into(),
            header: None,
            column_kind: kind,
            role: ColumnRole::Data,
            editable: true,
            null_value: None,
            aggregable: false,
            hidden: false,
        }
    }

    /// Header text, defaulting to the field key.
    pub fn effective_header(&self) -> &str {
        self.header.as_deref().unwrap_or(&self.field)
    }
}

#[derive(Debug, Deserialize)]
struct ColumnFile {
    columns: Vec<ColumnSpec>,
}

/// Parse column specs from TOML.
pub fn parse_columns_toml(contents: &str) -> Result<Vec<ColumnSpec>, ConfigError> {
    let file: ColumnFile = toml::from_str(contents)
        .map_err(|e| ConfigError::Parse { path: None, message: e.to_string() })?;
    validate_columns(&file.columns)?;
    Ok(file.columns)
}

/// Parse column specs from JSON.
pub fn parse_columns_json(contents: &str) -> Result<Vec<ColumnSpec>, ConfigError> {
    let file: ColumnFile = serde_json::from_str(contents)
        .map_err(|e| ConfigError::Parse { path: None, message: e.to_string() })?;
    validate_columns(&file.columns)?;
    Ok(file.columns)
}

/// Load column specs, choosing the format from the file extension.
pub fn load_columns(path: &Path) -> Result<Vec<ColumnSpec>, ConfigError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let parsed = match ext.as_deref() {
        Some("toml") => parse_columns_toml(&contents),
        Some("json") => parse_columns_json(&contents),
        _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    };
    parsed.map_err(|e| e.with_path(path))
}

/// Check cross-column rules: fields present and unique, aggregation only on
/// numeric data columns.
pub fn validate_columns(columns: &[ColumnSpec]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for spec in columns {
        if spec.field.trim().is_empty() {
            return Err(ConfigError::Invalid("column with empty field".to_string()));
        }
        if !seen.insert(spec.field.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate column field '{}'", spec.field)));
        }
        if spec.aggregable && !spec.column_kind.is_numeric() {
            return Err(ConfigError::Invalid(format!(
                "column '{}' is aggregable but not numeric",
                spec.field
            )));
        }
        if spec.aggregable && spec.role == ColumnRole::Action {
            return Err(ConfigError::Invalid(format!(
                "action column '{}' cannot be aggregable",
                spec.field
            )));
        }
    }
    Ok(())
}
