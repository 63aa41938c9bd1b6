//! User-supplied override documents
//!
//! All documents are JSON except the configuration file, which is TOML.
//! Parsing errors are reported as [`ConfigError::MalformedDocument`] so the
//! run aborts before inference starts.

use std::path::Path;

use serde_json::Value;

use super::{ImportError, read_text};
use crate::contract::RenderView;
use crate::inference::classifier::{ColumnOverride, ColumnOverrides};
use crate::inference::constraints::ConstraintSet;
use crate::inference::error::ConfigError;
use crate::inference::formats::format_number;
use crate::inference::target::{TargetSpec, TargetSpecDocument};
use crate::inference::types::ColumnType;
use crate::inference::InferenceConfig;

const COLUMN_TYPES: &str = "column types document";
const TARGET_SPEC: &str = "target spec document";
const CONSTRAINTS: &str = "constraints document";
const SCHEMA: &str = "schema document";

fn parse_json(text: &str, document: &'static str) -> Result<Value, ConfigError> {
    serde_json::from_str(text).map_err(|e| ConfigError::malformed(document, e.to_string()))
}

fn domain_value(column: &str, value: &Value) -> Result<String, ConfigError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (None, Some(u), _) => u.to_string(),
            (None, None, Some(f)) => format_number(f),
            _ => n.to_string(),
        }),
        other => Err(ConfigError::malformed(
            COLUMN_TYPES,
            format!("domain of '{}' contains a non-scalar value: {}", column, other),
        )),
    }
}

fn column_override(column: &str, value: &Value) -> Result<ColumnOverride, ConfigError> {
    match value {
        Value::String(type_name) => Ok(ColumnOverride::new(ColumnType::parse_for(
            column, type_name,
        )?)),
        Value::Object(fields) => {
            let type_name = fields.get("type").and_then(Value::as_str).ok_or_else(|| {
                ConfigError::malformed(
                    COLUMN_TYPES,
                    format!("entry for '{}' needs a string \"type\"", column),
                )
            })?;
            let mut column_override = ColumnOverride::new(ColumnType::parse_for(column, type_name)?);
            match fields.get("domain") {
                None | Some(Value::Null) => {}
                Some(Value::Array(values)) => {
                    let domain = values
                        .iter()
                        .map(|v| domain_value(column, v))
                        .collect::<Result<Vec<_>, _>>()?;
                    column_override = column_override.with_domain(domain);
                }
                Some(_) => {
                    return Err(ConfigError::malformed(
                        COLUMN_TYPES,
                        format!("domain of '{}' must be a list", column),
                    ));
                }
            }
            Ok(column_override)
        }
        _ => Err(ConfigError::malformed(
            COLUMN_TYPES,
            format!("entry for '{}' must be a type string or an object", column),
        )),
    }
}

/// Parse `{col: "type"}` / `{col: {"type": ..., "domain": [...]}}`
pub fn parse_column_types(text: &str) -> Result<ColumnOverrides, ConfigError> {
    let Value::Object(entries) = parse_json(text, COLUMN_TYPES)? else {
        return Err(ConfigError::malformed(COLUMN_TYPES, "expected a JSON object"));
    };
    entries
        .iter()
        .map(|(column, value)| Ok((column.clone(), column_override(column, value)?)))
        .collect()
}

/// Parse a target spec in either the tagged or the positional form
pub fn parse_target_spec(text: &str) -> Result<TargetSpec, ConfigError> {
    let value = parse_json(text, TARGET_SPEC)?;
    if !value.is_object() {
        return Err(ConfigError::malformed(TARGET_SPEC, "expected a JSON object"));
    }
    let document: TargetSpecDocument = serde_json::from_value(value)
        .map_err(|e| ConfigError::malformed(TARGET_SPEC, e.to_string()))?;
    TargetSpec::try_from(document)
}

/// Parse a constraints overlay; every section is optional
pub fn parse_constraints_overlay(text: &str) -> Result<ConstraintSet, ConfigError> {
    let value = parse_json(text, CONSTRAINTS)?;
    if !value.is_object() {
        return Err(ConfigError::malformed(CONSTRAINTS, "expected a JSON object"));
    }
    serde_json::from_value(value).map_err(|e| ConfigError::malformed(CONSTRAINTS, e.to_string()))
}

/// Parse the datetime parts of a previously written schema contract
pub fn parse_render_view(text: &str) -> Result<RenderView, ConfigError> {
    let value = parse_json(text, SCHEMA)?;
    if !value.is_object() {
        return Err(ConfigError::malformed(SCHEMA, "expected a JSON object"));
    }
    serde_json::from_value(value).map_err(|e| ConfigError::malformed(SCHEMA, e.to_string()))
}

fn load<T>(path: &Path, parse: impl FnOnce(&str) -> Result<T, ConfigError>) -> Result<T, ImportError> {
    let text = read_text(path)?;
    parse(&text).map_err(|source| ImportError::Config {
        path: path.display().to_string(),
        source,
    })
}

/// Load a column types document
pub fn load_column_types(path: &Path) -> Result<ColumnOverrides, ImportError> {
    load(path, parse_column_types)
}

/// Load a target spec document
pub fn load_target_spec(path: &Path) -> Result<TargetSpec, ImportError> {
    load(path, parse_target_spec)
}

/// Load a constraints overlay
pub fn load_constraints_overlay(path: &Path) -> Result<ConstraintSet, ImportError> {
    load(path, parse_constraints_overlay)
}

/// Load the datetime parts of a schema contract
pub fn load_render_view(path: &Path) -> Result<RenderView, ImportError> {
    load(path, parse_render_view)
}

/// Load a TOML configuration file
pub fn load_config_file(path: &Path) -> Result<InferenceConfig, ImportError> {
    load(path, InferenceConfig::from_toml_str)
}
