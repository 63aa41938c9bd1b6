//! Export functionality
//!
//! Writes the outputs of a run:
//! - the schema contract as pretty-printed JSON
//! - tables (encoded or rendered) as delimited text

use std::fs;
use std::path::Path;

use tracing::info;

use crate::contract::SchemaContract;
use crate::table::Table;

/// Error during export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("IO error writing {path}: {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ExportError::IoError {
            path: path.display().to_string(),
            source,
        }
    }
}

fn ensure_parent(path: &Path) -> Result<(), ExportError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Render the contract as pretty JSON with a trailing newline
pub fn contract_to_string(contract: &SchemaContract) -> Result<String, ExportError> {
    let mut text = serde_json::to_string_pretty(contract)
        .map_err(|e| ExportError::SerializationError(e.to_string()))?;
    text.push('\n');
    Ok(text)
}

/// Write the contract, creating parent directories
pub fn write_contract(contract: &SchemaContract, path: &Path) -> Result<(), ExportError> {
    let text = contract_to_string(contract)?;
    ensure_parent(path)?;
    fs::write(path, text).map_err(|e| ExportError::io(path, e))?;
    info!(path = %path.display(), columns = contract.column_types.len(), "wrote schema contract");
    Ok(())
}

/// Render a table as delimited text; nulls become empty cells
pub fn table_to_csv(table: &Table, delimiter: u8) -> Result<String, ExportError> {
    let serialization = |e: csv::Error| ExportError::SerializationError(e.to_string());
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer
        .write_record(table.column_names())
        .map_err(serialization)?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|cell| cell.unwrap_or("")))
            .map_err(serialization)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::SerializationError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::SerializationError(e.to_string()))
}

/// Write a table, creating parent directories
pub fn write_csv(table: &Table, path: &Path, delimiter: u8) -> Result<(), ExportError> {
    let text = table_to_csv(table, delimiter)?;
    ensure_parent(path)?;
    fs::write(path, text).map_err(|e| ExportError::io(path, e))?;
    info!(path = %path.display(), rows = table.row_count(), "wrote table");
    Ok(())
}
