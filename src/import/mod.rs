//! Import functionality
//!
//! Loads the inputs of a run:
//! - delimited data files (CSV/TSV, delimiter sniffed or given)
//! - column type overrides
//! - target spec documents
//! - constraint overlays
//! - TOML configuration files
//! - the datetime parts of a written contract, for rendering

pub mod csv;
pub mod overrides;

use std::path::Path;

use crate::inference::error::ConfigError;
use crate::table::TableError;

/// Error during import
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("IO error reading {path}: {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error in {path}: {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid table in {path}: {source}")]
    ValidationError {
        path: String,
        #[source]
        source: TableError,
    },
    #[error("{path}: {source}")]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },
}

impl ImportError {
    /// The configuration error behind this failure, if any
    pub fn config_error(&self) -> Option<&ConfigError> {
        match self {
            ImportError::Config { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Read a whole file as UTF-8
pub(crate) fn read_text(path: &Path) -> Result<String, ImportError> {
    std::fs::read_to_string(path).map_err(|source| ImportError::IoError {
        path: path.display().to_string(),
        source,
    })
}

pub use self::csv::{Delimiter, LoadedTable, load_csv, parse_csv, sniff_delimiter};
pub use self::overrides::{
    load_column_types, load_config_file, load_constraints_overlay, load_render_view,
    load_target_spec, parse_column_types, parse_constraints_overlay, parse_render_view,
    parse_target_spec,
};
