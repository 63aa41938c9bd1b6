//! CLI error type

use schema_toolkit::{ExportError, ImportError, PipelineError};

/// Failure of a CLI command
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<ImportError> for CliError {
    fn from(error: ImportError) -> Self {
        CliError::Pipeline(error.into())
    }
}

impl From<ExportError> for CliError {
    fn from(error: ExportError) -> Self {
        CliError::Pipeline(error.into())
    }
}
