//! Error types for schema inference
//!
//! Only configuration problems are errors. Ambiguous data (all-null columns,
//! oversized domains, heuristic ties) resolves to a documented default and is
//! never reported through this type.

use thiserror::Error;

/// Fatal configuration errors, raised before any column is inspected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// One half of the survival event/time pair was given without the other
    #[error("--survival-{given}-col was given without --survival-{missing}-col; both must be provided together")]
    UnpairedSurvivalColumn {
        given: &'static str,
        missing: &'static str,
    },

    /// A survival target definition does not name exactly one event and one time column
    #[error("Invalid survival target: {0}")]
    InvalidSurvivalTarget(String),

    /// Unknown target kind string
    #[error("Unknown target kind '{0}' (expected single, multi_target or survival_pair)")]
    UnknownTargetKind(String),

    /// Unknown column type string in an override document
    #[error("Invalid type '{value}' for column '{column}'")]
    InvalidColumnType { column: String, value: String },

    /// An override document could not be understood
    #[error("Malformed {document}: {message}")]
    MalformedDocument {
        document: &'static str,
        message: String,
    },

    /// A fraction option outside [0, 1] or not finite
    #[error("Option '{name}' must be a fraction between 0 and 1, got {value}")]
    InvalidFraction { name: &'static str, value: f64 },

    /// A padding option that is negative or not finite
    #[error("Option '{name}' must be a non-negative number, got {value}")]
    InvalidPadding { name: &'static str, value: f64 },

    /// A strftime pattern chrono cannot render
    #[error("Invalid datetime format '{0}'")]
    InvalidDatetimeFormat(String),

    /// A render request for a column the contract never recorded a format for
    #[error("Column '{0}' is marked for datetime rendering but has no datetime_spec entry")]
    MissingDatetimeSpec(String),
}

impl ConfigError {
    /// Create a malformed-document error
    pub fn malformed(document: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            document,
            message: message.into(),
        }
    }
}
