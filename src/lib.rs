//! Schema Toolkit - Infer declarative schema contracts from tabular data
//!
//! Provides:
//! - Column classification (identifier, boolean, numeric, categorical, datetime)
//! - Public bounds, category domains and missing-value rates
//! - Datetime detection with epoch-ns encoding and the inverse rendering
//! - Target and survival-pair resolution
//! - Constraint synthesis and overlay merging
//! - CSV and override-document import, contract and table export

pub mod contract;
pub mod export;
pub mod import;
pub mod inference;
pub mod pipeline;
pub mod table;

// Re-export commonly used types
pub use contract::{Provenance, RenderView, SchemaContract, SourceInfo};
pub use export::{ExportError, write_contract, write_csv};
pub use import::{Delimiter, ImportError, LoadedTable, load_csv};
pub use inference::{
    ColumnOverride, ColumnOverrides, ColumnType, ConfigError, ConstraintSet, DatetimeSpecEntry,
    InferenceConfig, InferenceConfigBuilder, TargetKind, TargetSelection, TargetSpec,
    infer_columns,
};
pub use pipeline::{
    PipelineError, PrepareFiles, PrepareInputs, PrepareOutput, prepare_schema, render_table,
};
pub use table::{Column, Table, TableError};
