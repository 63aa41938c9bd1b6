//! End-to-end runs
//!
//! [`prepare_schema`] takes a loaded table and its override documents through
//! every inference stage and assembles the contract. [`render_table`] is the
//! inverse for datetime columns: it turns epoch-ns cells back into strings
//! using a contract's `datetime_spec`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span};

use crate::contract::{RenderView, SchemaContract, SourceInfo};
use crate::export::ExportError;
use crate::import::{self, Delimiter, ImportError};
use crate::inference::classifier::ColumnOverrides;
use crate::inference::constraints::{ConstraintSet, synthesize};
use crate::inference::datetime::{render_values, rendered_column_name};
use crate::inference::error::ConfigError;
use crate::inference::target::{TargetSpec, resolve_target};
use crate::inference::types::ColumnDescriptor;
use crate::inference::{InferenceConfig, infer_columns};
use crate::table::{Column, Table, TableError};

/// Any failure of a run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

/// Everything a prepare run reads
#[derive(Debug, Clone, Default)]
pub struct PrepareInputs {
    pub dataset: String,
    pub table: Table,
    pub source: SourceInfo,
    pub column_overrides: ColumnOverrides,
    pub target_document: Option<TargetSpec>,
    pub constraints_overlay: Option<ConstraintSet>,
}

/// File locations for a prepare run
#[derive(Debug, Clone, Default)]
pub struct PrepareFiles {
    pub data: PathBuf,
    pub delimiter: Delimiter,
    /// Defaults to the data file's stem
    pub dataset_name: Option<String>,
    pub column_types: Option<PathBuf>,
    pub target_spec: Option<PathBuf>,
    pub constraints: Option<PathBuf>,
}

impl PrepareFiles {
    /// Read the data file and every override document
    pub fn load(&self) -> Result<PrepareInputs, ImportError> {
        let column_overrides = match &self.column_types {
            Some(path) => import::load_column_types(path)?,
            None => ColumnOverrides::new(),
        };
        let target_document = self
            .target_spec
            .as_deref()
            .map(import::load_target_spec)
            .transpose()?;
        let constraints_overlay = self
            .constraints
            .as_deref()
            .map(import::load_constraints_overlay)
            .transpose()?;

        let loaded = import::load_csv(&self.data, self.delimiter)?;
        let dataset = self.dataset_name.clone().unwrap_or_else(|| {
            self.data
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "dataset".to_string())
        });

        Ok(PrepareInputs {
            dataset,
            table: loaded.table,
            source: SourceInfo {
                path: self.data.display().to_string(),
                delimiter: loaded.delimiter as char,
                column_types_overrides: self
                    .column_types
                    .as_ref()
                    .map(|p| p.display().to_string()),
            },
            column_overrides,
            target_document,
            constraints_overlay,
        })
    }
}

/// Result of a prepare run
#[derive(Debug, Clone)]
pub struct PrepareOutput {
    pub contract: SchemaContract,
    /// The input table with datetime columns rewritten as epoch-ns
    pub encoded: Table,
    pub descriptors: Vec<ColumnDescriptor>,
}

/// Copy of `table` with every encoded column replaced by its epoch-ns values
fn encoded_table(table: &Table, descriptors: &[ColumnDescriptor]) -> Result<Table, TableError> {
    let mut encoded = table.clone();
    for descriptor in descriptors {
        if let Some(values) = &descriptor.encoded {
            encoded.replace_values(
                &descriptor.name,
                values.iter().map(|v| v.map(|n| n.to_string())).collect(),
            )?;
        }
    }
    Ok(encoded)
}

/// Run every inference stage and assemble the contract
///
/// Configuration is validated before any column is inspected.
/// `generated_at` is stamped into the provenance block.
pub fn prepare_schema(
    inputs: PrepareInputs,
    config: &InferenceConfig,
    generated_at: DateTime<Utc>,
) -> Result<PrepareOutput, PipelineError> {
    let span = info_span!("prepare_schema", dataset = %inputs.dataset);
    let _enter = span.enter();

    config.validate()?;

    let descriptors = infer_columns(&inputs.table, &inputs.column_overrides, config);
    let target = resolve_target(inputs.target_document, &config.target, &descriptors)?;
    match &target {
        Some(spec) => info!(targets = ?spec.targets, kind = %spec.kind, "resolved target"),
        None => info!("no target column"),
    }

    let generated = synthesize(&descriptors, target.as_ref());
    let constraints = match &inputs.constraints_overlay {
        Some(overlay) => generated.merged_with(overlay),
        None => generated,
    };

    let encoded = encoded_table(&inputs.table, &descriptors)?;
    let contract = SchemaContract::assemble(
        inputs.dataset,
        &descriptors,
        target,
        constraints,
        config,
        &inputs.source,
        generated_at,
    );

    info!(
        columns = contract.column_types.len(),
        bounded = contract.public_bounds.len(),
        categorical = contract.public_categories.len(),
        datetime = contract.datetime_spec.len(),
        "assembled schema contract"
    );

    Ok(PrepareOutput {
        contract,
        encoded,
        descriptors,
    })
}

/// Render epoch-ns datetime columns back to strings
///
/// `columns` defaults to every column the contract records as datetime.
/// Each selected column needs a `datetime_spec` entry; selected columns
/// missing from the table are skipped. With `keep_original` the rendered
/// values go to a `<col>__rendered` column appended at the end.
pub fn render_table(
    table: &Table,
    view: &RenderView,
    columns: Option<&[String]>,
    keep_original: bool,
) -> Result<Table, PipelineError> {
    let span = info_span!("render_table", rows = table.row_count());
    let _enter = span.enter();

    let selected = match columns {
        Some(columns) => columns.to_vec(),
        None => view.datetime_columns(),
    };
    if selected.is_empty() {
        info!("schema has no datetime columns, table left unchanged");
        return Ok(table.clone());
    }

    let entries = selected
        .iter()
        .map(|column| {
            view.datetime_spec
                .get(column)
                .map(|entry| (column, entry))
                .ok_or_else(|| ConfigError::MissingDatetimeSpec(column.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rendered = table.clone();
    for (column, entry) in entries {
        let Some(source) = table.column(column) else {
            debug!(column = %column, "datetime column not in table, skipped");
            continue;
        };
        let values = render_values(column, &source.values, entry)?;
        if keep_original {
            let name = rendered_column_name(column);
            if !rendered.replace_values(&name, values.clone())? {
                rendered.push_column(Column::new(name, values))?;
            }
        } else {
            rendered.replace_values(column, values)?;
        }
        debug!(column = %column, format = %entry.output_format, "rendered datetime column");
    }

    info!(columns = rendered.column_count(), "rendered datetime columns");
    Ok(rendered)
}
