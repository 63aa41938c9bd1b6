//! `prepare`: infer a schema contract from a data file

use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use schema_toolkit::import::load_config_file;
use schema_toolkit::{
    Delimiter, InferenceConfig, PrepareFiles, TargetKind, prepare_schema, write_contract,
    write_csv,
};

use crate::error::CliError;

/// Arguments for the `prepare` command
#[derive(Debug, Args)]
pub struct PrepareArgs {
    /// Input data file (CSV/TSV)
    #[arg(long, value_name = "PATH")]
    pub data: PathBuf,

    /// Where to write the schema contract JSON
    #[arg(long, value_name = "PATH")]
    pub out: PathBuf,

    /// Dataset name recorded in the contract (default: data file stem)
    #[arg(long = "dataset-name")]
    pub dataset_name: Option<String>,

    /// Field delimiter: auto, tab, or a single character
    #[arg(long, default_value = "auto")]
    pub delimiter: Delimiter,

    /// Column type override document (JSON)
    #[arg(long = "column-types", value_name = "PATH")]
    pub column_types: Option<PathBuf>,

    /// Target spec document (JSON)
    #[arg(long = "target-spec-file", value_name = "PATH")]
    pub target_spec_file: Option<PathBuf>,

    /// Constraints overlay document (JSON)
    #[arg(long = "constraints-file", value_name = "PATH")]
    pub constraints_file: Option<PathBuf>,

    /// TOML configuration file; flags given here take precedence
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Also write the data with datetime columns encoded as epoch-ns
    #[arg(long = "encoded-out", value_name = "PATH")]
    pub encoded_out: Option<PathBuf>,

    /// Padding fraction for numeric bounds
    #[arg(long = "pad-frac")]
    pub pad_frac: Option<f64>,

    /// Padding fraction for integer and datetime bounds
    #[arg(long = "pad-frac-integer")]
    pub pad_frac_integer: Option<f64>,

    /// Padding fraction for continuous bounds
    #[arg(long = "pad-frac-continuous")]
    pub pad_frac_continuous: Option<f64>,

    /// Enumerate domains of text columns
    #[arg(long = "infer-categories")]
    pub infer_categories: bool,

    /// Largest domain that is exported
    #[arg(long = "max-categories")]
    pub max_categories: Option<usize>,

    /// Promote two-valued integer columns to ordinal
    #[arg(long = "infer-binary-domain")]
    pub infer_binary_domain: bool,

    /// Detect and encode datetime columns
    #[arg(long = "infer-datetimes")]
    pub infer_datetimes: bool,

    /// Minimum parse fraction for datetime detection (0.0 - 1.0)
    #[arg(long = "datetime-min-parse-frac")]
    pub datetime_min_parse_frac: Option<f64>,

    /// strftime pattern for rendered datetimes, or "preserve"
    #[arg(long = "datetime-output-format")]
    pub datetime_output_format: Option<String>,

    /// Minimum GUID match fraction for identifier detection (0.0 - 1.0)
    #[arg(long = "guid-min-match-frac")]
    pub guid_min_match_frac: Option<f64>,

    /// Replace the source path in provenance with a placeholder
    #[arg(long = "redact-source-path")]
    pub redact_source_path: bool,

    /// Publish the label domain even for numeric targets
    #[arg(long = "target-is-classifier")]
    pub target_is_classifier: bool,

    /// Never publish target domains
    #[arg(long = "no-publish-label-domain")]
    pub no_publish_label_domain: bool,

    /// Primary target column
    #[arg(long = "target-col")]
    pub target_col: Option<String>,

    /// Comma-separated target columns (event first for survival_pair)
    #[arg(long = "target-cols", value_delimiter = ',')]
    pub target_cols: Vec<String>,

    /// single, multi_target or survival_pair
    #[arg(long = "target-kind")]
    pub target_kind: Option<TargetKind>,

    /// Survival event column (requires --survival-time-col)
    #[arg(long = "survival-event-col")]
    pub survival_event_col: Option<String>,

    /// Survival time column (requires --survival-event-col)
    #[arg(long = "survival-time-col")]
    pub survival_time_col: Option<String>,
}

impl PrepareArgs {
    /// Layer the flags over a base configuration
    fn apply_to(&self, mut config: InferenceConfig) -> InferenceConfig {
        config.pad_frac = self.pad_frac.or(config.pad_frac);
        config.pad_frac_integer = self.pad_frac_integer.or(config.pad_frac_integer);
        config.pad_frac_continuous = self.pad_frac_continuous.or(config.pad_frac_continuous);
        config.infer_categories |= self.infer_categories;
        config.infer_binary_domain |= self.infer_binary_domain;
        config.infer_datetimes |= self.infer_datetimes;
        config.redact_source_path |= self.redact_source_path;
        config.target_is_classifier |= self.target_is_classifier;
        config.no_publish_label_domain |= self.no_publish_label_domain;

        if let Some(max) = self.max_categories {
            config.max_categories = max;
        }
        if let Some(frac) = self.datetime_min_parse_frac {
            config.datetime_min_parse_frac = frac;
        }
        if let Some(frac) = self.guid_min_match_frac {
            config.guid_min_match_frac = frac;
        }
        if let Some(format) = &self.datetime_output_format {
            config.datetime_output_format = format.clone().into();
        }

        let target = &mut config.target;
        if self.target_col.is_some() {
            target.target_col = self.target_col.clone();
        }
        if !self.target_cols.is_empty() {
            target.target_cols = self.target_cols.clone();
        }
        if self.target_kind.is_some() {
            target.target_kind = self.target_kind;
        }
        if self.survival_event_col.is_some() {
            target.survival_event_col = self.survival_event_col.clone();
        }
        if self.survival_time_col.is_some() {
            target.survival_time_col = self.survival_time_col.clone();
        }
        config
    }

    fn files(&self) -> PrepareFiles {
        PrepareFiles {
            data: self.data.clone(),
            delimiter: self.delimiter,
            dataset_name: self.dataset_name.clone(),
            column_types: self.column_types.clone(),
            target_spec: self.target_spec_file.clone(),
            constraints: self.constraints_file.clone(),
        }
    }
}

/// Handle the `prepare` command
pub fn handle_prepare(args: &PrepareArgs) -> Result<(), CliError> {
    let base = match &args.config {
        Some(path) => load_config_file(path)?,
        None => InferenceConfig::default(),
    };
    let config = args.apply_to(base);
    config.validate().map_err(|e| CliError::Pipeline(e.into()))?;

    let inputs = args.files().load()?;
    let delimiter = inputs.source.delimiter as u8;
    let output = prepare_schema(inputs, &config, Utc::now())?;

    write_contract(&output.contract, &args.out)?;
    eprintln!("Schema contract written to: {}", args.out.display());
    eprintln!("  Columns: {}", output.contract.column_types.len());
    eprintln!("  Bounded: {}", output.contract.public_bounds.len());
    eprintln!("  Categorical: {}", output.contract.public_categories.len());
    eprintln!("  Datetime: {}", output.contract.datetime_spec.len());
    if let Some(target) = &output.contract.target_spec {
        eprintln!("  Targets: {} ({})", target.targets.join(", "), target.kind);
    }

    if let Some(path) = &args.encoded_out {
        write_csv(&output.encoded, path, delimiter)?;
        eprintln!("Encoded data written to: {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: PrepareArgs,
    }

    fn parse(extra: &[&str]) -> PrepareArgs {
        let mut argv = vec!["prepare", "--data", "in.csv", "--out", "schema.json"];
        argv.extend_from_slice(extra);
        Harness::parse_from(argv).args
    }

    #[test]
    fn test_flags_override_config_file() {
        let base = InferenceConfig::builder()
            .pad_frac(0.1)
            .max_categories(10)
            .infer_categories(true)
            .build();
        let config = parse(&["--pad-frac", "0.2", "--infer-datetimes"]).apply_to(base);

        assert_eq!(config.pad_frac, Some(0.2));
        assert_eq!(config.max_categories, 10);
        assert!(config.infer_categories);
        assert!(config.infer_datetimes);
    }

    #[test]
    fn test_target_flags() {
        let config = parse(&["--target-cols", "event,time", "--target-kind", "survival-pair"])
            .apply_to(InferenceConfig::default());
        assert_eq!(config.target.target_cols, vec!["event", "time"]);
        assert_eq!(config.target.target_kind, Some(TargetKind::SurvivalPair));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unpaired_survival_flag_fails_validation() {
        let config = parse(&["--survival-time-col", "time"]).apply_to(InferenceConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_delimiter_flag() {
        assert_eq!(parse(&[]).delimiter, Delimiter::Auto);
        assert_eq!(parse(&["--delimiter", "tab"]).delimiter, Delimiter::Byte(b'\t'));
    }
}
