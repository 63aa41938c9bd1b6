//! Schema contract document
//!
//! The contract is the single output of a prepare run. It is assembled once
//! from the inference results and never modified afterwards. Every map is a
//! `BTreeMap`, so identical input, configuration and timestamp produce
//! byte-identical JSON.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::inference::constraints::ConstraintSet;
use crate::inference::datetime::DatetimeSpecEntry;
use crate::inference::target::{TargetSpec, label_domain};
use crate::inference::types::{Bounds, ColumnDescriptor, ColumnType};
use crate::inference::InferenceConfig;

/// Version written into every contract
pub const SCHEMA_VERSION: &str = "2.0.0";

/// Written instead of the source path when redaction is on
pub const REDACTED_SOURCE_PATH: &str = "example_data_path_to_csv_file";

/// Where the data came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    /// Path of the loaded data file
    pub path: String,
    /// Delimiter the loader used
    pub delimiter: char,
    /// Path of the column types document, if one was given
    pub column_types_overrides: Option<String>,
}

/// Generation metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub generated_at_utc: DateTime<Utc>,
    pub effective_parameters: InferenceConfig,
    pub source_csv: String,
    pub source_delimiter: String,
    pub guid_like_columns: Vec<String>,
    pub column_types_overrides: Option<String>,
}

/// The emitted schema contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaContract {
    pub schema_version: String,
    pub dataset: String,
    /// Primary target column, if any
    pub target_col: Option<String>,
    /// Published domain of the primary target; empty when not published
    pub label_domain: Vec<String>,
    pub missing_value_rates: BTreeMap<String, f64>,
    pub public_bounds: BTreeMap<String, Bounds>,
    pub public_categories: BTreeMap<String, Vec<String>>,
    pub column_types: BTreeMap<String, ColumnType>,
    pub datetime_spec: BTreeMap<String, DatetimeSpecEntry>,
    pub target_spec: Option<TargetSpec>,
    pub constraints: ConstraintSet,
    pub provenance: Provenance,
}

impl SchemaContract {
    /// Compose the contract from the inference results
    pub fn assemble(
        dataset: impl Into<String>,
        descriptors: &[ColumnDescriptor],
        target_spec: Option<TargetSpec>,
        constraints: ConstraintSet,
        config: &InferenceConfig,
        source: &SourceInfo,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut missing_value_rates = BTreeMap::new();
        let mut public_bounds = BTreeMap::new();
        let mut public_categories = BTreeMap::new();
        let mut column_types = BTreeMap::new();
        let mut datetime_spec = BTreeMap::new();

        for descriptor in descriptors {
            let name = descriptor.name.clone();
            missing_value_rates.insert(name.clone(), descriptor.missing_rate);
            column_types.insert(name.clone(), descriptor.resolved_type);
            if let Some(bounds) = descriptor.bounds {
                public_bounds.insert(name.clone(), bounds);
            }
            if let Some(domain) = &descriptor.domain {
                public_categories.insert(name.clone(), domain.clone());
            }
            if let Some(entry) = &descriptor.datetime {
                datetime_spec.insert(name, entry.clone());
            }
        }

        let label = label_domain(target_spec.as_ref(), descriptors, config);
        let primary = target_spec
            .as_ref()
            .and_then(|spec| spec.primary_target.clone());
        if let (Some(domain), Some(primary)) = (&label, &primary) {
            public_categories.insert(primary.clone(), domain.clone());
        }
        if config.no_publish_label_domain {
            if let Some(spec) = &target_spec {
                for target in &spec.targets {
                    if public_categories.remove(target).is_some() {
                        debug!(target = %target, "target domain withheld");
                    }
                }
            }
        }

        let source_csv = if config.redact_source_path {
            REDACTED_SOURCE_PATH.to_string()
        } else {
            source.path.clone()
        };

        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            dataset: dataset.into(),
            target_col: primary,
            label_domain: label.unwrap_or_default(),
            missing_value_rates,
            public_bounds,
            public_categories,
            column_types,
            datetime_spec,
            target_spec,
            constraints,
            provenance: Provenance {
                generated_at_utc: generated_at,
                effective_parameters: config.clone(),
                source_csv,
                source_delimiter: source.delimiter.to_string(),
                guid_like_columns: descriptors
                    .iter()
                    .filter(|d| d.resolved_type == ColumnType::Identifier)
                    .map(|d| d.name.clone())
                    .collect(),
                column_types_overrides: source.column_types_overrides.clone(),
            },
        }
    }
}

/// The parts of a contract the render path reads
///
/// Deserializes leniently so contracts from older writers still load.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderView {
    pub datetime_spec: BTreeMap<String, DatetimeSpecEntry>,
    pub column_types: BTreeMap<String, String>,
}

impl RenderView {
    /// Columns to render when none are named explicitly
    ///
    /// Every `datetime_spec` key plus every column typed `datetime`.
    pub fn datetime_columns(&self) -> Vec<String> {
        let mut columns: BTreeSet<String> = self.datetime_spec.keys().cloned().collect();
        columns.extend(
            self.column_types
                .iter()
                .filter(|(_, t)| t.trim().eq_ignore_ascii_case(ColumnType::Datetime.as_str()))
                .map(|(c, _)| c.clone()),
        );
        columns.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::constraints::synthesize;
    use crate::inference::types::Classification;
    use chrono::TimeZone;

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn source() -> SourceInfo {
        SourceInfo {
            path: "data/adult.csv".to_string(),
            delimiter: ',',
            column_types_overrides: None,
        }
    }

    fn descriptor(name: &str, column_type: ColumnType, domain: Option<&[&str]>) -> ColumnDescriptor {
        let mut d = ColumnDescriptor::new(
            name,
            domain
                .unwrap_or(&[])
                .iter()
                .map(|v| Some(v.to_string()))
                .collect(),
            Classification::Categorical,
        );
        d.resolved_type = column_type;
        d.domain = domain.map(|values| values.iter().map(|v| v.to_string()).collect());
        d
    }

    #[test]
    fn test_top_level_field_order() {
        let contract = SchemaContract::assemble(
            "adult",
            &[],
            None,
            ConstraintSet::new(),
            &InferenceConfig::default(),
            &source(),
            timestamp(),
        );
        let json = serde_json::to_string(&contract).unwrap();
        let order = [
            "schema_version",
            "dataset",
            "target_col",
            "label_domain",
            "missing_value_rates",
            "public_bounds",
            "public_categories",
            "column_types",
            "datetime_spec",
            "target_spec",
            "constraints",
            "provenance",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|key| json.find(&format!("\"{}\"", key)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(contract.schema_version, "2.0.0");
        assert_eq!(
            serde_json::to_value(&contract).unwrap()["provenance"]["generated_at_utc"],
            "2024-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_redacted_source_path() {
        let config = InferenceConfig::builder().redact_source_path(true).build();
        let contract = SchemaContract::assemble(
            "adult",
            &[],
            None,
            ConstraintSet::new(),
            &config,
            &source(),
            timestamp(),
        );
        assert_eq!(contract.provenance.source_csv, REDACTED_SOURCE_PATH);
        assert_eq!(contract.provenance.source_delimiter, ",");
    }

    #[test]
    fn test_label_domain_overwrites_public_categories() {
        let descriptors = vec![descriptor("income", ColumnType::Categorical, Some(&["<=50K", ">50K"][..]))];
        let contract = SchemaContract::assemble(
            "adult",
            &descriptors,
            Some(TargetSpec::single("income")),
            ConstraintSet::new(),
            &InferenceConfig::default(),
            &source(),
            timestamp(),
        );
        assert_eq!(contract.target_col.as_deref(), Some("income"));
        assert_eq!(contract.label_domain, vec!["<=50K", ">50K"]);
        assert_eq!(contract.public_categories["income"], contract.label_domain);
    }

    #[test]
    fn test_no_publish_removes_target_domains() {
        let descriptors = vec![
            descriptor("income", ColumnType::Categorical, Some(&["a", "b"][..])),
            descriptor("color", ColumnType::Categorical, Some(&["red"][..])),
        ];
        let config = InferenceConfig::builder().no_publish_label_domain(true).build();
        let contract = SchemaContract::assemble(
            "adult",
            &descriptors,
            Some(TargetSpec::single("income")),
            ConstraintSet::new(),
            &config,
            &source(),
            timestamp(),
        );
        assert!(contract.label_domain.is_empty());
        assert!(!contract.public_categories.contains_key("income"));
        assert!(contract.public_categories.contains_key("color"));
    }

    #[test]
    fn test_guid_like_columns_and_constraints() {
        let descriptors = vec![descriptor("id", ColumnType::Identifier, None)];
        let constraints = synthesize(&descriptors, None);
        let contract = SchemaContract::assemble(
            "d",
            &descriptors,
            None,
            constraints,
            &InferenceConfig::default(),
            &source(),
            timestamp(),
        );
        assert_eq!(contract.provenance.guid_like_columns, vec!["id"]);
        assert_eq!(
            contract.constraints.column_constraints["id"]["semantic_role"],
            "identifier"
        );
        assert!(contract.target_spec.is_none());
    }

    #[test]
    fn test_contract_reads_back() {
        let descriptors = vec![descriptor("income", ColumnType::Categorical, Some(&["a", "b"][..]))];
        let contract = SchemaContract::assemble(
            "adult",
            &descriptors,
            Some(TargetSpec::single("income")),
            ConstraintSet::new(),
            &InferenceConfig::default(),
            &source(),
            timestamp(),
        );
        let json = serde_json::to_string_pretty(&contract).unwrap();
        let parsed: SchemaContract = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, contract);
    }

    #[test]
    fn test_render_view_columns() {
        let view: RenderView = serde_json::from_str(
            r#"{"datetime_spec": {"b": {"output_format": "%Y"}},
                "column_types": {"a": "datetime", "b": "integer", "c": "categorical"}}"#,
        )
        .unwrap();
        assert_eq!(view.datetime_columns(), vec!["a", "b"]);

        let empty: RenderView = serde_json::from_str("{}").unwrap();
        assert!(empty.datetime_columns().is_empty());
    }
}
