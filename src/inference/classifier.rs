//! Column classification
//!
//! Decision order, first applicable wins:
//!
//! 1. explicit user override
//! 2. GUID/UUID identifier
//! 3. boolean tokens (ordinal `0`/`1`)
//! 4. numeric (integer when every value is integral, else continuous)
//! 5. categorical, or the default arm when category inference is off
//!
//! Binary-domain promotion is a separate post-pass that must run after
//! numeric classification and before bounds extraction.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::config::InferenceConfig;
use super::formats::{is_guid, is_integral, match_fraction, parse_bool, parse_integer, parse_number};
use super::types::{Classification, ColumnDescriptor, ColumnType, DefaultReason};
use crate::table::{Column, Table};

/// User-supplied type for one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnOverride {
    pub column_type: ColumnType,
    /// Domain copied verbatim into the contract
    pub domain: Option<Vec<String>>,
}

impl ColumnOverride {
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            column_type,
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: Vec<String>) -> Self {
        self.domain = Some(domain);
        self
    }
}

/// Column overrides keyed by column name
pub type ColumnOverrides = BTreeMap<String, ColumnOverride>;

/// Classify one column
pub fn classify_column(
    column: &Column,
    column_override: Option<&ColumnOverride>,
    config: &InferenceConfig,
) -> Classification {
    if let Some(column_override) = column_override {
        return Classification::Override {
            column_type: column_override.column_type,
            domain: column_override.domain.clone(),
        };
    }

    let values: Vec<&str> = column.non_null().collect();
    if values.is_empty() {
        debug!(column = %column.name, "all-null column, defaulting to categorical");
        return Classification::Default(DefaultReason::AllNull);
    }

    if match_fraction(values.iter().copied(), is_guid) >= config.guid_min_match_frac {
        return Classification::Identifier;
    }

    if values.iter().all(|v| parse_bool(v).is_some()) {
        return Classification::Boolean;
    }

    let numbers: Option<Vec<f64>> = values.iter().map(|v| parse_number(v)).collect();
    if let Some(numbers) = numbers {
        // integral values past i64 are continuous
        let integral = numbers.iter().all(|n| is_integral(*n))
            && values.iter().all(|v| parse_integer(v).is_some());
        return Classification::Numeric { integral };
    }

    if config.infer_categories {
        Classification::Categorical
    } else {
        debug!(column = %column.name, "category inference disabled, domain will not be exported");
        Classification::Default(DefaultReason::CategoriesDisabled)
    }
}

/// Classify every column of a table, in column order
pub fn classify_table(
    table: &Table,
    overrides: &ColumnOverrides,
    config: &InferenceConfig,
) -> Vec<ColumnDescriptor> {
    table
        .columns()
        .iter()
        .map(|column| {
            let classification = classify_column(column, overrides.get(&column.name), config);
            debug!(
                column = %column.name,
                resolved_type = %classification.resolved_type(),
                "classified column"
            );
            ColumnDescriptor::new(column.name.clone(), column.values.clone(), classification)
        })
        .collect()
}

/// Promote a two-valued integer column to ordinal
///
/// Only inferred integer columns are eligible; overridden and datetime
/// columns keep their type. Returns whether the column was promoted.
pub fn promote_binary_domain(descriptor: &mut ColumnDescriptor, config: &InferenceConfig) -> bool {
    if !config.infer_binary_domain
        || descriptor.resolved_type != ColumnType::Integer
        || descriptor.is_overridden()
        || descriptor.encoded.is_some()
    {
        return false;
    }

    let distinct: Option<BTreeSet<i64>> = descriptor.non_null().map(parse_integer).collect();
    match distinct {
        Some(distinct) if distinct.len() == 2 => {
            descriptor.resolved_type = ColumnType::Ordinal;
            descriptor.domain = Some(distinct.iter().map(|v| v.to_string()).collect());
            descriptor.bounds = None;
            debug!(column = %descriptor.name, "promoted binary integer column to ordinal");
            true
        }
        _ => false,
    }
}
