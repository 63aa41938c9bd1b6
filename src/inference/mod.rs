//! Type and constraint inference engine
//!
//! Turns a materialized [`Table`](crate::table::Table) into per-column
//! descriptors, a target spec and a constraint set.
//!
//! ## Stages
//!
//! - **Classification** - one semantic type per column, overrides first
//! - **Datetime codec** - detect datetime-like text and encode it as epoch-ns
//! - **Bounds/domains** - padded numeric ranges, capped category domains
//! - **Targets** - single, multi-target and survival targets plus label exposure
//! - **Constraints** - generated structural constraints merged with an overlay
//!
//! Stages run once, in that order, each taking the same immutable
//! [`InferenceConfig`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use schema_toolkit::inference::{InferenceConfig, infer_columns};
//!
//! let config = InferenceConfig::builder().infer_categories(true).build();
//! let descriptors = infer_columns(&table, &Default::default(), &config);
//! ```

pub mod bounds;
pub mod classifier;
pub mod config;
pub mod constraints;
pub mod datetime;
pub mod error;
pub mod formats;
pub mod target;
pub mod types;

pub use classifier::{ColumnOverride, ColumnOverrides, classify_column, promote_binary_domain};
pub use config::{DatetimeOutputFormat, InferenceConfig, InferenceConfigBuilder};
pub use constraints::{ConstraintObject, ConstraintSet};
pub use datetime::{DatetimeSpecEntry, FormatSource};
pub use error::ConfigError;
pub use target::{
    SurvivalPair, TargetDtype, TargetKind, TargetSelection, TargetSpec, label_domain,
    resolve_target,
};
pub use types::{Bounds, BoundValue, Classification, ColumnDescriptor, ColumnType, DefaultReason};

use tracing::info;

use crate::table::Table;

/// Classify, datetime-encode, promote and bound every column
///
/// Returns the descriptors in table order, frozen for constraint synthesis.
pub fn infer_columns(
    table: &Table,
    overrides: &ColumnOverrides,
    config: &InferenceConfig,
) -> Vec<ColumnDescriptor> {
    let mut descriptors = classifier::classify_table(table, overrides, config);

    let mut encoded = 0usize;
    let mut promoted = 0usize;
    for descriptor in &mut descriptors {
        if datetime::infer_datetime(descriptor, config) {
            encoded += 1;
        }
        if promote_binary_domain(descriptor, config) {
            promoted += 1;
        }
        bounds::extract(descriptor, config);
    }

    info!(
        columns = descriptors.len(),
        datetime_columns = encoded,
        promoted_binary = promoted,
        "inferred column types"
    );
    descriptors
}
