//! Constraint synthesis and overlay merging
//!
//! Constraints are metadata for downstream consumers; nothing here enforces
//! them. Every structure is an owned value, so a merged set never shares
//! nested data with the set it was built from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::target::TargetSpec;
use super::types::{ColumnDescriptor, ColumnType};

/// One constraint object; keys serialize in sorted order
pub type ConstraintObject = Map<String, Value>;

/// Column-level, cross-column and row-group constraints
///
/// The same shape is used for user overlays, where every section is
/// optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintSet {
    pub column_constraints: BTreeMap<String, ConstraintObject>,
    pub cross_column_constraints: Vec<ConstraintObject>,
    pub row_group_constraints: Vec<ConstraintObject>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.column_constraints.is_empty()
            && self.cross_column_constraints.is_empty()
            && self.row_group_constraints.is_empty()
    }

    /// Merge an overlay on top of this set, returning a new set
    ///
    /// Column entries are updated field by field (overlay wins); list
    /// entries are appended after the existing ones in overlay order.
    pub fn merged_with(&self, overlay: &ConstraintSet) -> ConstraintSet {
        let mut merged = self.clone();
        for (column, fields) in &overlay.column_constraints {
            let entry = merged.column_constraints.entry(column.clone()).or_default();
            for (key, value) in fields {
                entry.insert(key.clone(), value.clone());
            }
        }
        merged
            .cross_column_constraints
            .extend(overlay.cross_column_constraints.iter().cloned());
        merged
            .row_group_constraints
            .extend(overlay.row_group_constraints.iter().cloned());
        merged
    }
}

/// Cross-column constraint describing a survival target
pub fn survival_constraint(event_col: &str, time_col: &str) -> ConstraintObject {
    let mut constraint = Map::new();
    constraint.insert("name".into(), json!("survival_pair_definition"));
    constraint.insert("type".into(), json!("survival_pair"));
    constraint.insert("event_col".into(), json!(event_col));
    constraint.insert("time_col".into(), json!(time_col));
    constraint.insert("event_allowed_values".into(), json!([0, 1]));
    constraint.insert("time_min_exclusive".into(), json!(0));
    constraint
}

/// Generate structural constraints from resolved types and the target
pub fn synthesize(descriptors: &[ColumnDescriptor], target: Option<&TargetSpec>) -> ConstraintSet {
    let mut set = ConstraintSet::new();

    for descriptor in descriptors {
        if descriptor.resolved_type == ColumnType::Identifier {
            let mut constraint = Map::new();
            constraint.insert("semantic_role".into(), json!("identifier"));
            set.column_constraints
                .insert(descriptor.name.clone(), constraint);
        }
    }

    if let Some(pair) = target.and_then(TargetSpec::survival_pair) {
        set.cross_column_constraints
            .push(survival_constraint(&pair.event_column, &pair.time_column));
    }

    debug!(
        column_constraints = set.column_constraints.len(),
        cross_column_constraints = set.cross_column_constraints.len(),
        "synthesized constraints"
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::target::{SurvivalPair, TargetKind};
    use crate::inference::types::Classification;

    fn survival_spec() -> TargetSpec {
        TargetSpec {
            targets: vec!["event".to_string(), "time_to_event".to_string()],
            kind: TargetKind::SurvivalPair,
            primary_target: None,
            dtypes: BTreeMap::new(),
            survival: Some(SurvivalPair::new("event", "time_to_event")),
        }
    }

    #[test]
    fn test_survival_constraint_generated() {
        let set = synthesize(&[], Some(&survival_spec()));
        assert_eq!(set.cross_column_constraints.len(), 1);
        let constraint = &set.cross_column_constraints[0];
        assert_eq!(constraint["event_col"], "event");
        assert_eq!(constraint["time_col"], "time_to_event");
        assert_eq!(constraint["event_allowed_values"], json!([0, 1]));
        assert_eq!(constraint["time_min_exclusive"], json!(0));
        assert!(set.column_constraints.is_empty());
    }

    #[test]
    fn test_identifier_role() {
        let descriptor = ColumnDescriptor::new("id", vec![], Classification::Identifier);
        let set = synthesize(&[descriptor], None);
        assert_eq!(set.column_constraints["id"]["semantic_role"], "identifier");
        assert!(set.cross_column_constraints.is_empty());
    }

    #[test]
    fn test_no_other_constraints_invented() {
        let descriptor = ColumnDescriptor::new(
            "age",
            vec![Some("1".to_string())],
            Classification::Numeric { integral: true },
        );
        assert!(synthesize(&[descriptor], None).is_empty());
    }

    #[test]
    fn test_overlay_on_missing_column() {
        let overlay: ConstraintSet =
            serde_json::from_value(json!({"column_constraints": {"age": {"min_exclusive": 0}}}))
                .unwrap();
        let generated = synthesize(
            &[ColumnDescriptor::new("id", vec![], Classification::Identifier)],
            None,
        );

        let mut merged = generated.merged_with(&overlay);
        assert_eq!(
            Value::Object(merged.column_constraints["age"].clone()),
            json!({"min_exclusive": 0})
        );

        merged
            .column_constraints
            .get_mut("age")
            .unwrap()
            .insert("max".into(), json!(120));
        assert_eq!(
            Value::Object(merged.column_constraints["id"].clone()),
            json!({"semantic_role": "identifier"})
        );
        assert_eq!(overlay.column_constraints["age"].len(), 1);
        assert!(!generated.column_constraints.contains_key("age"));
    }

    #[test]
    fn test_overlay_fields_win() {
        let generated = synthesize(
            &[ColumnDescriptor::new("id", vec![], Classification::Identifier)],
            None,
        );
        let overlay: ConstraintSet = serde_json::from_value(json!({
            "column_constraints": {"id": {"semantic_role": "key", "unique": true}}
        }))
        .unwrap();
        let merged = generated.merged_with(&overlay);
        assert_eq!(
            Value::Object(merged.column_constraints["id"].clone()),
            json!({"semantic_role": "key", "unique": true})
        );
        assert_eq!(generated.column_constraints["id"]["semantic_role"], "identifier");
    }

    #[test]
    fn test_lists_append_in_order() {
        let generated = synthesize(&[], Some(&survival_spec()));
        let overlay: ConstraintSet = serde_json::from_value(json!({
            "cross_column_constraints": [{"name": "a"}, {"name": "b"}],
            "row_group_constraints": [{"name": "g"}]
        }))
        .unwrap();
        let merged = generated.merged_with(&overlay);
        let names: Vec<_> = merged
            .cross_column_constraints
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["survival_pair_definition", "a", "b"]);
        assert_eq!(merged.row_group_constraints.len(), 1);
    }

    #[test]
    fn test_merge_is_repeatable() {
        let generated = synthesize(&[], Some(&survival_spec()));
        let overlay: ConstraintSet = serde_json::from_value(json!({
            "column_constraints": {"time_to_event": {"min_exclusive": 0}},
            "cross_column_constraints": [{"name": "extra"}]
        }))
        .unwrap();
        assert_eq!(generated.merged_with(&overlay), generated.merged_with(&overlay));
    }
}
