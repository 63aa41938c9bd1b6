//! Target and survival resolution
//!
//! Exactly one [`TargetSpec`] (or none) is produced per run. Precedence is
//! an explicit target-spec document, then the target selection parameters,
//! then a name heuristic over the table's columns.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::bounds::distinct_sorted;
use super::config::InferenceConfig;
use super::error::ConfigError;
use super::types::{ColumnDescriptor, ColumnType};

/// Column names recognized as targets when nothing else is configured, in
/// priority order
pub const TARGET_NAME_KEYWORDS: &[&str] = &["target", "income", "label", "class", "outcome"];

/// How the target columns relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Single,
    MultiTarget,
    SurvivalPair,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Single => "single",
            TargetKind::MultiTarget => "multi_target",
            TargetKind::SurvivalPair => "survival_pair",
        }
    }

    /// Kind implied by a plain list of targets
    fn for_count(count: usize) -> Self {
        if count > 1 {
            TargetKind::MultiTarget
        } else {
            TargetKind::Single
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "single" => Ok(TargetKind::Single),
            "multi_target" => Ok(TargetKind::MultiTarget),
            "survival_pair" => Ok(TargetKind::SurvivalPair),
            _ => Err(ConfigError::UnknownTargetKind(s.to_string())),
        }
    }
}

/// Normalized type of a target column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetDtype {
    Integer,
    Continuous,
    Categorical,
    Ordinal,
    Unknown,
}

impl From<ColumnType> for TargetDtype {
    fn from(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Integer | ColumnType::Datetime => TargetDtype::Integer,
            ColumnType::Continuous => TargetDtype::Continuous,
            ColumnType::Categorical | ColumnType::Identifier => TargetDtype::Categorical,
            ColumnType::Ordinal => TargetDtype::Ordinal,
        }
    }
}

/// Event indicator and time-to-event columns of a survival target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurvivalPair {
    pub event_column: String,
    pub time_column: String,
}

impl SurvivalPair {
    pub fn new(event_column: impl Into<String>, time_column: impl Into<String>) -> Self {
        Self {
            event_column: event_column.into(),
            time_column: time_column.into(),
        }
    }

    /// Positional form, event first
    pub fn targets(&self) -> Vec<String> {
        vec![self.event_column.clone(), self.time_column.clone()]
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.event_column.is_empty() || self.time_column.is_empty() {
            return Err(ConfigError::InvalidSurvivalTarget(
                "event and time columns must be non-empty".to_string(),
            ));
        }
        if self.event_column == self.time_column {
            return Err(ConfigError::InvalidSurvivalTarget(format!(
                "event and time column are both '{}'",
                self.event_column
            )));
        }
        Ok(())
    }
}

/// Target selection parameters, as given on the command line or in a
/// configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSelection {
    /// Primary target column
    pub target_col: Option<String>,
    /// Target columns; for `survival_pair` the event column comes first
    pub target_cols: Vec<String>,
    pub target_kind: Option<TargetKind>,
    pub survival_event_col: Option<String>,
    pub survival_time_col: Option<String>,
}

impl TargetSelection {
    /// Check the parameters are consistent
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (&self.survival_event_col, &self.survival_time_col) {
            (Some(_), None) => {
                return Err(ConfigError::UnpairedSurvivalColumn {
                    given: "event",
                    missing: "time",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::UnpairedSurvivalColumn {
                    given: "time",
                    missing: "event",
                });
            }
            (Some(event), Some(time)) => {
                SurvivalPair::new(event.as_str(), time.as_str()).validate()?;
                if let Some(kind) = self.target_kind.filter(|k| *k != TargetKind::SurvivalPair) {
                    return Err(ConfigError::InvalidSurvivalTarget(format!(
                        "survival columns given with target kind '{}'",
                        kind
                    )));
                }
                return Ok(());
            }
            (None, None) => {}
        }

        if self.target_kind == Some(TargetKind::SurvivalPair) && self.target_cols.len() != 2 {
            return Err(ConfigError::InvalidSurvivalTarget(format!(
                "survival_pair needs exactly two target columns (event, time), got {}",
                self.target_cols.len()
            )));
        }
        Ok(())
    }

    /// Build a target spec from the parameters alone
    ///
    /// Returns `None` when no target column was named.
    pub fn to_target_spec(&self) -> Result<Option<TargetSpec>, ConfigError> {
        self.validate()?;

        if let (Some(event), Some(time)) = (&self.survival_event_col, &self.survival_time_col) {
            let survival = SurvivalPair::new(event.as_str(), time.as_str());
            return Ok(Some(TargetSpec {
                targets: survival.targets(),
                kind: TargetKind::SurvivalPair,
                primary_target: self.target_col.clone(),
                dtypes: BTreeMap::new(),
                survival: Some(survival),
            }));
        }

        let targets = if !self.target_cols.is_empty() {
            self.target_cols.clone()
        } else if let Some(target) = &self.target_col {
            vec![target.clone()]
        } else {
            return Ok(None);
        };

        let document = TargetSpecDocument {
            kind: Some(
                self.target_kind
                    .unwrap_or_else(|| TargetKind::for_count(targets.len())),
            ),
            targets: Some(targets),
            primary_target: self.target_col.clone(),
            dtypes: BTreeMap::new(),
            survival: None,
        };
        TargetSpec::try_from(document).map(Some)
    }
}

/// Target columns and their semantics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TargetSpecDocument")]
pub struct TargetSpec {
    /// Target columns; for survival targets `[event, time]`
    pub targets: Vec<String>,
    pub kind: TargetKind,
    pub primary_target: Option<String>,
    pub dtypes: BTreeMap<String, TargetDtype>,
    /// Present iff `kind` is `survival_pair`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survival: Option<SurvivalPair>,
}

/// Target spec as written in a document
///
/// Accepts the tagged `survival` object as well as the older positional
/// `targets: [event, time]` form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TargetSpecDocument {
    pub targets: Option<Vec<String>>,
    pub kind: Option<TargetKind>,
    pub primary_target: Option<String>,
    pub dtypes: BTreeMap<String, TargetDtype>,
    pub survival: Option<SurvivalPair>,
}

impl TryFrom<TargetSpecDocument> for TargetSpec {
    type Error = ConfigError;

    fn try_from(document: TargetSpecDocument) -> Result<Self, Self::Error> {
        let TargetSpecDocument {
            targets,
            kind,
            primary_target,
            dtypes,
            survival,
        } = document;

        let survival = match (survival, kind) {
            (Some(_), Some(kind)) if kind != TargetKind::SurvivalPair => {
                return Err(ConfigError::InvalidSurvivalTarget(format!(
                    "survival columns given with kind '{}'",
                    kind
                )));
            }
            (Some(pair), _) => {
                pair.validate()?;
                if let Some(targets) = &targets {
                    if *targets != pair.targets() {
                        return Err(ConfigError::InvalidSurvivalTarget(format!(
                            "targets {:?} disagree with survival event '{}' and time '{}'",
                            targets, pair.event_column, pair.time_column
                        )));
                    }
                }
                Some(pair)
            }
            (None, Some(TargetKind::SurvivalPair)) => match targets.as_deref() {
                Some([event, time]) => {
                    let pair = SurvivalPair::new(event.as_str(), time.as_str());
                    pair.validate()?;
                    Some(pair)
                }
                _ => {
                    return Err(ConfigError::InvalidSurvivalTarget(
                        "survival_pair needs a survival object or exactly two targets (event, time)"
                            .to_string(),
                    ));
                }
            },
            (None, _) => None,
        };

        if let Some(survival) = survival {
            return Ok(TargetSpec {
                targets: survival.targets(),
                kind: TargetKind::SurvivalPair,
                primary_target,
                dtypes,
                survival: Some(survival),
            });
        }

        let targets = targets.unwrap_or_default();
        if targets.is_empty() {
            return Err(ConfigError::malformed(
                "target spec",
                "targets must name at least one column",
            ));
        }
        let kind = kind.unwrap_or_else(|| TargetKind::for_count(targets.len()));
        if kind == TargetKind::Single && targets.len() != 1 {
            return Err(ConfigError::malformed(
                "target spec",
                format!("kind 'single' needs exactly one target, got {}", targets.len()),
            ));
        }
        let primary_target = match (primary_target, kind) {
            (Some(primary), _) => Some(primary),
            (None, TargetKind::Single) => targets.first().cloned(),
            (None, _) => None,
        };

        Ok(TargetSpec {
            targets,
            kind,
            primary_target,
            dtypes,
            survival: None,
        })
    }
}

impl TargetSpec {
    /// A single-column target
    pub fn single(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            targets: vec![column.clone()],
            kind: TargetKind::Single,
            primary_target: Some(column),
            dtypes: BTreeMap::new(),
            survival: None,
        }
    }

    /// The survival pair, if this is a survival target
    pub fn survival_pair(&self) -> Option<&SurvivalPair> {
        self.survival.as_ref()
    }

    /// Whether `column` is one of the targets
    pub fn is_target(&self, column: &str) -> bool {
        self.targets.iter().any(|t| t == column)
    }

    /// Fill `dtypes` from the resolved column types
    ///
    /// Targets missing from the table keep a document-supplied dtype or fall
    /// back to `unknown`.
    fn with_normalized_dtypes(mut self, descriptors: &[ColumnDescriptor]) -> Self {
        let mut dtypes = BTreeMap::new();
        for target in &self.targets {
            let dtype = match descriptors.iter().find(|d| &d.name == target) {
                Some(descriptor) => TargetDtype::from(descriptor.resolved_type),
                None => {
                    warn!(target = %target, "target column not found in table");
                    self.dtypes
                        .get(target)
                        .copied()
                        .unwrap_or(TargetDtype::Unknown)
                }
            };
            dtypes.insert(target.clone(), dtype);
        }
        self.dtypes = dtypes;
        self
    }
}

/// First column whose name is a target keyword, by keyword priority
///
/// Columns are scanned in table order for each keyword in turn.
pub fn heuristic_target<'a>(columns: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let columns: Vec<&str> = columns.into_iter().collect();
    TARGET_NAME_KEYWORDS
        .iter()
        .find_map(|keyword| columns.iter().find(|c| *c == keyword).copied())
}

/// Resolve the run's target spec
///
/// A document wins over the selection parameters, which win over the name
/// heuristic. No match is not an error.
pub fn resolve_target(
    document: Option<TargetSpec>,
    selection: &TargetSelection,
    descriptors: &[ColumnDescriptor],
) -> Result<Option<TargetSpec>, ConfigError> {
    let spec = match document {
        Some(spec) => {
            debug!(targets = ?spec.targets, "target spec taken from document");
            Some(spec)
        }
        None => match selection.to_target_spec()? {
            Some(spec) => Some(spec),
            None => {
                let found = heuristic_target(descriptors.iter().map(|d| d.name.as_str()));
                if let Some(column) = found {
                    debug!(target = %column, "target column picked by name");
                }
                found.map(TargetSpec::single)
            }
        },
    };
    Ok(spec.map(|spec| spec.with_normalized_dtypes(descriptors)))
}

/// Label domain of the primary target, or `None` when it is not published
///
/// Categorical and ordinal targets publish by default; `target_is_classifier`
/// publishes numeric targets too; `no_publish_label_domain` always wins.
pub fn label_domain(
    spec: Option<&TargetSpec>,
    descriptors: &[ColumnDescriptor],
    config: &InferenceConfig,
) -> Option<Vec<String>> {
    if config.no_publish_label_domain {
        return None;
    }
    let primary = spec?.primary_target.as_deref()?;
    let descriptor = descriptors.iter().find(|d| d.name == primary)?;

    let by_type = descriptor.resolved_type.takes_domain();
    if !by_type && !config.target_is_classifier {
        return None;
    }

    let domain = distinct_sorted(descriptor.non_null());
    if domain.is_empty() || domain.len() > config.max_categories {
        debug!(
            target = %primary,
            distinct = domain.len(),
            "label domain not published"
        );
        return None;
    }
    Some(domain)
}
