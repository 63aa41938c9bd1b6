//! Column types, classification outcomes and per-column descriptors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::datetime::DatetimeSpecEntry;
use super::error::ConfigError;

/// Semantic type resolved for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Real-valued numbers
    Continuous,
    /// Whole numbers
    Integer,
    /// Unordered labels
    Categorical,
    /// Ordered labels (binary integer columns, booleans)
    Ordinal,
    /// GUID/UUID-like keys; never enumerated
    Identifier,
    /// Date/time values stored as epoch nanoseconds
    Datetime,
}

impl ColumnType {
    /// All variants in declaration order
    pub const ALL: [ColumnType; 6] = [
        ColumnType::Continuous,
        ColumnType::Integer,
        ColumnType::Categorical,
        ColumnType::Ordinal,
        ColumnType::Identifier,
        ColumnType::Datetime,
    ];

    /// Lowercase name used in documents
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Continuous => "continuous",
            ColumnType::Integer => "integer",
            ColumnType::Categorical => "categorical",
            ColumnType::Ordinal => "ordinal",
            ColumnType::Identifier => "identifier",
            ColumnType::Datetime => "datetime",
        }
    }

    /// Whether columns of this type receive numeric bounds
    pub fn takes_bounds(&self) -> bool {
        matches!(
            self,
            ColumnType::Continuous | ColumnType::Integer | ColumnType::Datetime
        )
    }

    /// Whether columns of this type carry an enumerated domain
    pub fn takes_domain(&self) -> bool {
        matches!(self, ColumnType::Categorical | ColumnType::Ordinal)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        ColumnType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| s.to_string())
    }
}

impl ColumnType {
    /// Parse a type string from an override document for `column`
    pub fn parse_for(column: &str, value: &str) -> Result<Self, ConfigError> {
        value
            .parse()
            .map_err(|value| ConfigError::InvalidColumnType {
                column: column.to_string(),
                value,
            })
    }
}

/// Why the classifier fell through to its default arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultReason {
    /// Every cell is null, so there is no numeric or categorical signal
    AllNull,
    /// Category inference is disabled; the column is tagged but not enumerated
    CategoriesDisabled,
}

/// Outcome of classifying one column
///
/// Every column lands in exactly one arm. The `Default` arm is a policy
/// decision, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// The user supplied the type (and maybe the domain)
    Override {
        column_type: ColumnType,
        domain: Option<Vec<String>>,
    },
    /// Enough values matched the GUID pattern
    Identifier,
    /// Every value is a boolean token
    Boolean,
    /// Every value parses as a finite number
    Numeric { integral: bool },
    /// Text values with category inference enabled
    Categorical,
    /// Fallback arm, resolved as categorical
    Default(DefaultReason),
}

impl Classification {
    /// The semantic type this outcome resolves to
    pub fn resolved_type(&self) -> ColumnType {
        match self {
            Classification::Override { column_type, .. } => *column_type,
            Classification::Identifier => ColumnType::Identifier,
            Classification::Boolean => ColumnType::Ordinal,
            Classification::Numeric { integral: true } => ColumnType::Integer,
            Classification::Numeric { integral: false } => ColumnType::Continuous,
            Classification::Categorical | Classification::Default(_) => ColumnType::Categorical,
        }
    }

    /// Whether the column's raw cells are text that a datetime parser may claim
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            Classification::Categorical | Classification::Default(DefaultReason::CategoriesDisabled)
        )
    }
}

/// A single numeric bound
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundValue {
    Integer(i64),
    Float(f64),
}

impl BoundValue {
    /// The bound as a float
    pub fn as_f64(&self) -> f64 {
        match self {
            BoundValue::Integer(v) => *v as f64,
            BoundValue::Float(v) => *v,
        }
    }
}

/// Inclusive `[low, high]` range, serialized as a two-element array
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds(pub BoundValue, pub BoundValue);

impl Bounds {
    /// Integer bounds
    pub fn integer(low: i64, high: i64) -> Self {
        Self(BoundValue::Integer(low), BoundValue::Integer(high))
    }

    /// Float bounds
    pub fn float(low: f64, high: f64) -> Self {
        Self(BoundValue::Float(low), BoundValue::Float(high))
    }

    pub fn low(&self) -> BoundValue {
        self.0
    }

    pub fn high(&self) -> BoundValue {
        self.1
    }

    /// Whether both ends are exact integers
    pub fn is_integral(&self) -> bool {
        matches!(self, Bounds(BoundValue::Integer(_), BoundValue::Integer(_)))
    }
}

/// Everything the engine learns about one column during a run
///
/// Built by the classifier, refined by the datetime and bounds stages, and
/// read-only once constraint synthesis starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,
    /// Raw cells in row order (`None` = null)
    pub raw_values: Vec<Option<String>>,
    /// What the classifier decided, before any post-pass
    pub classification: Classification,
    /// Final semantic type
    pub resolved_type: ColumnType,
    /// Exported domain; `None` means the field is omitted
    pub domain: Option<Vec<String>>,
    /// Exported bounds; `None` means the field is omitted
    pub bounds: Option<Bounds>,
    /// Null cells divided by row count
    pub missing_rate: f64,
    /// Epoch-ns values when the column was datetime-encoded
    pub encoded: Option<Vec<Option<i64>>>,
    /// Datetime metadata when the column was datetime-encoded
    pub datetime: Option<DatetimeSpecEntry>,
}

impl ColumnDescriptor {
    /// Create a descriptor from a classification outcome
    pub fn new(
        name: impl Into<String>,
        raw_values: Vec<Option<String>>,
        classification: Classification,
    ) -> Self {
        let resolved_type = classification.resolved_type();
        let domain = match &classification {
            Classification::Override { domain, .. } => domain.clone(),
            _ => None,
        };
        Self {
            name: name.into(),
            raw_values,
            classification,
            resolved_type,
            domain,
            bounds: None,
            missing_rate: 0.0,
            encoded: None,
            datetime: None,
        }
    }

    /// Non-null raw cells in row order
    pub fn non_null(&self) -> impl Iterator<Item = &str> {
        self.raw_values.iter().filter_map(|v| v.as_deref())
    }

    /// Whether the user fixed this column's type
    pub fn is_overridden(&self) -> bool {
        matches!(self.classification, Classification::Override { .. })
    }

    /// Whether the user supplied this column's domain
    pub fn has_override_domain(&self) -> bool {
        matches!(
            self.classification,
            Classification::Override {
                domain: Some(_),
                ..
            }
        )
    }
}
