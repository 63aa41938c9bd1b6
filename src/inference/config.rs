//! Configuration for schema inference

use serde::{Deserialize, Serialize};

use super::datetime::validate_output_format;
use super::error::ConfigError;
use super::target::TargetSelection;
use super::types::ColumnType;

/// Default cap on exported category domains
pub const DEFAULT_MAX_CATEGORIES: usize = 200;

/// Default fraction of values that must parse for datetime reclassification
pub const DEFAULT_DATETIME_MIN_PARSE_FRAC: f64 = 0.95;

/// Default fraction of values that must look like GUIDs for identifier detection
pub const DEFAULT_GUID_MIN_MATCH_FRAC: f64 = 0.95;

/// How rendered datetimes are formatted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DatetimeOutputFormat {
    /// Keep the format guessed from the source values
    #[default]
    Preserve,
    /// Always use this strftime pattern
    Fixed(String),
}

impl From<String> for DatetimeOutputFormat {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("preserve") {
            DatetimeOutputFormat::Preserve
        } else {
            DatetimeOutputFormat::Fixed(value)
        }
    }
}

impl From<DatetimeOutputFormat> for String {
    fn from(value: DatetimeOutputFormat) -> Self {
        match value {
            DatetimeOutputFormat::Preserve => "preserve".to_string(),
            DatetimeOutputFormat::Fixed(format) => format,
        }
    }
}

/// Configuration for schema inference
///
/// One immutable value is built per run and passed to every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Global padding fraction applied to numeric bounds
    pub pad_frac: Option<f64>,

    /// Padding fraction for integer (and datetime) columns; falls back to `pad_frac`
    pub pad_frac_integer: Option<f64>,

    /// Padding fraction for continuous columns; falls back to `pad_frac`
    pub pad_frac_continuous: Option<f64>,

    /// Enumerate domains of text columns
    pub infer_categories: bool,

    /// Domains with more distinct values than this are not exported
    pub max_categories: usize,

    /// Promote two-valued integer columns to ordinal
    pub infer_binary_domain: bool,

    /// Detect datetime-like text columns and encode them as epoch-ns
    pub infer_datetimes: bool,

    /// Minimum parse success fraction for datetime reclassification (0.0 - 1.0)
    pub datetime_min_parse_frac: f64,

    /// Rendered datetime format, or `preserve` to keep the guessed one
    pub datetime_output_format: DatetimeOutputFormat,

    /// Minimum GUID match fraction for identifier detection (0.0 - 1.0)
    pub guid_min_match_frac: f64,

    /// Write a placeholder instead of the source path in provenance
    pub redact_source_path: bool,

    /// Publish the label domain even when the target is numeric
    pub target_is_classifier: bool,

    /// Never publish target domains (wins over `target_is_classifier`)
    pub no_publish_label_domain: bool,

    /// Target column selection
    #[serde(flatten)]
    pub target: TargetSelection,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            pad_frac: None,
            pad_frac_integer: None,
            pad_frac_continuous: None,
            infer_categories: false,
            max_categories: DEFAULT_MAX_CATEGORIES,
            infer_binary_domain: false,
            infer_datetimes: false,
            datetime_min_parse_frac: DEFAULT_DATETIME_MIN_PARSE_FRAC,
            datetime_output_format: DatetimeOutputFormat::Preserve,
            guid_min_match_frac: DEFAULT_GUID_MIN_MATCH_FRAC,
            redact_source_path: false,
            target_is_classifier: false,
            no_publish_label_domain: false,
            target: TargetSelection::default(),
        }
    }
}

impl InferenceConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> InferenceConfigBuilder {
        InferenceConfigBuilder::default()
    }

    /// Parse a configuration from TOML text using the option names as keys
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::malformed("configuration file", e.to_string()))
    }

    /// Effective padding fraction for a column type
    ///
    /// Per-type override, else the global fraction, else zero. Datetime
    /// columns ride the integer path.
    pub fn effective_pad(&self, column_type: ColumnType) -> f64 {
        let per_type = match column_type {
            ColumnType::Integer | ColumnType::Datetime => self.pad_frac_integer,
            ColumnType::Continuous => self.pad_frac_continuous,
            _ => return 0.0,
        };
        per_type.or(self.pad_frac).unwrap_or(0.0)
    }

    /// The forced rendering format, if any
    pub fn forced_datetime_format(&self) -> Option<&str> {
        match &self.datetime_output_format {
            DatetimeOutputFormat::Preserve => None,
            DatetimeOutputFormat::Fixed(format) => Some(format),
        }
    }

    /// Check every option before inference starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("datetime_min_parse_frac", self.datetime_min_parse_frac),
            ("guid_min_match_frac", self.guid_min_match_frac),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidFraction { name, value });
            }
        }

        for (name, value) in [
            ("pad_frac", self.pad_frac),
            ("pad_frac_integer", self.pad_frac_integer),
            ("pad_frac_continuous", self.pad_frac_continuous),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::InvalidPadding { name, value });
                }
            }
        }

        if let Some(format) = self.forced_datetime_format() {
            validate_output_format(format)?;
        }

        self.target.validate()
    }
}

/// Builder for InferenceConfig
#[derive(Debug, Default)]
pub struct InferenceConfigBuilder {
    config: InferenceConfig,
}

impl InferenceConfigBuilder {
    /// Set the global padding fraction
    pub fn pad_frac(mut self, pad: f64) -> Self {
        self.config.pad_frac = Some(pad);
        self
    }

    /// Set the integer padding fraction
    pub fn pad_frac_integer(mut self, pad: f64) -> Self {
        self.config.pad_frac_integer = Some(pad);
        self
    }

    /// Set the continuous padding fraction
    pub fn pad_frac_continuous(mut self, pad: f64) -> Self {
        self.config.pad_frac_continuous = Some(pad);
        self
    }

    /// Enable or disable category inference
    pub fn infer_categories(mut self, infer: bool) -> Self {
        self.config.infer_categories = infer;
        self
    }

    /// Set the category cap
    pub fn max_categories(mut self, max: usize) -> Self {
        self.config.max_categories = max;
        self
    }

    /// Enable or disable binary-domain promotion
    pub fn infer_binary_domain(mut self, infer: bool) -> Self {
        self.config.infer_binary_domain = infer;
        self
    }

    /// Enable or disable datetime detection
    pub fn infer_datetimes(mut self, infer: bool) -> Self {
        self.config.infer_datetimes = infer;
        self
    }

    /// Set the datetime parse threshold
    pub fn datetime_min_parse_frac(mut self, frac: f64) -> Self {
        self.config.datetime_min_parse_frac = frac.clamp(0.0, 1.0);
        self
    }

    /// Set the datetime output format (`preserve` keeps the guessed one)
    pub fn datetime_output_format(mut self, format: impl Into<String>) -> Self {
        self.config.datetime_output_format = DatetimeOutputFormat::from(format.into());
        self
    }

    /// Set the GUID match threshold
    pub fn guid_min_match_frac(mut self, frac: f64) -> Self {
        self.config.guid_min_match_frac = frac.clamp(0.0, 1.0);
        self
    }

    /// Redact the source path in provenance
    pub fn redact_source_path(mut self, redact: bool) -> Self {
        self.config.redact_source_path = redact;
        self
    }

    /// Publish the label domain for numeric targets too
    pub fn target_is_classifier(mut self, classifier: bool) -> Self {
        self.config.target_is_classifier = classifier;
        self
    }

    /// Suppress label domain publication
    pub fn no_publish_label_domain(mut self, suppress: bool) -> Self {
        self.config.no_publish_label_domain = suppress;
        self
    }

    /// Set the target selection parameters
    pub fn target(mut self, target: TargetSelection) -> Self {
        self.config.target = target;
        self
    }

    /// Build the configuration
    pub fn build(self) -> InferenceConfig {
        self.config
    }
}
