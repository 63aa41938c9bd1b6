//! Datetime detection and the epoch-ns codec
//!
//! Text columns are probed under five parse strategies. When the best one
//! parses enough values the column is rewritten as UTC nanoseconds since the
//! Unix epoch and a rendering format is recorded so the values can be turned
//! back into strings later.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::InferenceConfig;
use super::error::ConfigError;
use super::formats::{is_datetime_null, parse_integer};
use super::types::{Classification, ColumnDescriptor, ColumnType};

/// Format used when nothing better is known
pub const DEFAULT_OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Storage tag written into every datetime spec entry
pub const EPOCH_NS_STORAGE: &str = "epoch_ns";

/// Minimum strict-match fraction for an output format candidate
const OUTPUT_FORMAT_MIN_FRAC: f64 = 0.8;

/// Output format candidates, in preference order
const OUTPUT_FORMAT_CANDIDATES: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y",
    "%m-%d-%Y %H:%M",
    "%m-%d-%Y",
    "%Y/%m/%dT%H:%M:%SZ",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d",
];

/// Where a recorded output format came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatSource {
    /// Guessed from the source values
    #[default]
    Inferred,
    /// Taken from `datetime_output_format`
    Forced,
}

fn default_storage() -> String {
    EPOCH_NS_STORAGE.to_string()
}

fn default_output_format() -> String {
    DEFAULT_OUTPUT_FORMAT.to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Per-column datetime metadata recorded in the contract
///
/// Every field has a default so contracts written by older tools, which
/// only carried `storage`, `output_format` and `timezone`, still render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatetimeSpecEntry {
    #[serde(default = "default_storage")]
    pub storage: String,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// At least one source value carried an explicit UTC offset
    #[serde(default)]
    pub timezone_normalized: bool,
    #[serde(default)]
    pub format_source: FormatSource,
}

impl DatetimeSpecEntry {
    pub fn new(output_format: impl Into<String>, format_source: FormatSource) -> Self {
        Self {
            storage: default_storage(),
            output_format: output_format.into(),
            timezone: default_timezone(),
            timezone_normalized: false,
            format_source,
        }
    }
}

/// Check that a strftime pattern can be rendered
pub fn validate_output_format(format: &str) -> Result<(), ConfigError> {
    if format.trim().is_empty() || StrftimeItems::new(format).any(|item| item == Item::Error) {
        return Err(ConfigError::InvalidDatetimeFormat(format.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// Carries an offset (`%z`); converted to UTC
    Zoned(&'static str),
    /// Date and time, read as UTC
    Naive(&'static str),
    /// Date only, midnight UTC
    Date(&'static str),
}

const ISO: &[Pattern] = &[
    Pattern::Zoned("%Y-%m-%dT%H:%M:%S%.f%z"),
    Pattern::Zoned("%Y-%m-%d %H:%M:%S%.f%z"),
    Pattern::Naive("%Y-%m-%dT%H:%M:%S%.f"),
    Pattern::Naive("%Y-%m-%d %H:%M:%S%.f"),
    Pattern::Naive("%Y-%m-%dT%H:%M"),
    Pattern::Naive("%Y-%m-%d %H:%M"),
    Pattern::Date("%Y-%m-%d"),
];

const DAY_FIRST: &[Pattern] = &[
    Pattern::Naive("%d/%m/%Y %H:%M:%S"),
    Pattern::Naive("%d/%m/%Y %H:%M"),
    Pattern::Date("%d/%m/%Y"),
    Pattern::Naive("%d-%m-%Y %H:%M:%S"),
    Pattern::Naive("%d-%m-%Y %H:%M"),
    Pattern::Date("%d-%m-%Y"),
    Pattern::Naive("%d.%m.%Y %H:%M:%S"),
    Pattern::Date("%d.%m.%Y"),
];

const YEAR_FIRST: &[Pattern] = &[
    Pattern::Zoned("%Y/%m/%dT%H:%M:%S%.f%z"),
    Pattern::Naive("%Y/%m/%dT%H:%M:%S%.f"),
    Pattern::Naive("%Y/%m/%d %H:%M:%S%.f"),
    Pattern::Naive("%Y/%m/%d %H:%M"),
    Pattern::Date("%Y/%m/%d"),
    Pattern::Naive("%Y.%m.%d %H:%M:%S"),
    Pattern::Date("%Y.%m.%d"),
];

const MONTH_FIRST: &[Pattern] = &[
    Pattern::Naive("%m/%d/%Y %H:%M:%S"),
    Pattern::Naive("%m/%d/%Y %H:%M"),
    Pattern::Date("%m/%d/%Y"),
    Pattern::Naive("%m-%d-%Y %H:%M:%S"),
    Pattern::Naive("%m-%d-%Y %H:%M"),
    Pattern::Date("%m-%d-%Y"),
];

const TEXTUAL: &[Pattern] = &[
    Pattern::Zoned("%a, %d %b %Y %H:%M:%S %z"),
    Pattern::Naive("%d %b %Y %H:%M:%S"),
    Pattern::Date("%d %b %Y"),
    Pattern::Date("%d %B %Y"),
    Pattern::Date("%b %d %Y"),
    Pattern::Date("%B %d %Y"),
    Pattern::Date("%b %d, %Y"),
    Pattern::Date("%B %d, %Y"),
    Pattern::Date("%d-%b-%Y"),
];

/// A named, ordered list of pattern groups
#[derive(Debug)]
struct Strategy {
    name: &'static str,
    groups: &'static [&'static [Pattern]],
}

/// Probe order; ties go to the earlier strategy
const STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "iso",
        groups: &[ISO],
    },
    Strategy {
        name: "day_first",
        groups: &[ISO, DAY_FIRST],
    },
    Strategy {
        name: "year_first",
        groups: &[ISO, YEAR_FIRST],
    },
    Strategy {
        name: "mixed",
        groups: &[ISO, MONTH_FIRST, TEXTUAL],
    },
    Strategy {
        name: "lenient",
        groups: &[ISO, YEAR_FIRST, DAY_FIRST, MONTH_FIRST, TEXTUAL],
    },
];

/// One successfully parsed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Instant {
    nanos: i64,
    zoned: bool,
}

impl Pattern {
    fn parse(&self, value: &str) -> Option<Instant> {
        match self {
            Pattern::Zoned(format) => {
                let normalized = match value.strip_suffix(['Z', 'z']) {
                    Some(stem) => format!("{stem}+00:00"),
                    None => value.to_string(),
                };
                let parsed = DateTime::parse_from_str(&normalized, format).ok()?;
                Some(Instant {
                    nanos: parsed.with_timezone(&Utc).timestamp_nanos_opt()?,
                    zoned: true,
                })
            }
            Pattern::Naive(format) => {
                let parsed = NaiveDateTime::parse_from_str(value, format).ok()?;
                Some(Instant {
                    nanos: parsed.and_utc().timestamp_nanos_opt()?,
                    zoned: false,
                })
            }
            Pattern::Date(format) => {
                let parsed = NaiveDate::parse_from_str(value, format).ok()?;
                Some(Instant {
                    nanos: parsed.and_hms_opt(0, 0, 0)?.and_utc().timestamp_nanos_opt()?,
                    zoned: false,
                })
            }
        }
    }
}

impl Strategy {
    fn parse(&self, value: &str) -> Option<Instant> {
        self.groups
            .iter()
            .flat_map(|group| group.iter())
            .find_map(|pattern| pattern.parse(value))
    }
}

/// Result of probing a column for datetimes
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Name of the winning strategy
    pub strategy: &'static str,
    /// Parsed values divided by candidate (non-null) values
    pub parse_fraction: f64,
    /// Number of candidate values that parsed
    pub parsed: usize,
    /// Number of candidate values
    pub candidates: usize,
    /// Epoch-ns per row; `None` for nulls and parse failures
    pub values: Vec<Option<i64>>,
    /// At least one parsed value carried an offset
    pub timezone_normalized: bool,
}

/// Probe raw cells under every strategy and keep the best
///
/// Returns `None` when the column has no candidate values.
pub fn detect(raw_values: &[Option<String>]) -> Option<Detection> {
    let candidates: Vec<Option<&str>> = raw_values
        .iter()
        .map(|cell| {
            cell.as_deref()
                .map(str::trim)
                .filter(|value| !is_datetime_null(value))
        })
        .collect();
    let candidate_count = candidates.iter().flatten().count();
    if candidate_count == 0 {
        return None;
    }

    let mut best: Option<Detection> = None;
    for strategy in STRATEGIES {
        let parsed: Vec<Option<Instant>> = candidates
            .iter()
            .map(|cell| cell.and_then(|value| strategy.parse(value)))
            .collect();
        let parsed_count = parsed.iter().flatten().count();
        let fraction = parsed_count as f64 / candidate_count as f64;

        if best.as_ref().is_some_and(|b| fraction <= b.parse_fraction) {
            continue;
        }
        best = Some(Detection {
            strategy: strategy.name,
            parse_fraction: fraction,
            parsed: parsed_count,
            candidates: candidate_count,
            timezone_normalized: parsed.iter().flatten().any(|instant| instant.zoned),
            values: parsed.into_iter().map(|p| p.map(|i| i.nanos)).collect(),
        });
    }
    best
}

fn strict_instant(value: &str, format: &str) -> Option<i64> {
    let naive = match NaiveDateTime::parse_from_str(value, format) {
        Ok(naive) => naive,
        Err(_) => NaiveDate::parse_from_str(value, format)
            .ok()?
            .and_hms_opt(0, 0, 0)?,
    };
    naive.and_utc().timestamp_nanos_opt()
}

/// Guess the format the source values were written in
///
/// Each sample pairs a raw cell with the epoch-ns it was encoded as. A
/// candidate only counts a sample when it parses the cell back to that
/// same instant, so the recorded format always renders what was decoded.
pub fn guess_output_format<'a>(
    samples: impl IntoIterator<Item = (&'a str, Option<i64>)>,
) -> String {
    let samples: Vec<(&str, i64)> = samples
        .into_iter()
        .filter_map(|(value, nanos)| Some((value.trim(), nanos?)))
        .filter(|(value, _)| !is_datetime_null(value))
        .collect();
    if samples.is_empty() {
        return default_output_format();
    }

    let mut best: Option<(&str, f64)> = None;
    for &format in OUTPUT_FORMAT_CANDIDATES {
        let matched = samples
            .iter()
            .filter(|(value, nanos)| strict_instant(value, format) == Some(*nanos))
            .count();
        let fraction = matched as f64 / samples.len() as f64;
        if fraction >= OUTPUT_FORMAT_MIN_FRAC && best.is_none_or(|(_, b)| fraction > b) {
            best = Some((format, fraction));
        }
    }
    best.map(|(format, _)| format.to_string())
        .unwrap_or_else(default_output_format)
}

/// Detect and encode a datetime column in place
///
/// A `datetime` override is always encoded. A numeric override is encoded
/// when the values look like datetimes but keeps its type. Inferred text
/// columns are reclassified to `datetime`. Returns whether the column was
/// encoded.
pub fn infer_datetime(descriptor: &mut ColumnDescriptor, config: &InferenceConfig) -> bool {
    let forced = match &descriptor.classification {
        Classification::Override {
            column_type: ColumnType::Datetime,
            ..
        } => true,
        Classification::Override {
            column_type: ColumnType::Integer | ColumnType::Continuous,
            ..
        } => false,
        classification if classification.is_text() => false,
        _ => return false,
    };
    if !forced && !config.infer_datetimes {
        return false;
    }

    let detection = match detect(&descriptor.raw_values) {
        Some(detection) => detection,
        None if forced => Detection {
            strategy: "none",
            parse_fraction: 0.0,
            parsed: 0,
            candidates: 0,
            values: vec![None; descriptor.raw_values.len()],
            timezone_normalized: false,
        },
        None => return false,
    };

    if !forced && (detection.parsed == 0 || detection.parse_fraction < config.datetime_min_parse_frac)
    {
        debug!(
            column = %descriptor.name,
            parse_fraction = detection.parse_fraction,
            "not datetime-like"
        );
        return false;
    }

    if detection.parsed < detection.candidates {
        warn!(
            column = %descriptor.name,
            failed = detection.candidates - detection.parsed,
            strategy = detection.strategy,
            "some datetime values did not parse and were encoded as null"
        );
    }

    let (output_format, format_source) = match config.forced_datetime_format() {
        Some(format) => (format.to_string(), FormatSource::Forced),
        None => {
            let samples = descriptor
                .raw_values
                .iter()
                .zip(&detection.values)
                .filter_map(|(raw, nanos)| raw.as_deref().map(|raw| (raw, *nanos)));
            (guess_output_format(samples), FormatSource::Inferred)
        }
    };

    let mut entry = DatetimeSpecEntry::new(output_format, format_source);
    entry.timezone_normalized = detection.timezone_normalized;

    debug!(
        column = %descriptor.name,
        strategy = detection.strategy,
        output_format = %entry.output_format,
        "encoded datetime column as epoch-ns"
    );

    if !descriptor.is_overridden() {
        descriptor.resolved_type = ColumnType::Datetime;
    }
    descriptor.domain = None;
    descriptor.encoded = Some(detection.values);
    descriptor.datetime = Some(entry);
    true
}

/// Render epoch-ns cells with a recorded format
///
/// Cells that are not integers render as null. No range check is applied.
pub fn render_values(
    column: &str,
    values: &[Option<String>],
    entry: &DatetimeSpecEntry,
) -> Result<Vec<Option<String>>, ConfigError> {
    validate_output_format(&entry.output_format).map_err(|_| {
        ConfigError::malformed(
            "datetime_spec",
            format!(
                "column '{}' has an unusable output_format '{}'",
                column, entry.output_format
            ),
        )
    })?;
    let items: Vec<Item<'_>> = StrftimeItems::new(&entry.output_format).collect();

    Ok(values
        .iter()
        .map(|cell| {
            let nanos = cell.as_deref().and_then(parse_integer)?;
            let instant = DateTime::<Utc>::from_timestamp_nanos(nanos);
            Some(instant.format_with_items(items.iter()).to_string())
        })
        .collect())
}

/// Column name used for a rendered copy when the original is kept
pub fn rendered_column_name(column: &str) -> String {
    format!("{column}__rendered")
}
