//! Numeric bounds, categorical domains and missing rates

use tracing::debug;

use super::config::InferenceConfig;
use super::formats::{parse_integer, parse_number};
use super::types::{Bounds, Classification, ColumnDescriptor, ColumnType, DefaultReason};

/// Distinct values, sorted numerically when every value is a number,
/// lexicographically otherwise
pub fn distinct_sorted<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut distinct: Vec<&str> = values.into_iter().collect();
    distinct.sort_unstable();
    distinct.dedup();

    let numbers: Option<Vec<f64>> = distinct.iter().map(|v| parse_number(v)).collect();
    if let Some(numbers) = numbers {
        let mut keyed: Vec<(f64, &str)> = numbers.into_iter().zip(distinct).collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        return keyed.into_iter().map(|(_, v)| v.to_string()).collect();
    }
    distinct.into_iter().map(str::to_string).collect()
}

/// Null cells divided by row count; zero rows gives 0.0
pub fn missing_rate(raw_values: &[Option<String>]) -> f64 {
    if raw_values.is_empty() {
        return 0.0;
    }
    let nulls = raw_values.iter().filter(|v| v.is_none()).count();
    nulls as f64 / raw_values.len() as f64
}

/// Amount added on each side of a zero-span range
fn zero_span_pad(anchor: f64, pad: f64) -> f64 {
    if pad > 0.0 {
        (anchor.abs() * pad).max(1.0)
    } else {
        0.0
    }
}

/// Integer bounds from exact values, padded and rounded outward
///
/// Computed in `i128` so epoch-ns values keep every digit. Padding
/// saturates; when the data itself does not fit `i64` the bounds are
/// emitted as floats instead of being clamped toward the data.
pub fn integer_bounds(values: impl IntoIterator<Item = (i128, i128)>, pad: f64) -> Bounds {
    let mut range: Option<(i128, i128)> = None;
    for (low, high) in values {
        range = Some(match range {
            Some((min, max)) => (min.min(low), max.max(high)),
            None => (low, high),
        });
    }
    let Some((min, max)) = range else {
        return Bounds::integer(0, 1);
    };

    let span = max.saturating_sub(min);
    // float-to-int `as` saturates
    let amount = if span == 0 {
        zero_span_pad(min as f64, pad).ceil() as i128
    } else {
        (pad * span as f64).ceil() as i128
    };
    let low = min.saturating_sub(amount);
    let high = max.saturating_add(amount);

    match (i64::try_from(min), i64::try_from(max)) {
        (Ok(_), Ok(_)) => {
            let clamp = |v: i128| v.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
            Bounds::integer(clamp(low), clamp(high))
        }
        _ => Bounds::float(low as f64, high as f64),
    }
}

/// Float bounds from finite values, padded
pub fn continuous_bounds(values: impl IntoIterator<Item = f64>, pad: f64) -> Bounds {
    let mut range: Option<(f64, f64)> = None;
    for value in values.into_iter().filter(|v| v.is_finite()) {
        range = Some(match range {
            Some((min, max)) => (min.min(value), max.max(value)),
            None => (value, value),
        });
    }
    let Some((min, max)) = range else {
        return Bounds::float(0.0, 1.0);
    };

    let amount = if pad == 0.0 {
        0.0
    } else if max == min {
        zero_span_pad(min, pad)
    } else {
        let span = max - min;
        if span.is_finite() {
            pad * span
        } else {
            pad * max - pad * min
        }
    };
    Bounds::float(
        (min - amount).max(f64::MIN),
        (max + amount).min(f64::MAX),
    )
}

fn numeric_bounds(descriptor: &ColumnDescriptor, config: &InferenceConfig) -> Bounds {
    if let Some(encoded) = &descriptor.encoded {
        let pad = config.effective_pad(ColumnType::Datetime);
        return integer_bounds(encoded.iter().flatten().map(|v| (*v as i128, *v as i128)), pad);
    }

    let pad = config.effective_pad(descriptor.resolved_type);
    if descriptor.resolved_type == ColumnType::Continuous {
        return continuous_bounds(descriptor.non_null().filter_map(parse_number), pad);
    }

    let mut exact = Vec::new();
    for value in descriptor.non_null() {
        if let Some(integer) = parse_integer(value) {
            exact.push((integer as i128, integer as i128));
        } else if let Some(number) = parse_number(value) {
            let (low, high) = (number.floor(), number.ceil());
            if low < i64::MIN as f64 || high >= i64::MAX as f64 {
                return outward_float_bounds(descriptor, pad);
            }
            exact.push((low as i128, high as i128));
        }
    }
    integer_bounds(exact, pad)
}

/// Integer-typed column with values beyond `i64`: float bounds with whole ends
fn outward_float_bounds(descriptor: &ColumnDescriptor, pad: f64) -> Bounds {
    let bounds = continuous_bounds(descriptor.non_null().filter_map(parse_number), pad);
    Bounds::float(bounds.low().as_f64().floor(), bounds.high().as_f64().ceil())
}

fn inferred_domain(descriptor: &ColumnDescriptor, config: &InferenceConfig) -> Option<Vec<String>> {
    match &descriptor.classification {
        Classification::Boolean => Some(vec!["0".to_string(), "1".to_string()]),
        Classification::Default(DefaultReason::CategoriesDisabled) => None,
        Classification::Default(DefaultReason::AllNull) => {
            config.infer_categories.then(Vec::new)
        }
        _ => {
            let domain = distinct_sorted(descriptor.non_null());
            if domain.len() > config.max_categories {
                debug!(
                    column = %descriptor.name,
                    distinct = domain.len(),
                    max_categories = config.max_categories,
                    "domain exceeds category cap, not exported"
                );
                None
            } else {
                Some(domain)
            }
        }
    }
}

/// Fill in bounds, domain and missing rate for one column
///
/// Must run after classification, datetime encoding and binary promotion.
pub fn extract(descriptor: &mut ColumnDescriptor, config: &InferenceConfig) {
    descriptor.missing_rate = missing_rate(&descriptor.raw_values);

    if descriptor.resolved_type.takes_bounds() || descriptor.encoded.is_some() {
        descriptor.bounds = Some(numeric_bounds(descriptor, config));
        descriptor.domain = None;
        return;
    }

    descriptor.bounds = None;
    // an override domain is copied verbatim whatever the type
    if descriptor.has_override_domain() {
        return;
    }
    if !descriptor.resolved_type.takes_domain() {
        descriptor.domain = None;
        return;
    }
    if descriptor.domain.is_some() {
        return;
    }
    descriptor.domain = inferred_domain(descriptor, config);
}
