//! Normalization of human-readable metric strings ("45K", "3,801", "--") to
//! integers.
//!
//! Parsing never fails: anything unreadable becomes `0`.

use postsync_core::MetricValue;

/// Normalizes a raw metric as delivered by a scraper.
///
/// Numbers are rounded to the nearest integer (non-finite values become `0`).
/// Strings go through [`parse_metric_str`].
#[must_use]
pub fn parse_metric_value(raw: &MetricValue) -> i64 {
    match raw {
        MetricValue::Integer(value) => *value,
        MetricValue::Float(value) => round_to_i64(*value),
        MetricValue::Text(text) => parse_metric_str(text),
        MetricValue::Missing => 0,
    }
}

/// Parses a display string such as `"1.2M"`, `"45K"`, or `"3,801"`.
///
/// Rules:
/// - blank or `"--"` is `0`
/// - a trailing `K`/`M`/`B` (any case) scales the prefix by 1e3/1e6/1e9 and
///   rounds; a comma in the prefix is a decimal separator when no period is
///   present (`"1,2K"` is `1200`)
/// - otherwise commas, periods, and whitespace are thousands separators
#[must_use]
pub fn parse_metric_str(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "--" {
        return 0;
    }

    if let Some((prefix, multiplier)) = split_suffix(trimmed) {
        let prefix = prefix.trim();
        let normalized = if prefix.contains('.') {
            prefix.replace(',', "")
        } else {
            prefix.replace(',', ".")
        };
        let normalized: String = normalized.chars().filter(|c| !c.is_whitespace()).collect();
        return normalized
            .parse::<f64>()
            .map_or(0, |value| round_to_i64(value * multiplier));
    }

    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ',' | '.') && !c.is_whitespace())
        .collect();
    digits.parse::<i64>().unwrap_or(0)
}

fn split_suffix(s: &str) -> Option<(&str, f64)> {
    let last = s.chars().last()?;
    let multiplier = match last.to_ascii_uppercase() {
        'K' => 1e3,
        'M' => 1e6,
        'B' => 1e9,
        _ => return None,
    };
    Some((&s[..s.len() - last.len_utf8()], multiplier))
}

#[allow(clippy::cast_possible_truncation)]
fn round_to_i64(value: f64) -> i64 {
    if value.is_finite() {
        value.round() as i64
    } else {
        0
    }
}
