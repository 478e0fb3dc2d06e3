//! Selective-enrichment filter: which posts need a caption rewrite, and which
//! grew fast enough to justify a second, more expensive scrape.

use std::collections::HashMap;

use postsync_core::{MetricKind, RawRecord, SnapshotEntry};
use serde::Serialize;

use crate::metrics::parse_metric_value;
use crate::platform::PlatformAdapter;

/// Default growth threshold in percent.
pub const DEFAULT_GROWTH_THRESHOLD: f64 = 5.0;

/// A matched row needs enrichment only when it has no usable title yet.
#[must_use]
pub fn needs_enrichment(prior_title: Option<&str>) -> bool {
    prior_title.is_none_or(|title| title.trim().is_empty())
}

/// Percentage growth from `previous` to `current`.
///
/// From zero, any positive value counts as 100 % growth.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn growth_percent(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return if current > 0 { 100.0 } else { 0.0 };
    }
    (current - previous) as f64 * 100.0 / previous as f64
}

/// `true` when the metric grew by at least `threshold_percent`. Flat or
/// shrinking metrics never qualify.
#[must_use]
pub fn should_scrape_extra_metric(current: i64, previous: i64, threshold_percent: f64) -> bool {
    if current <= previous {
        return false;
    }
    growth_percent(current, previous) >= threshold_percent
}

/// A post whose tracked metric crossed the growth threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthCandidate {
    pub url: String,
    pub platform_id: Option<String>,
    pub current: i64,
    pub previous: i64,
    pub growth_percent: f64,
    /// `true` when the post is not in the snapshot yet.
    pub is_new: bool,
}

/// Compares `metric` of every scraped post against the snapshot and returns
/// the posts that crossed `threshold_percent`.
///
/// Posts are matched to snapshot rows by platform id, then by URL. Posts
/// without a URL are skipped since the follow-up scraper has nowhere to go.
#[must_use]
pub fn select_growth_candidates(
    adapter: &dyn PlatformAdapter,
    scraped: &[RawRecord],
    snapshot: &[SnapshotEntry],
    metric: MetricKind,
    threshold_percent: f64,
) -> Vec<GrowthCandidate> {
    let mut by_id: HashMap<String, i64> = HashMap::new();
    let mut by_url: HashMap<&str, i64> = HashMap::new();
    for entry in snapshot {
        let url = entry.row.url.trim();
        if url.is_empty() {
            continue;
        }
        let value = entry.row.metrics.get(metric);
        if let Some(id) = adapter.extract_id(url) {
            by_id.entry(id).or_insert(value);
        }
        by_url.entry(url).or_insert(value);
    }

    let mut candidates = Vec::new();
    for record in scraped {
        let Some(url) = record.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            continue;
        };
        let platform_id = adapter.extract_id(url);
        let current = record.metrics.get(&metric).map_or(0, parse_metric_value);

        let previous = platform_id
            .as_ref()
            .and_then(|id| by_id.get(id))
            .or_else(|| by_url.get(url))
            .copied();

        let is_new = previous.is_none();
        let previous = previous.unwrap_or(0);

        if should_scrape_extra_metric(current, previous, threshold_percent) {
            candidates.push(GrowthCandidate {
                url: url.to_string(),
                platform_id,
                current,
                previous,
                growth_percent: growth_percent(current, previous),
                is_new,
            });
        }
    }

    candidates
}
