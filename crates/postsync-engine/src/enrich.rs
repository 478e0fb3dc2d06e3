//! Batched caption enrichment around an [`EnrichmentGateway`].
//!
//! Every eligible caption gets a usable title even when the gateway is down:
//! the hashtag-stripped caption is the fallback title.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use postsync_core::{AppConfig, EnrichedContent, EnrichmentGateway};
use regex::Regex;
use serde::Serialize;

static HASHTAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#[\w\x{00C0}-\x{024F}\x{1E00}-\x{1EFF}]+").expect("valid hashtag regex")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid whitespace regex"));

/// Removes `#tag` tokens (Latin-extended and Vietnamese letters included),
/// collapses whitespace runs, and trims.
#[must_use]
pub fn strip_hashtags(text: &str) -> String {
    let without_tags = HASHTAG.replace_all(text, "");
    WHITESPACE_RUN
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentPolicy {
    pub batch_size: usize,
    /// Pause before the single retry of a failed batch.
    pub retry_delay: Duration,
}

impl Default for EnrichmentPolicy {
    fn default() -> Self {
        Self {
            batch_size: 10,
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl EnrichmentPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.enrich_batch_size.max(1),
            retry_delay: Duration::from_secs(config.enrich_retry_delay_secs),
        }
    }
}

/// Counts reported after an enrichment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentStats {
    pub enriched: usize,
    pub fallback: usize,
    pub skipped_empty: usize,
    pub failed_batches: usize,
    pub retried_batches: usize,
}

/// Enriches `captions`, returning one result per caption in input order.
///
/// Captions that are empty after hashtag stripping are not submitted and get
/// an empty title and description. The rest are sent in batches of
/// `policy.batch_size` with batch-relative ids `"0"`, `"1"`, .... A failed
/// batch falls back to the stripped captions and is retried exactly once
/// after `policy.retry_delay`; a response missing an id or carrying an empty
/// title falls back for that caption only.
pub async fn enrich_captions<G>(
    gateway: &G,
    policy: &EnrichmentPolicy,
    captions: &[String],
) -> (Vec<EnrichedContent>, EnrichmentStats)
where
    G: EnrichmentGateway + Sync,
{
    let mut stats = EnrichmentStats::default();
    let stripped: Vec<String> = captions.iter().map(|c| strip_hashtags(c)).collect();

    let mut results: Vec<EnrichedContent> = stripped
        .iter()
        .map(|clean| EnrichedContent {
            title: clean.clone(),
            description: String::new(),
        })
        .collect();

    let eligible: Vec<usize> = stripped
        .iter()
        .enumerate()
        .filter(|(_, clean)| !clean.is_empty())
        .map(|(idx, _)| idx)
        .collect();
    stats.skipped_empty = captions.len() - eligible.len();

    if eligible.is_empty() {
        return (results, stats);
    }

    let batch_size = policy.batch_size.max(1);
    let mut failed: Vec<&[usize]> = Vec::new();

    for (batch_no, chunk) in eligible.chunks(batch_size).enumerate() {
        let request = build_request(chunk, &stripped);
        tracing::debug!(batch = batch_no, items = chunk.len(), "submitting enrichment batch");

        match gateway.enrich(&request).await {
            Ok(response) => stats.enriched += apply_response(chunk, &response, &mut results),
            Err(err) => {
                tracing::warn!(
                    batch = batch_no,
                    items = chunk.len(),
                    error = %err,
                    "enrichment batch failed; using stripped captions"
                );
                stats.failed_batches += 1;
                failed.push(chunk);
            }
        }
    }

    for chunk in failed {
        tokio::time::sleep(policy.retry_delay).await;
        stats.retried_batches += 1;

        let request = build_request(chunk, &stripped);
        match gateway.enrich(&request).await {
            Ok(response) => stats.enriched += apply_response(chunk, &response, &mut results),
            Err(err) => {
                tracing::warn!(
                    items = chunk.len(),
                    error = %err,
                    "enrichment retry failed; keeping fallback titles"
                );
            }
        }
    }

    stats.fallback = eligible.len() - stats.enriched;
    (results, stats)
}

fn build_request(chunk: &[usize], stripped: &[String]) -> BTreeMap<String, String> {
    chunk
        .iter()
        .enumerate()
        .map(|(local, idx)| (local.to_string(), stripped[*idx].clone()))
        .collect()
}

/// Writes usable entries of `response` into `results`; returns how many.
fn apply_response(
    chunk: &[usize],
    response: &BTreeMap<String, EnrichedContent>,
    results: &mut [EnrichedContent],
) -> usize {
    let mut applied = 0;
    for (local, idx) in chunk.iter().enumerate() {
        let Some(content) = response.get(&local.to_string()) else {
            continue;
        };
        let title = content.title.trim();
        if title.is_empty() {
            continue;
        }
        results[*idx] = EnrichedContent {
            title: title.to_string(),
            description: content.description.trim().to_string(),
        };
        applied += 1;
    }
    applied
}

#[cfg(test)]
#[path = "enrich_test.rs"]
mod tests;
