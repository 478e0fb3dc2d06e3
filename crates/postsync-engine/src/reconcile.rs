//! Matching freshly scraped posts against the stored snapshot.
//!
//! [`classify`] is pure: it decides, for every scraped record, whether it
//! refreshes an existing row or becomes a new one, and reports what it did as
//! [`ReconcileEvent`]s. [`reconcile`] adds the enrichment call and the final
//! ordering.

use std::collections::{HashMap, HashSet};

use postsync_core::{
    EnrichmentGateway, Metrics, PostRecord, RawRecord, SnapshotEntry, TitleAlias,
};
use serde::Serialize;

use crate::enrich::{enrich_captions, strip_hashtags, EnrichmentPolicy, EnrichmentStats};
use crate::growth::needs_enrichment;
use crate::metrics::parse_metric_value;
use crate::platform::PlatformAdapter;

/// Which key tied a scraped record to a snapshot row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKey {
    PlatformId,
    Url,
    TitleKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReconcileEvent {
    Matched {
        index: usize,
        key: MatchKey,
        row_position: u32,
    },
    New {
        index: usize,
        url: Option<String>,
    },
    /// No URL and no caption: nothing to match or insert.
    Dropped { index: usize },
    /// Same platform id or URL as an earlier record in the same scrape.
    Duplicate { index: usize, url: Option<String> },
}

/// Output of [`classify`], before enrichment.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub records: Vec<PostRecord>,
    /// Indexes into `records` that need a title and description.
    pub needs_enrichment: Vec<usize>,
    pub events: Vec<ReconcileEvent>,
}

/// Output of [`reconcile`].
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Existing rows by row position, then new posts by publish date.
    pub records: Vec<PostRecord>,
    /// Positions in `records` whose title and description were (re)generated.
    pub enriched: HashSet<usize>,
    pub events: Vec<ReconcileEvent>,
    pub enrichment: EnrichmentStats,
}

/// Lowercased, trimmed prefix of a hashtag-stripped caption.
#[must_use]
pub fn title_key(stripped: &str, len: usize) -> Option<String> {
    let prefix: String = stripped.chars().take(len).collect();
    let key = prefix.to_lowercase().trim().to_string();
    (!key.is_empty()).then_some(key)
}

/// Builds a [`PostRecord`] from raw scraper output, unmatched.
#[must_use]
pub fn post_from_raw(adapter: &dyn PlatformAdapter, raw: &RawRecord) -> PostRecord {
    let url = raw
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    let platform_id = url.as_deref().and_then(|u| adapter.extract_id(u));
    let stripped = strip_hashtags(&raw.title);

    let mut metrics = Metrics::new();
    for (kind, value) in &raw.metrics {
        metrics.set(*kind, parse_metric_value(value));
    }

    PostRecord {
        platform_id,
        url,
        title_key: title_key(&stripped, adapter.title_key_len()),
        raw_caption: raw.title.clone(),
        title: String::new(),
        description: String::new(),
        format: raw
            .format
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string),
        metrics,
        publish_date: adapter.format_date(&raw.date),
        date_sort_key: adapter.date_sort_key(&raw.date),
        row_position: None,
        is_existing: false,
    }
}

struct SnapshotIndex<'a> {
    entries: &'a [SnapshotEntry],
    /// Platform id of each entry's URL, by entry index.
    ids: Vec<Option<String>>,
    by_id: HashMap<String, usize>,
    by_url: HashMap<&'a str, usize>,
    by_title: HashMap<String, usize>,
}

impl<'a> SnapshotIndex<'a> {
    fn build(
        adapter: &dyn PlatformAdapter,
        entries: &'a [SnapshotEntry],
        aliases: &[TitleAlias],
    ) -> Self {
        let alias_keys: HashMap<&str, &str> = aliases
            .iter()
            .map(|alias| (alias.title.trim(), alias.title_key.as_str()))
            .collect();

        let mut ids = Vec::with_capacity(entries.len());
        let mut by_id = HashMap::new();
        let mut by_url = HashMap::new();
        let mut by_title = HashMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            let url = entry.row.url.trim();
            let id = if url.is_empty() {
                None
            } else {
                by_url.entry(url).or_insert(idx);
                adapter.extract_id(url)
            };
            if let Some(id) = &id {
                by_id.entry(id.clone()).or_insert(idx);
            }
            ids.push(id);

            // A written title keeps answering to the caption it came from.
            if let Some(key) = alias_keys.get(entry.row.title.trim()) {
                by_title.entry((*key).to_string()).or_insert(idx);
            }
            if let Some(key) = title_key(&strip_hashtags(&entry.row.title), adapter.title_key_len())
            {
                by_title.entry(key).or_insert(idx);
            }
        }

        Self {
            entries,
            ids,
            by_id,
            by_url,
            by_title,
        }
    }

    fn find_direct(&self, post: &PostRecord, claimed: &HashSet<usize>) -> Option<(usize, MatchKey)> {
        let by_id = post
            .platform_id
            .as_ref()
            .and_then(|id| self.by_id.get(id))
            .filter(|idx| !claimed.contains(*idx))
            .map(|idx| (*idx, MatchKey::PlatformId));

        by_id.or_else(|| {
            post.url
                .as_deref()
                .and_then(|url| self.by_url.get(url))
                .filter(|idx| !claimed.contains(*idx))
                .map(|idx| (*idx, MatchKey::Url))
        })
    }

    fn find_by_title(&self, post: &PostRecord, claimed: &HashSet<usize>) -> Option<usize> {
        let idx = *post.title_key.as_ref().and_then(|key| self.by_title.get(key))?;
        if claimed.contains(&idx) {
            return None;
        }
        // Two known, different ids are two different posts.
        if let (Some(post_id), Some(entry_id)) = (&post.platform_id, &self.ids[idx]) {
            if post_id != entry_id {
                return None;
            }
        }
        Some(idx)
    }
}

/// Classifies every scraped record against the snapshot, with no stored
/// title aliases.
#[must_use]
pub fn classify(
    adapter: &dyn PlatformAdapter,
    snapshot: &[SnapshotEntry],
    scraped: &[RawRecord],
) -> Classification {
    classify_with_aliases(adapter, snapshot, &[], scraped)
}

/// Classifies every scraped record against the snapshot.
///
/// Matching is by platform id, then exact URL, then title key; the title key
/// is only tried once every id and URL match has been claimed, so a direct
/// match always wins the row. A title key match is refused when both sides
/// carry a platform id and the ids differ. Each snapshot row is claimed at
/// most once. A row's title key comes from its title and, through
/// `aliases`, from the caption that title was generated from.
#[must_use]
pub fn classify_with_aliases(
    adapter: &dyn PlatformAdapter,
    snapshot: &[SnapshotEntry],
    aliases: &[TitleAlias],
    scraped: &[RawRecord],
) -> Classification {
    let index = SnapshotIndex::build(adapter, snapshot, aliases);
    let mut events = Vec::new();

    // (scrape index, post) for every record that survives dedupe.
    let mut posts: Vec<(usize, PostRecord)> = Vec::with_capacity(scraped.len());
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_urls: HashSet<String> = HashSet::new();

    for (idx, raw) in scraped.iter().enumerate() {
        let post = post_from_raw(adapter, raw);
        if post.url.is_none() && raw.title.trim().is_empty() {
            events.push(ReconcileEvent::Dropped { index: idx });
            continue;
        }

        let dup_id = post.platform_id.as_ref().is_some_and(|id| seen_ids.contains(id));
        let dup_url = post.url.as_ref().is_some_and(|url| seen_urls.contains(url));
        if dup_id || dup_url {
            events.push(ReconcileEvent::Duplicate {
                index: idx,
                url: post.url.clone(),
            });
            continue;
        }
        if let Some(id) = &post.platform_id {
            seen_ids.insert(id.clone());
        }
        if let Some(url) = &post.url {
            seen_urls.insert(url.clone());
        }
        posts.push((idx, post));
    }

    let mut claimed: HashSet<usize> = HashSet::new();
    let mut matches: Vec<Option<(usize, MatchKey)>> = vec![None; posts.len()];

    for (slot, (_, post)) in posts.iter().enumerate() {
        if let Some((entry_idx, key)) = index.find_direct(post, &claimed) {
            claimed.insert(entry_idx);
            matches[slot] = Some((entry_idx, key));
        }
    }
    for (slot, (_, post)) in posts.iter().enumerate() {
        if matches[slot].is_some() {
            continue;
        }
        if let Some(entry_idx) = index.find_by_title(post, &claimed) {
            claimed.insert(entry_idx);
            matches[slot] = Some((entry_idx, MatchKey::TitleKey));
        }
    }

    let mut records = Vec::with_capacity(posts.len());
    let mut needs = Vec::new();

    for ((scrape_idx, mut post), matched) in posts.into_iter().zip(matches) {
        match matched {
            Some((entry_idx, key)) => {
                let entry = &index.entries[entry_idx];
                events.push(ReconcileEvent::Matched {
                    index: scrape_idx,
                    key,
                    row_position: entry.row_position,
                });

                post.row_position = Some(entry.row_position);
                post.is_existing = true;
                if post.url.is_none() && !entry.row.url.trim().is_empty() {
                    post.url = Some(entry.row.url.trim().to_string());
                }

                if needs_enrichment(Some(&entry.row.title)) {
                    needs.push(records.len());
                } else {
                    post.title.clone_from(&entry.row.title);
                    post.description.clone_from(&entry.row.description);
                }
            }
            None => {
                events.push(ReconcileEvent::New {
                    index: scrape_idx,
                    url: post.url.clone(),
                });
                needs.push(records.len());
            }
        }
        records.push(post);
    }

    Classification {
        records,
        needs_enrichment: needs,
        events,
    }
}

/// Classifies, enriches the records that need it in one batched pass, and
/// orders the result: existing rows by row position, then new posts by
/// publish date (stable for equal dates).
pub async fn reconcile<G>(
    adapter: &dyn PlatformAdapter,
    snapshot: &[SnapshotEntry],
    aliases: &[TitleAlias],
    scraped: &[RawRecord],
    gateway: &G,
    policy: &EnrichmentPolicy,
) -> Reconciliation
where
    G: EnrichmentGateway + Sync,
{
    let Classification {
        mut records,
        needs_enrichment,
        events,
    } = classify_with_aliases(adapter, snapshot, aliases, scraped);

    let mut enrichment = EnrichmentStats::default();
    let mut enriched_flags = vec![false; records.len()];

    if !needs_enrichment.is_empty() {
        let captions: Vec<String> = needs_enrichment
            .iter()
            .map(|idx| records[*idx].raw_caption.clone())
            .collect();
        let (results, stats) = enrich_captions(gateway, policy, &captions).await;
        enrichment = stats;

        for (idx, content) in needs_enrichment.iter().zip(results) {
            // Nothing but hashtags: no content was generated.
            if content.title.is_empty() {
                continue;
            }
            records[*idx].title = content.title;
            records[*idx].description = content.description;
            enriched_flags[*idx] = true;
        }
    }

    let mut tagged: Vec<(PostRecord, bool)> = records.into_iter().zip(enriched_flags).collect();
    sort_for_write(&mut tagged);

    let enriched = tagged
        .iter()
        .enumerate()
        .filter(|(_, (_, flag))| *flag)
        .map(|(pos, _)| pos)
        .collect();
    let records = tagged.into_iter().map(|(record, _)| record).collect();

    Reconciliation {
        records,
        enriched,
        events,
        enrichment,
    }
}

fn sort_for_write(records: &mut [(PostRecord, bool)]) {
    // sort_by_key is stable
    records.sort_by_key(|(record, _)| match record.row_position {
        Some(position) => (0u8, i64::from(position)),
        None => (1u8, record.date_sort_key),
    });
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
