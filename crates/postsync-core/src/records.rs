//! Record types that flow through a sync run: raw scraper output, merged
//! post records, persisted snapshot rows, and spreadsheet cell writes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A metric column tracked for a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    #[serde(alias = "view")]
    Views,
    #[serde(alias = "like", alias = "engagement", alias = "reactions")]
    Likes,
    #[serde(alias = "comment")]
    Comments,
    #[serde(alias = "share")]
    Shares,
    /// Shown in the Facebook "Reach" column.
    #[serde(alias = "reach")]
    Impressions,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Views,
        MetricKind::Likes,
        MetricKind::Comments,
        MetricKind::Shares,
        MetricKind::Impressions,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Views => "views",
            MetricKind::Likes => "likes",
            MetricKind::Comments => "comments",
            MetricKind::Shares => "shares",
            MetricKind::Impressions => "impressions",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric exactly as the scraper produced it: a display string such as
/// `"45K"`, a plain number, or nothing at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Missing,
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_string())
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Integer(value)
    }
}

/// Normalized integer metrics for one post. Absent metrics read as `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metrics(BTreeMap<MetricKind, i64>);

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, kind: MetricKind) -> i64 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn set(&mut self, kind: MetricKind, value: i64) {
        self.0.insert(kind, value);
    }

    #[must_use]
    pub fn with(mut self, kind: MetricKind, value: i64) -> Self {
        self.set(kind, value);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricKind, i64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// One post as delivered by a scraper, before any normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub url: Option<String>,
    /// Raw caption text, hashtags included.
    #[serde(default)]
    pub title: String,
    /// Platform-specific date text, e.g. `"Feb 5, 10:38 PM"` or `"02/05/2025 22:38"`.
    #[serde(default)]
    pub date: String,
    /// Post format reported by the platform (`"Reel"`, `"Photo"`, ...).
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<MetricKind, MetricValue>,
}

/// A post after reconciliation against the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub platform_id: Option<String>,
    pub url: Option<String>,
    /// Normalized caption prefix used as the last-resort match key.
    pub title_key: Option<String>,
    pub raw_caption: String,
    pub title: String,
    pub description: String,
    pub format: Option<String>,
    pub metrics: Metrics,
    /// Display form of the publish date (`d/m`).
    pub publish_date: String,
    /// Sortable form of the publish date; `0` when the raw text did not parse.
    pub date_sort_key: i64,
    /// 1-based sheet row; `None` until the row exists in the sheet.
    pub row_position: Option<u32>,
    pub is_existing: bool,
}

/// Content of one spreadsheet data row, independent of its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow {
    pub no: String,
    pub title: String,
    pub description: String,
    pub format: String,
    pub channel: String,
    pub publish_date: String,
    pub status: String,
    pub url: String,
    pub metrics: Metrics,
    pub note: String,
}

impl SheetRow {
    /// `true` when every text cell is blank and no metric is set.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        [
            &self.no,
            &self.title,
            &self.description,
            &self.format,
            &self.channel,
            &self.publish_date,
            &self.status,
            &self.url,
            &self.note,
        ]
        .iter()
        .all(|s| s.trim().is_empty())
            && self.metrics.iter().all(|(_, v)| v == 0)
    }
}

/// Last-persisted state of one occupied sheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub row_position: u32,
    pub row: SheetRow,
}

/// Ties a title written to the sheet to the title key of the caption it was
/// generated from, so a post without a URL still matches its row after its
/// caption was replaced by an enriched title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TitleAlias {
    pub title: String,
    pub title_key: String,
}

/// A value written into a single sheet cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(i64),
    Text(String),
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value)
    }
}

/// A single-cell write addressed in A1 notation (without the tab name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellUpdate {
    pub range: String,
    pub value: CellValue,
}

/// Title and description produced by the enrichment gateway for one caption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedContent {
    pub title: String,
    pub description: String,
}
