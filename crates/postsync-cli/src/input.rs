//! Loading scraper backup files and Facebook CSV exports.
//!
//! JSON backups come in two shapes: records with a nested `metrics` object,
//! and the flat layout the crawlers write (`views`, `likes`, `impressions`,
//! ... next to `title` and `url`). A `.csv` input is read as a Meta Business
//! Suite post export. Everything ends up as [`RawRecord`]s.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use postsync_core::{MetricKind, MetricValue, RawRecord};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ScrapedPost {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, alias = "caption")]
    title: String,
    #[serde(default)]
    date: String,
    #[serde(default, alias = "postType")]
    format: Option<String>,
    #[serde(default)]
    metrics: BTreeMap<MetricKind, MetricValue>,
    #[serde(flatten)]
    rest: BTreeMap<String, Value>,
}

impl From<ScrapedPost> for RawRecord {
    fn from(post: ScrapedPost) -> Self {
        let mut metrics = post.metrics;
        for (key, value) in post.rest {
            let Ok(kind) = serde_json::from_value::<MetricKind>(Value::String(key)) else {
                continue;
            };
            let value = serde_json::from_value::<MetricValue>(value).unwrap_or(MetricValue::Missing);
            metrics.entry(kind).or_insert(value);
        }

        RawRecord {
            url: post.url.filter(|u| !u.trim().is_empty()),
            title: post.title,
            date: post.date,
            format: post.format.filter(|f| !f.trim().is_empty()),
            metrics,
        }
    }
}

/// Parses a JSON array of scraped posts.
///
/// # Errors
///
/// Returns an error when `json` is not an array of objects.
pub(crate) fn parse_records(json: &str) -> anyhow::Result<Vec<RawRecord>> {
    let posts: Vec<ScrapedPost> =
        serde_json::from_str(json).context("expected a JSON array of scraped posts")?;
    Ok(posts.into_iter().map(RawRecord::from).collect())
}

/// Export rows shorter than this are cut off and skipped.
const MIN_EXPORT_FIELDS: usize = 5;

/// Column positions of a Facebook export, matched case-insensitively.
#[derive(Debug)]
struct ExportColumns {
    title: Option<usize>,
    date: Option<usize>,
    format: Option<usize>,
    url: Option<usize>,
    metrics: Vec<(MetricKind, usize)>,
}

impl ExportColumns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|name| h.trim().eq_ignore_ascii_case(name)))
        };

        let metrics = [
            (MetricKind::Views, "views"),
            (MetricKind::Impressions, "impressions"),
            (MetricKind::Likes, "reactions"),
            (MetricKind::Comments, "comments"),
            (MetricKind::Shares, "shares"),
        ]
        .into_iter()
        .filter_map(|(kind, name)| find(&[name]).map(|idx| (kind, idx)))
        .collect();

        Self {
            title: find(&["title"]),
            date: find(&["date", "publish time"]),
            format: find(&["post type"]),
            url: find(&["permalink"]),
            metrics,
        }
    }
}

/// Parses a Meta Business Suite post export.
///
/// Quoted fields may span lines. Rows with fewer than five fields, and rows
/// with neither a title nor a permalink, are skipped. A metric column that
/// is present but empty counts as `0`; a missing column is not reported.
///
/// # Errors
///
/// Returns an error when the export has no header or no data rows, or a
/// record is malformed.
pub(crate) fn parse_export_csv(text: &str) -> anyhow::Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

    let headers = reader
        .headers()
        .context("CSV export has no header row")?
        .clone();
    let columns = ExportColumns::from_headers(&headers);
    tracing::debug!(?columns, "mapped export columns");

    let mut data_rows = 0usize;
    let mut records = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("malformed CSV record {}", line + 1))?;
        data_rows += 1;
        if row.len() < MIN_EXPORT_FIELDS {
            continue;
        }

        let field = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or_default();
        let title = field(columns.title);
        let url = field(columns.url);
        if title.is_empty() && url.is_empty() {
            continue;
        }

        let metrics = columns
            .metrics
            .iter()
            .map(|(kind, idx)| {
                let value = match row.get(*idx).unwrap_or_default() {
                    "" => MetricValue::Integer(0),
                    text => MetricValue::from(text),
                };
                (*kind, value)
            })
            .collect();

        records.push(RawRecord {
            url: (!url.is_empty()).then(|| url.to_string()),
            title: title.to_string(),
            date: field(columns.date).to_string(),
            format: Some(field(columns.format))
                .filter(|f| !f.is_empty())
                .map(str::to_string),
            metrics,
        });
    }

    if data_rows == 0 {
        anyhow::bail!("CSV export has no data rows");
    }
    Ok(records)
}

/// How an input file is read, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputFormat {
    Json,
    FacebookExport,
}

impl InputFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => InputFormat::FacebookExport,
            _ => InputFormat::Json,
        }
    }
}

/// Reads and parses a scraper backup or a Facebook CSV export.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub(crate) fn load_records(path: &Path) -> anyhow::Result<Vec<RawRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let format = InputFormat::from_path(path);
    let records = match format {
        InputFormat::Json => parse_records(&text),
        InputFormat::FacebookExport => parse_export_csv(&text),
    }
    .with_context(|| format!("failed to parse {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        ?format,
        records = records.len(),
        "loaded scraped records"
    );
    Ok(records)
}
