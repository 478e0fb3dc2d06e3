//! Turns reconciled records into sheet writes.
//!
//! Updates address rows by their pre-run position; appends always come after
//! every update.

use chrono::NaiveDate;
use postsync_core::{CellUpdate, CellValue, PostRecord, SheetRow, TitleAlias};
use serde::Serialize;

use crate::enrich::strip_hashtags;
use crate::layout::cell_ref;
use crate::platform::PlatformAdapter;
use crate::reconcile::{title_key, Reconciliation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanContext {
    /// Date stamped into the note column.
    pub today: NaiveDate,
    /// Data rows already in the sheet; numbering of appended rows continues
    /// from here.
    pub existing_row_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowUpdate {
    pub row_position: u32,
    pub cells: Vec<CellUpdate>,
    /// `true` when title and description are rewritten, not just metrics.
    pub content_changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergePlan {
    pub updates: Vec<RowUpdate>,
    pub appends: Vec<Vec<CellValue>>,
    /// Written titles whose own title key differs from their caption's.
    pub title_aliases: Vec<TitleAlias>,
}

impl MergePlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.appends.is_empty()
    }

    /// Every update flattened into single-cell writes, in row order.
    #[must_use]
    pub fn cell_updates(&self) -> Vec<CellUpdate> {
        self.updates
            .iter()
            .flat_map(|update| update.cells.iter().cloned())
            .collect()
    }

    #[must_use]
    pub fn content_updates(&self) -> usize {
        self.updates.iter().filter(|u| u.content_changed).count()
    }
}

/// Date text forced to stay text when the sheet parses user input.
fn date_cell(publish_date: &str) -> String {
    if publish_date.is_empty() {
        String::new()
    } else {
        format!("'{publish_date}")
    }
}

#[must_use]
pub fn update_note(today: NaiveDate) -> String {
    format!("Update {}", today.format("%d/%m"))
}

#[must_use]
pub fn insert_note(today: NaiveDate) -> String {
    format!("Insert {}", today.format("%d/%m"))
}

/// Builds the write plan for a reconciled platform run.
#[must_use]
pub fn build_plan(
    adapter: &dyn PlatformAdapter,
    reconciliation: &Reconciliation,
    ctx: &PlanContext,
) -> MergePlan {
    let mut plan = MergePlan::default();

    for (pos, record) in reconciliation.records.iter().enumerate() {
        let enriched = reconciliation.enriched.contains(&pos);
        let written_title = match record.row_position {
            Some(row_position) => {
                let update = row_update(adapter, record, row_position, enriched, ctx);
                let written = update.content_changed && !record.title.trim().is_empty();
                plan.updates.push(update);
                written.then(|| record.title.trim().to_string())
            }
            None => {
                let no = ctx.existing_row_count + plan.appends.len() + 1;
                let row = new_row(adapter, record, no, ctx);
                plan.appends.push(adapter.layout().cells_for_row(&row));
                Some(row.title)
            }
        };

        if let Some(alias) = written_title.and_then(|title| alias_for(adapter, record, title)) {
            plan.title_aliases.push(alias);
        }
    }

    plan
}

/// An alias is only needed when the written title no longer yields the
/// caption's title key.
fn alias_for(
    adapter: &dyn PlatformAdapter,
    record: &PostRecord,
    title: String,
) -> Option<TitleAlias> {
    let caption_key = record.title_key.as_ref()?;
    let own_key = title_key(&strip_hashtags(&title), adapter.title_key_len());
    (own_key.as_ref() != Some(caption_key) && !title.is_empty()).then(|| TitleAlias {
        title,
        title_key: caption_key.clone(),
    })
}

fn row_update(
    adapter: &dyn PlatformAdapter,
    record: &PostRecord,
    row_position: u32,
    enriched: bool,
    ctx: &PlanContext,
) -> RowUpdate {
    let layout = adapter.layout();
    let mut cells = Vec::new();

    // Generated content never blanks a cell.
    if enriched {
        if !record.title.trim().is_empty() {
            cells.push(CellUpdate {
                range: cell_ref(layout.title, row_position),
                value: CellValue::from(record.title.clone()),
            });
        }
        if !record.description.trim().is_empty() {
            cells.push(CellUpdate {
                range: cell_ref(layout.description, row_position),
                value: CellValue::from(record.description.clone()),
            });
        }
    }
    let content_changed = !cells.is_empty();

    if !record.publish_date.is_empty() {
        cells.push(CellUpdate {
            range: cell_ref(layout.publish_date, row_position),
            value: CellValue::from(date_cell(&record.publish_date)),
        });
    }

    // Only metrics the scraper reported: a separately scraped metric must not
    // be reset to zero.
    for (kind, value) in record.metrics.iter() {
        if let Some(column) = layout.metric_column(kind) {
            cells.push(CellUpdate {
                range: cell_ref(column, row_position),
                value: CellValue::Number(value),
            });
        }
    }

    cells.push(CellUpdate {
        range: cell_ref(layout.note, row_position),
        value: CellValue::from(update_note(ctx.today)),
    });

    RowUpdate {
        row_position,
        cells,
        content_changed,
    }
}

fn new_row(
    adapter: &dyn PlatformAdapter,
    record: &PostRecord,
    no: usize,
    ctx: &PlanContext,
) -> SheetRow {
    let title = if record.title.trim().is_empty() {
        record.raw_caption.trim().to_string()
    } else {
        record.title.clone()
    };

    SheetRow {
        no: no.to_string(),
        title,
        description: record.description.clone(),
        format: record
            .format
            .clone()
            .unwrap_or_else(|| adapter.default_format().to_string()),
        channel: adapter.channel().to_string(),
        publish_date: date_cell(&record.publish_date),
        status: "Published".to_string(),
        url: record.url.clone().unwrap_or_default(),
        metrics: record.metrics.clone(),
        note: insert_note(ctx.today),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use postsync_core::{MetricKind, Metrics};

    use super::*;
    use crate::platform::{FacebookAdapter, TikTokAdapter};

    fn ctx() -> PlanContext {
        PlanContext {
            today: NaiveDate::from_ymd_opt(2025, 2, 6).unwrap(),
            existing_row_count: 2,
        }
    }

    fn record(row_position: Option<u32>, title: &str, metrics: Metrics) -> PostRecord {
        PostRecord {
            platform_id: Some("1".to_string()),
            url: Some("https://www.tiktok.com/@a/video/1".to_string()),
            title_key: None,
            raw_caption: "Raw caption #tag".to_string(),
            title: title.to_string(),
            description: "Desc".to_string(),
            format: None,
            metrics,
            publish_date: "5/2".to_string(),
            date_sort_key: 205,
            row_position,
            is_existing: row_position.is_some(),
        }
    }

    fn reconciliation(records: Vec<PostRecord>, enriched: &[usize]) -> Reconciliation {
        Reconciliation {
            records,
            enriched: enriched.iter().copied().collect::<HashSet<_>>(),
            ..Reconciliation::default()
        }
    }

    #[test]
    fn notes_use_zero_padded_day_and_month() {
        let today = NaiveDate::from_ymd_opt(2025, 2, 6).unwrap();
        assert_eq!(update_note(today), "Update 06/02");
        assert_eq!(insert_note(today), "Insert 06/02");
    }

    #[test]
    fn metrics_only_update_writes_metrics_date_and_note() {
        let metrics = Metrics::new()
            .with(MetricKind::Views, 1_200)
            .with(MetricKind::Likes, 40);
        let plan = build_plan(
            &TikTokAdapter,
            &reconciliation(vec![record(Some(3), "Kept", metrics)], &[]),
            &ctx(),
        );

        assert!(plan.appends.is_empty());
        assert_eq!(plan.updates.len(), 1);
        let update = &plan.updates[0];
        assert!(!update.content_changed);
        let ranges: Vec<&str> = update.cells.iter().map(|c| c.range.as_str()).collect();
        assert_eq!(ranges, vec!["F3", "I3", "J3", "M3"]);
        assert_eq!(update.cells[0].value, CellValue::from("'5/2"));
        assert_eq!(update.cells[1].value, CellValue::Number(1_200));
        assert_eq!(update.cells[3].value, CellValue::from("Update 06/02"));
    }

    #[test]
    fn enriched_update_also_writes_title_and_description() {
        let plan = build_plan(
            &TikTokAdapter,
            &reconciliation(vec![record(Some(7), "Fresh", Metrics::new())], &[0]),
            &ctx(),
        );

        let update = &plan.updates[0];
        assert!(update.content_changed);
        assert_eq!(update.cells[0].range, "B7");
        assert_eq!(update.cells[0].value, CellValue::from("Fresh"));
        assert_eq!(update.cells[1].range, "C7");
        assert_eq!(plan.content_updates(), 1);
    }

    #[test]
    fn unreported_metrics_are_not_overwritten() {
        let metrics = Metrics::new().with(MetricKind::Views, 5);
        let plan = build_plan(
            &FacebookAdapter,
            &reconciliation(vec![record(Some(3), "Kept", metrics)], &[]),
            &ctx(),
        );
        let ranges: Vec<&str> = plan.updates[0]
            .cells
            .iter()
            .map(|c| c.range.as_str())
            .collect();
        assert!(!ranges.contains(&"K3"));
        assert!(ranges.contains(&"G3"));
    }

    #[test]
    fn new_rows_are_appended_with_full_layout() {
        let metrics = Metrics::new().with(MetricKind::Views, 10);
        let plan = build_plan(
            &TikTokAdapter,
            &reconciliation(
                vec![
                    record(None, "First", metrics.clone()),
                    record(None, "", metrics),
                ],
                &[0, 1],
            ),
            &ctx(),
        );

        assert!(plan.updates.is_empty());
        assert_eq!(plan.appends.len(), 2);
        let first = &plan.appends[0];
        assert_eq!(first.len(), 13);
        assert_eq!(first[0], CellValue::Number(3));
        assert_eq!(first[1], CellValue::from("First"));
        assert_eq!(first[3], CellValue::from("Video"));
        assert_eq!(first[4], CellValue::from("TikTok"));
        assert_eq!(first[5], CellValue::from("'5/2"));
        assert_eq!(first[6], CellValue::from("Published"));
        assert_eq!(first[8], CellValue::Number(10));
        assert_eq!(first[11], CellValue::Number(0));
        assert_eq!(first[12], CellValue::from("Insert 06/02"));

        let second = &plan.appends[1];
        assert_eq!(second[0], CellValue::Number(4));
        assert_eq!(second[1], CellValue::from("Raw caption #tag"));
    }

    #[test]
    fn empty_generated_content_never_blanks_cells() {
        let mut fallback = record(Some(5), "Stripped caption", Metrics::new());
        fallback.description = String::new();
        let mut nothing = record(Some(6), "", Metrics::new());
        nothing.description = String::new();

        let plan = build_plan(
            &TikTokAdapter,
            &reconciliation(vec![fallback, nothing], &[0, 1]),
            &ctx(),
        );

        let ranges: Vec<&str> = plan.updates[0]
            .cells
            .iter()
            .map(|c| c.range.as_str())
            .collect();
        assert_eq!(ranges, vec!["B5", "F5", "M5"]);
        assert!(plan.updates[0].content_changed);

        let ranges: Vec<&str> = plan.updates[1]
            .cells
            .iter()
            .map(|c| c.range.as_str())
            .collect();
        assert_eq!(ranges, vec!["F6", "M6"]);
        assert!(!plan.updates[1].content_changed);
    }

    #[test]
    fn enriched_titles_are_aliased_to_their_caption_key() {
        let mut appended = record(None, "EN: Raw caption", Metrics::new());
        appended.title_key = Some("raw caption".to_string());
        let mut updated = record(Some(4), "Raw caption", Metrics::new());
        updated.title_key = Some("raw caption".to_string());
        let mut kept = record(Some(5), "Kept title", Metrics::new());
        kept.title_key = Some("something else".to_string());

        let plan = build_plan(
            &TikTokAdapter,
            &reconciliation(vec![updated, kept, appended], &[0, 2]),
            &ctx(),
        );

        assert_eq!(
            plan.title_aliases,
            vec![TitleAlias {
                title: "EN: Raw caption".to_string(),
                title_key: "raw caption".to_string(),
            }]
        );
    }

    #[test]
    fn cell_updates_flatten_in_row_order() {
        let plan = build_plan(
            &TikTokAdapter,
            &reconciliation(
                vec![
                    record(Some(3), "A", Metrics::new()),
                    record(Some(4), "B", Metrics::new()),
                ],
                &[],
            ),
            &ctx(),
        );
        let ranges: Vec<String> = plan.cell_updates().into_iter().map(|c| c.range).collect();
        assert_eq!(ranges, vec!["F3", "M3", "F4", "M4"]);
    }
}
