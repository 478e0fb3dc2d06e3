//! Back-fills titles and descriptions for rows already in the sheet.

use postsync_core::{CellUpdate, CellValue, EnrichmentGateway, SheetWriter};
use serde::Serialize;

use crate::enrich::{enrich_captions, EnrichmentPolicy, EnrichmentStats};
use crate::error::SyncError;
use crate::layout::cell_ref;
use crate::pipeline::read_sheet_rows;
use crate::platform::PlatformAdapter;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecallSummary {
    /// Rows with a blank title or description.
    pub candidates: usize,
    pub cells_written: usize,
    pub enrichment: EnrichmentStats,
}

/// Finds rows missing a title or description, enriches their existing title
/// text, and writes back what came out.
///
/// A title is only written where it was blank; rows without any title text
/// have nothing to enrich and are left alone.
///
/// # Errors
///
/// Returns [`SyncError`] when reading or writing the sheet fails.
pub async fn run_recall<W, G>(
    adapter: &dyn PlatformAdapter,
    sheet: &W,
    gateway: &G,
    start_row: u32,
    max_row: u32,
    enrichment: &EnrichmentPolicy,
    retry: &RetryPolicy,
) -> Result<RecallSummary, SyncError>
where
    W: SheetWriter + Sync,
    G: EnrichmentGateway + Sync,
{
    let layout = adapter.layout();
    let rows = read_sheet_rows(sheet, layout, start_row, max_row, retry).await?;

    let candidates: Vec<(u32, bool, String)> = (start_row..)
        .zip(&rows)
        .filter(|(_, row)| !row.is_blank())
        .filter(|(_, row)| row.title.trim().is_empty() || row.description.trim().is_empty())
        .map(|(position, row)| (position, row.title.trim().is_empty(), row.title.clone()))
        .collect();

    let mut summary = RecallSummary {
        candidates: candidates.len(),
        ..RecallSummary::default()
    };
    if candidates.is_empty() {
        tracing::info!(platform = %adapter.platform(), "no rows need recall");
        return Ok(summary);
    }

    let captions: Vec<String> = candidates.iter().map(|(_, _, title)| title.clone()).collect();
    let (results, stats) = enrich_captions(gateway, enrichment, &captions).await;
    summary.enrichment = stats;

    let mut updates = Vec::new();
    for ((position, title_blank, _), content) in candidates.iter().zip(results) {
        if *title_blank && !content.title.is_empty() {
            updates.push(CellUpdate {
                range: cell_ref(layout.title, *position),
                value: CellValue::from(content.title),
            });
        }
        if !content.description.is_empty() {
            updates.push(CellUpdate {
                range: cell_ref(layout.description, *position),
                value: CellValue::from(content.description),
            });
        }
    }

    if !updates.is_empty() {
        retry
            .run_if("write recalled cells", W::is_retriable, || {
                sheet.write_cells(&updates)
            })
            .await
            .map_err(|err| SyncError::sheet_write("recall", err))?;
    }
    summary.cells_written = updates.len();

    tracing::info!(
        platform = %adapter.platform(),
        candidates = summary.candidates,
        cells_written = summary.cells_written,
        "recall complete"
    );

    Ok(summary)
}
