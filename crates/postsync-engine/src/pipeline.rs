//! One platform's sync run: snapshot the sheet, reconcile the scrape, write
//! the plan.

use chrono::NaiveDate;
use postsync_core::{
    AppConfig, EnrichmentGateway, MetricKind, Platform, RawRecord, SheetRow, SheetWriter,
    SnapshotEntry, SnapshotStore,
};
use serde::Serialize;

use crate::enrich::EnrichmentPolicy;
use crate::error::SyncError;
use crate::growth::{select_growth_candidates, GrowthCandidate};
use crate::layout::{column_index, ColumnLayout};
use crate::plan::{build_plan, MergePlan, PlanContext};
use crate::platform::PlatformAdapter;
use crate::reconcile::{reconcile, ReconcileEvent};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncSettings {
    /// 1-based row of the first data row.
    pub start_row: u32,
    /// Last row read when snapshotting the sheet.
    pub max_row: u32,
    pub growth_metric: MetricKind,
    pub growth_threshold_percent: f64,
    pub enrichment: EnrichmentPolicy,
    pub write_retry: RetryPolicy,
    pub today: NaiveDate,
    /// Plan only: no snapshot save, no sheet writes.
    pub dry_run: bool,
}

impl SyncSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig, platform: Platform, today: NaiveDate) -> Self {
        Self {
            start_row: config.sheet_target(platform).data_start_row,
            max_row: config.sheet_max_row,
            growth_metric: MetricKind::Likes,
            growth_threshold_percent: config.growth_threshold_percent,
            enrichment: EnrichmentPolicy::from_app_config(config),
            write_retry: RetryPolicy::from_app_config(config),
            today,
            dry_run: false,
        }
    }
}

/// What a run did (or, in dry-run mode, would do).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    pub platform: Option<Platform>,
    pub dry_run: bool,
    pub scraped: usize,
    pub snapshot_rows: usize,
    pub updated: usize,
    pub content_updated: usize,
    pub inserted: usize,
    pub dropped: usize,
    pub duplicates: usize,
    pub enriched: usize,
    pub fallback: usize,
    pub growth_candidates: Vec<GrowthCandidate>,
}

/// A run aborted by a collaborator error, with whatever had completed.
#[derive(Debug)]
pub struct SyncFailure {
    pub summary: SyncSummary,
    pub error: SyncError,
}

impl std::fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (updated {}, inserted {} before failure)",
            self.error, self.summary.updated, self.summary.inserted
        )
    }
}

impl std::error::Error for SyncFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Reads the tab's data rows and converts them with `layout`.
///
/// Trailing blank rows are dropped; blank rows in between are kept so that
/// every row keeps its position.
///
/// # Errors
///
/// Returns [`SyncError::SheetRead`] when the read fails after retries.
pub async fn read_sheet_rows<W>(
    sheet: &W,
    layout: &ColumnLayout,
    start_row: u32,
    max_row: u32,
    retry: &RetryPolicy,
) -> Result<Vec<SheetRow>, SyncError>
where
    W: SheetWriter + Sync,
{
    let range = layout.data_range(start_row, max_row);
    let raw = retry
        .run_if("read sheet", W::is_retriable, || sheet.read_range(&range))
        .await
        .map_err(|err| SyncError::sheet_read(&range, err))?;

    let mut rows: Vec<SheetRow> = raw.iter().map(|cells| layout.row_from_cells(cells)).collect();
    while rows.last().is_some_and(SheetRow::is_blank) {
        rows.pop();
    }
    Ok(rows)
}

/// Runs one platform's sync.
///
/// The sheet's current rows are saved as the snapshot before anything is
/// written, so a failure while writing leaves a snapshot that matches the
/// sheet as it was.
///
/// # Errors
///
/// Returns a [`SyncFailure`] carrying the partial summary when the sheet or
/// the snapshot store fails.
pub async fn run_platform_sync<S, W, G>(
    adapter: &dyn PlatformAdapter,
    store: &S,
    sheet: &W,
    gateway: &G,
    scraped: &[RawRecord],
    settings: &SyncSettings,
) -> Result<SyncSummary, SyncFailure>
where
    S: SnapshotStore + Sync,
    W: SheetWriter + Sync,
    G: EnrichmentGateway + Sync,
{
    let mut summary = SyncSummary {
        platform: Some(adapter.platform()),
        dry_run: settings.dry_run,
        scraped: scraped.len(),
        ..SyncSummary::default()
    };

    match sync_into(adapter, store, sheet, gateway, scraped, settings, &mut summary).await {
        Ok(()) => Ok(summary),
        Err(error) => {
            tracing::error!(
                platform = %adapter.platform(),
                updated = summary.updated,
                inserted = summary.inserted,
                error = %error,
                "sync aborted"
            );
            Err(SyncFailure { summary, error })
        }
    }
}

async fn sync_into<S, W, G>(
    adapter: &dyn PlatformAdapter,
    store: &S,
    sheet: &W,
    gateway: &G,
    scraped: &[RawRecord],
    settings: &SyncSettings,
    summary: &mut SyncSummary,
) -> Result<(), SyncError>
where
    S: SnapshotStore + Sync,
    W: SheetWriter + Sync,
    G: EnrichmentGateway + Sync,
{
    let platform = adapter.platform();
    let layout = adapter.layout();

    let rows = read_sheet_rows(
        sheet,
        layout,
        settings.start_row,
        settings.max_row,
        &settings.write_retry,
    )
    .await?;

    let snapshot: Vec<SnapshotEntry> = if settings.dry_run {
        (settings.start_row..)
            .zip(rows.iter().cloned())
            .map(|(row_position, row)| SnapshotEntry { row_position, row })
            .collect()
    } else {
        store
            .save_snapshot(platform, &rows, settings.start_row)
            .await
            .map_err(SyncError::snapshot)?;
        store
            .get_snapshot(platform)
            .await
            .map_err(SyncError::snapshot)?
    };
    summary.snapshot_rows = snapshot.len();
    tracing::info!(platform = %platform, rows = snapshot.len(), "snapshot taken");

    summary.growth_candidates = select_growth_candidates(
        adapter,
        scraped,
        &snapshot,
        settings.growth_metric,
        settings.growth_threshold_percent,
    );

    let aliases = store
        .get_title_keys(platform)
        .await
        .map_err(SyncError::snapshot)?;
    let reconciliation = reconcile(
        adapter,
        &snapshot,
        &aliases,
        scraped,
        gateway,
        &settings.enrichment,
    )
    .await;
    log_events(platform, scraped, &reconciliation.events);

    summary.dropped = count_events(&reconciliation.events, |e| {
        matches!(e, ReconcileEvent::Dropped { .. })
    });
    summary.duplicates = count_events(&reconciliation.events, |e| {
        matches!(e, ReconcileEvent::Duplicate { .. })
    });
    summary.enriched = reconciliation.enrichment.enriched;
    summary.fallback = reconciliation.enrichment.fallback;

    let ctx = PlanContext {
        today: settings.today,
        existing_row_count: rows.len(),
    };
    let plan = build_plan(adapter, &reconciliation, &ctx);

    if settings.dry_run {
        summary.updated = plan.updates.len();
        summary.content_updated = plan.content_updates();
        summary.inserted = plan.appends.len();
        tracing::info!(
            platform = %platform,
            updates = summary.updated,
            appends = summary.inserted,
            "dry run: plan built, nothing written"
        );
        return Ok(());
    }

    // Stored before writing: an alias for a title that never landed is inert.
    if !plan.title_aliases.is_empty() {
        store
            .save_title_keys(platform, &plan.title_aliases)
            .await
            .map_err(SyncError::snapshot)?;
    }

    apply_plan(sheet, &plan, &settings.write_retry, summary).await?;

    if !plan.is_empty() {
        format_written_rows(sheet, layout, settings.start_row, rows.len() + summary.inserted)
            .await;
    }

    tracing::info!(
        platform = %platform,
        scraped = summary.scraped,
        updated = summary.updated,
        content_updated = summary.content_updated,
        inserted = summary.inserted,
        dropped = summary.dropped,
        growth_candidates = summary.growth_candidates.len(),
        "sync complete"
    );

    Ok(())
}

/// Writes updates first, then appends. Counts in `summary` only cover writes
/// that went through.
async fn apply_plan<W>(
    sheet: &W,
    plan: &MergePlan,
    retry: &RetryPolicy,
    summary: &mut SyncSummary,
) -> Result<(), SyncError>
where
    W: SheetWriter + Sync,
{
    if !plan.updates.is_empty() {
        let cells = plan.cell_updates();
        retry
            .run_if("write cells", W::is_retriable, || sheet.write_cells(&cells))
            .await
            .map_err(|err| SyncError::sheet_write("update", err))?;
        summary.updated = plan.updates.len();
        summary.content_updated = plan.content_updates();
    }

    if !plan.appends.is_empty() {
        retry
            .run_if("append rows", W::is_retriable, || {
                sheet.append_rows(&plan.appends)
            })
            .await
            .map_err(|err| SyncError::sheet_write("append", err))?;
        summary.inserted = plan.appends.len();
    }

    Ok(())
}

/// Best effort: a formatting failure leaves correct values behind, so it is
/// only logged.
async fn format_written_rows<W>(sheet: &W, layout: &ColumnLayout, start_row: u32, row_count: usize)
where
    W: SheetWriter + Sync,
{
    let Some((first_col, last_col)) = layout.metric_span() else {
        return;
    };
    let Ok(count) = u32::try_from(row_count) else {
        return;
    };
    if count == 0 {
        return;
    }
    let last_row = start_row + count - 1;
    if let Err(err) = sheet
        .format_rows(
            start_row,
            last_row,
            (column_index(first_col), column_index(last_col)),
        )
        .await
    {
        tracing::warn!(error = %err, "failed to format data rows");
    }
}

fn count_events(events: &[ReconcileEvent], pred: impl Fn(&ReconcileEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

fn log_events(platform: Platform, scraped: &[RawRecord], events: &[ReconcileEvent]) {
    for event in events {
        match event {
            ReconcileEvent::Matched {
                index,
                key,
                row_position,
            } => {
                tracing::debug!(platform = %platform, index, ?key, row_position, "matched snapshot row");
            }
            ReconcileEvent::New { index, url } => {
                tracing::debug!(platform = %platform, index, url = url.as_deref().unwrap_or(""), "new post");
            }
            ReconcileEvent::Dropped { index } => {
                let date = scraped.get(*index).map_or("", |r| r.date.as_str());
                tracing::warn!(platform = %platform, index, date, "dropped record without url or caption");
            }
            ReconcileEvent::Duplicate { index, url } => {
                tracing::warn!(platform = %platform, index, url = url.as_deref().unwrap_or(""), "dropped duplicate record");
            }
        }
    }
}
