//! Sync, growth, and recall command handlers.
//!
//! These are called from `main` after config and the snapshot store are
//! established. A failed sync still prints the summary of what completed
//! before the error is returned.

use std::path::Path;

use anyhow::Context;
use chrono::Local;
use postsync_ai::OpenAiGateway;
use postsync_core::{AppConfig, Platform, SnapshotStore};
use postsync_db::SqliteSnapshotStore;
use postsync_engine::{
    adapter_for, run_platform_sync, run_recall, select_growth_candidates, EnrichmentPolicy,
    RetryPolicy, SyncSettings, SyncSummary,
};
use postsync_sheets::{SheetsClient, SheetsConfig};

use crate::input::load_records;

fn sheets_client(config: &AppConfig, platform: Platform) -> anyhow::Result<SheetsClient> {
    let sheets_config = SheetsConfig::from_app_config(config, platform)?;
    Ok(SheetsClient::new(sheets_config)?)
}

fn print_summary(summary: &SyncSummary) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

/// Reconcile a scraper backup into the platform's sheet.
///
/// # Errors
///
/// Returns an error if the input cannot be loaded, a client cannot be built,
/// or the run aborts on a sheet or snapshot failure.
pub(crate) async fn run_sync(
    config: &AppConfig,
    store: &SqliteSnapshotStore,
    platform: Platform,
    input: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let records = load_records(input)?;
    let sheet = sheets_client(config, platform)?;
    let gateway = OpenAiGateway::from_app_config(config)?;

    let settings = SyncSettings {
        dry_run,
        ..SyncSettings::from_app_config(config, platform, Local::now().date_naive())
    };

    if dry_run {
        println!("[dry-run] planning {platform} sync of {} records", records.len());
    }

    match run_platform_sync(
        adapter_for(platform),
        store,
        &sheet,
        &gateway,
        &records,
        &settings,
    )
    .await
    {
        Ok(summary) => print_summary(&summary),
        Err(failure) => {
            print_summary(&failure.summary)?;
            Err(anyhow::Error::new(failure.error).context(format!("{platform} sync failed")))
        }
    }
}

/// Print the posts whose tracked metric grew enough to warrant a follow-up
/// scrape, compared with the stored snapshot.
///
/// # Errors
///
/// Returns an error if the input cannot be loaded or the snapshot read fails.
pub(crate) async fn run_growth(
    config: &AppConfig,
    store: &SqliteSnapshotStore,
    platform: Platform,
    input: &Path,
    threshold: Option<f64>,
) -> anyhow::Result<()> {
    let records = load_records(input)?;
    let snapshot = store
        .get_snapshot(platform)
        .await
        .with_context(|| format!("failed to read {platform} snapshot"))?;

    let settings = SyncSettings::from_app_config(config, platform, Local::now().date_naive());
    let threshold = threshold.unwrap_or(settings.growth_threshold_percent);
    if !threshold.is_finite() || threshold < 0.0 {
        anyhow::bail!("--threshold must be a non-negative number, got {threshold}");
    }

    let candidates = select_growth_candidates(
        adapter_for(platform),
        &records,
        &snapshot,
        settings.growth_metric,
        threshold,
    );

    if snapshot.is_empty() {
        tracing::warn!(platform = %platform, "snapshot is empty; every post counts as new");
    }
    println!("{}", serde_json::to_string_pretty(&candidates)?);
    Ok(())
}

/// Fill in missing titles and descriptions for rows already in the sheet.
///
/// # Errors
///
/// Returns an error if a client cannot be built or the sheet read/write fails.
pub(crate) async fn run_recall_command(config: &AppConfig, platform: Platform) -> anyhow::Result<()> {
    let sheet = sheets_client(config, platform)?;
    let gateway = OpenAiGateway::from_app_config(config)?;
    let start_row = config.sheet_target(platform).data_start_row;

    let summary = run_recall(
        adapter_for(platform),
        &sheet,
        &gateway,
        start_row,
        config.sheet_max_row,
        &EnrichmentPolicy::from_app_config(config),
        &RetryPolicy::from_app_config(config),
    )
    .await
    .with_context(|| format!("{platform} recall failed"))?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
