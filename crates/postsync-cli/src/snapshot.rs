//! Read-only snapshot and database commands.

use anyhow::Context;
use postsync_core::{MetricKind, Platform, SnapshotStore};
use postsync_db::SqliteSnapshotStore;

/// Print the stored snapshot for `platform` as a table.
///
/// # Errors
///
/// Returns an error if the snapshot read fails.
pub(crate) async fn run_snapshot_show(
    store: &SqliteSnapshotStore,
    platform: Platform,
) -> anyhow::Result<()> {
    let entries = store
        .get_snapshot(platform)
        .await
        .with_context(|| format!("failed to read {platform} snapshot"))?;

    if entries.is_empty() {
        println!("no snapshot stored for {platform}; run `sync` first");
        return Ok(());
    }

    println!(
        "{:<5}{:<6}{:<42}{:<8}{:>10}{:>8}  URL",
        "ROW", "NO", "TITLE", "DATE", "VIEWS", "LIKES"
    );
    for entry in &entries {
        let row = &entry.row;
        let title = if row.title.chars().count() > 40 {
            format!("{}...", row.title.chars().take(37).collect::<String>())
        } else {
            row.title.clone()
        };
        println!(
            "{:<5}{:<6}{:<42}{:<8}{:>10}{:>8}  {}",
            entry.row_position,
            row.no,
            title,
            row.publish_date,
            row.metrics.get(MetricKind::Views),
            row.metrics.get(MetricKind::Likes),
            row.url
        );
    }
    println!("{} rows", entries.len());

    Ok(())
}

/// # Errors
///
/// Returns an error if the database does not answer.
pub(crate) async fn run_db_ping(store: &SqliteSnapshotStore) -> anyhow::Result<()> {
    postsync_db::health_check(store.pool()).await?;
    println!("database ok");
    Ok(())
}
