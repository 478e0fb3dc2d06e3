//! Per-platform snapshot tables: the sheet's content as it stood right before
//! the current run started writing.

use chrono::{DateTime, Utc};
use postsync_core::{Metrics, Platform, SheetRow, SnapshotEntry, SnapshotStore, TitleAlias};
use sqlx::SqlitePool;

use crate::DbError;

/// Columns every snapshot table must carry. A table missing any of them is
/// dropped and recreated.
pub const REQUIRED_COLUMNS: [&str; 12] = [
    "row_num",
    "no",
    "title",
    "describe",
    "format",
    "channel",
    "publish_date",
    "status",
    "url",
    "metrics",
    "note",
    "captured_at",
];

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from a `<platform>_snapshot` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    pub row_num: i64,
    pub no: String,
    pub title: String,
    pub describe: String,
    pub format: String,
    pub channel: String,
    pub publish_date: String,
    pub status: String,
    pub url: String,
    /// JSON object of metric name to integer.
    pub metrics: String,
    pub note: String,
    pub captured_at: DateTime<Utc>,
}

impl SnapshotRow {
    /// Convert into the domain entry.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRowPosition`] if `row_num` does not fit a
    /// sheet row, or [`DbError::Json`] if the metrics column is corrupt.
    pub fn into_entry(self) -> Result<SnapshotEntry, DbError> {
        let row_position =
            u32::try_from(self.row_num).map_err(|_| DbError::InvalidRowPosition(self.row_num))?;
        let metrics: Metrics = if self.metrics.trim().is_empty() {
            Metrics::default()
        } else {
            serde_json::from_str(&self.metrics)?
        };

        Ok(SnapshotEntry {
            row_position,
            row: SheetRow {
                no: self.no,
                title: self.title,
                description: self.describe,
                format: self.format,
                channel: self.channel,
                publish_date: self.publish_date,
                status: self.status,
                url: self.url,
                metrics,
                note: self.note,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Create the platform's snapshot table, recreating it when an older layout
/// is missing required columns.
///
/// Returns `true` when an existing table was dropped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if inspecting or creating the table fails.
pub async fn ensure_schema(pool: &SqlitePool, platform: Platform) -> Result<bool, DbError> {
    let table = platform.snapshot_table();

    let existing: Vec<String> =
        sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?1)")
            .bind(table)
            .fetch_all(pool)
            .await?;

    let mut recreated = false;
    if !existing.is_empty() {
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|col| !existing.iter().any(|c| c == col))
            .collect();

        if !missing.is_empty() {
            tracing::warn!(
                table,
                missing = ?missing,
                "snapshot table is missing columns; recreating"
            );
            sqlx::query(&format!("DROP TABLE {table}"))
                .execute(pool)
                .await?;
            recreated = true;
        }
    }

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (\
            row_num INTEGER PRIMARY KEY, \
            no TEXT NOT NULL DEFAULT '', \
            title TEXT NOT NULL DEFAULT '', \
            describe TEXT NOT NULL DEFAULT '', \
            format TEXT NOT NULL DEFAULT '', \
            channel TEXT NOT NULL DEFAULT '', \
            publish_date TEXT NOT NULL DEFAULT '', \
            status TEXT NOT NULL DEFAULT '', \
            url TEXT NOT NULL DEFAULT '', \
            metrics TEXT NOT NULL DEFAULT '{{}}', \
            note TEXT NOT NULL DEFAULT '', \
            captured_at TEXT NOT NULL\
        )"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (\
            title TEXT PRIMARY KEY, \
            title_key TEXT NOT NULL, \
            updated_at TEXT NOT NULL\
        )",
        platform.title_key_table()
    ))
    .execute(pool)
    .await?;

    Ok(recreated)
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Replace every snapshot entry for `platform` inside one transaction.
///
/// Entries are numbered `start_row, start_row + 1, ...` in slice order. On
/// any failure the previous snapshot is left untouched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement or the commit fails, or
/// [`DbError::Json`] if metrics cannot be serialized.
pub async fn save_snapshot(
    pool: &SqlitePool,
    platform: Platform,
    rows: &[SheetRow],
    start_row: u32,
) -> Result<usize, DbError> {
    let table = platform.snapshot_table();
    let captured_at = Utc::now();
    let insert = format!(
        "INSERT INTO {table} \
         (row_num, no, title, describe, format, channel, publish_date, status, url, metrics, note, captured_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    );

    let mut tx = pool.begin().await?;

    sqlx::query(&format!("DELETE FROM {table}"))
        .execute(&mut *tx)
        .await?;

    for (row_num, row) in (i64::from(start_row)..).zip(rows) {
        let metrics = serde_json::to_string(&row.metrics)?;
        sqlx::query(&insert)
            .bind(row_num)
            .bind(&row.no)
            .bind(&row.title)
            .bind(&row.description)
            .bind(&row.format)
            .bind(&row.channel)
            .bind(&row.publish_date)
            .bind(&row.status)
            .bind(&row.url)
            .bind(metrics)
            .bind(&row.note)
            .bind(captured_at)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::debug!(
        platform = %platform,
        rows = rows.len(),
        start_row,
        "snapshot replaced"
    );

    Ok(rows.len())
}

/// Load every snapshot entry for `platform`, ordered by row position.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or a conversion error from
/// [`SnapshotRow::into_entry`].
pub async fn get_snapshot(
    pool: &SqlitePool,
    platform: Platform,
) -> Result<Vec<SnapshotEntry>, DbError> {
    let table = platform.snapshot_table();
    let rows = sqlx::query_as::<_, SnapshotRow>(&format!(
        "SELECT row_num, no, title, describe, format, channel, publish_date, status, url, \
                metrics, note, captured_at \
         FROM {table} \
         ORDER BY row_num ASC"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(SnapshotRow::into_entry).collect()
}

/// Upsert title aliases for `platform` in one transaction. Aliases with a
/// blank title or key are skipped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement or the commit fails.
pub async fn save_title_keys(
    pool: &SqlitePool,
    platform: Platform,
    aliases: &[TitleAlias],
) -> Result<usize, DbError> {
    let table = platform.title_key_table();
    let updated_at = Utc::now();
    let upsert = format!(
        "INSERT INTO {table} (title, title_key, updated_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT(title) DO UPDATE SET \
         title_key = excluded.title_key, updated_at = excluded.updated_at"
    );

    let mut tx = pool.begin().await?;
    let mut saved = 0;
    for alias in aliases {
        let title = alias.title.trim();
        let title_key = alias.title_key.trim();
        if title.is_empty() || title_key.is_empty() {
            continue;
        }
        sqlx::query(&upsert)
            .bind(title)
            .bind(title_key)
            .bind(updated_at)
            .execute(&mut *tx)
            .await?;
        saved += 1;
    }
    tx.commit().await?;

    tracing::debug!(platform = %platform, saved, "title aliases stored");
    Ok(saved)
}

/// Load every title alias for `platform`, ordered by title.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_title_keys(
    pool: &SqlitePool,
    platform: Platform,
) -> Result<Vec<TitleAlias>, DbError> {
    let rows: Vec<(String, String)> = sqlx::query_as(&format!(
        "SELECT title, title_key FROM {} ORDER BY title ASC",
        platform.title_key_table()
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(title, title_key)| TitleAlias { title, title_key })
        .collect())
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// [`SnapshotStore`] backed by a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    /// Wrap `pool`, making sure every platform's table exists with the
    /// current layout.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if schema setup fails.
    pub async fn init(pool: SqlitePool) -> Result<Self, DbError> {
        for platform in Platform::ALL {
            ensure_schema(&pool, platform).await?;
        }
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    type Error = DbError;

    async fn save_snapshot(
        &self,
        platform: Platform,
        rows: &[SheetRow],
        start_row: u32,
    ) -> Result<usize, DbError> {
        save_snapshot(&self.pool, platform, rows, start_row).await
    }

    async fn get_snapshot(&self, platform: Platform) -> Result<Vec<SnapshotEntry>, DbError> {
        get_snapshot(&self.pool, platform).await
    }

    async fn save_title_keys(
        &self,
        platform: Platform,
        aliases: &[TitleAlias],
    ) -> Result<usize, DbError> {
        save_title_keys(&self.pool, platform, aliases).await
    }

    async fn get_title_keys(&self, platform: Platform) -> Result<Vec<TitleAlias>, DbError> {
        get_title_keys(&self.pool, platform).await
    }
}
