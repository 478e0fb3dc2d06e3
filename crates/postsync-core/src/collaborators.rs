//! Contracts between the reconciliation engine and the systems it talks to.
//!
//! The engine is generic over these traits; `postsync-db`, `postsync-ai`, and
//! `postsync-sheets` provide the production implementations and tests use
//! in-memory fakes.

use std::collections::BTreeMap;
use std::future::Future;

use crate::{
    CellUpdate, CellValue, EnrichedContent, Platform, SheetRow, SnapshotEntry, TitleAlias,
};

/// Persists the last-known state of every tracked sheet row, per platform.
pub trait SnapshotStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Replace every entry for `platform` with `rows`, assigning
    /// `row_position = start_row + index`. All-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the replacement could not be committed.
    fn save_snapshot(
        &self,
        platform: Platform,
        rows: &[SheetRow],
        start_row: u32,
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send;

    /// All entries for `platform`, ordered by `row_position` ascending.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the read fails.
    fn get_snapshot(
        &self,
        platform: Platform,
    ) -> impl Future<Output = Result<Vec<SnapshotEntry>, Self::Error>> + Send;

    /// Upsert title aliases for `platform`; an alias for an already known
    /// title replaces the old key.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the aliases could not be committed.
    fn save_title_keys(
        &self,
        platform: Platform,
        aliases: &[TitleAlias],
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send;

    /// Every stored title alias for `platform`.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the read fails.
    fn get_title_keys(
        &self,
        platform: Platform,
    ) -> impl Future<Output = Result<Vec<TitleAlias>, Self::Error>> + Send;
}

/// Turns raw captions into a clean title and description.
///
/// Keys of the request are caller-chosen local ids; the response uses the
/// same keys. A key may be missing from the response.
pub trait EnrichmentGateway {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns the gateway's error when the whole batch failed.
    fn enrich(
        &self,
        batch: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<BTreeMap<String, EnrichedContent>, Self::Error>> + Send;
}

/// Reads and writes one spreadsheet tab.
pub trait SheetWriter {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether a failed call is worth repeating. Writers that can tell
    /// permanent failures (bad credentials, malformed requests) apart
    /// override this.
    fn is_retriable(error: &Self::Error) -> bool {
        let _ = error;
        true
    }

    /// Read an A1 range (without the tab name) as rows of display strings.
    ///
    /// # Errors
    ///
    /// Returns the writer's error when the read fails.
    fn read_range(
        &self,
        range: &str,
    ) -> impl Future<Output = Result<Vec<Vec<String>>, Self::Error>> + Send;

    /// # Errors
    ///
    /// Returns the writer's error when the write fails.
    fn write_cells(
        &self,
        updates: &[CellUpdate],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Append rows after the last occupied row of the tab.
    ///
    /// # Errors
    ///
    /// Returns the writer's error when the append fails.
    fn append_rows(
        &self,
        rows: &[Vec<CellValue>],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Numeric id of the tab, needed for formatting requests.
    ///
    /// # Errors
    ///
    /// Returns the writer's error when the tab cannot be found.
    fn resolve_sheet_id(&self) -> impl Future<Output = Result<i64, Self::Error>> + Send;

    /// Normalize presentation of data rows `first_row..=last_row` (1-based):
    /// plain weight text and `#,##0` on the zero-based, inclusive
    /// `number_columns` span. Writers without formatting support do nothing.
    ///
    /// # Errors
    ///
    /// Returns the writer's error when the formatting request fails.
    fn format_rows(
        &self,
        first_row: u32,
        last_row: u32,
        number_columns: (usize, usize),
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let _ = (first_row, last_row, number_columns);
        async { Ok(()) }
    }
}
