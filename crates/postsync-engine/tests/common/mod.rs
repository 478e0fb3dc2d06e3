//! In-memory collaborators for pipeline tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use postsync_core::{
    CellUpdate, CellValue, EnrichedContent, EnrichmentGateway, MetricKind, MetricValue, Platform,
    RawRecord, SheetRow, SheetWriter, SnapshotEntry, SnapshotStore, TitleAlias,
};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FakeError(pub String);

// ---------------------------------------------------------------------------
// Snapshot store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Platform, Vec<SnapshotEntry>>>,
    aliases: Mutex<HashMap<Platform, BTreeMap<String, String>>>,
    pub saves: AtomicU32,
}

impl MemoryStore {
    pub fn seeded(platform: Platform, entries: Vec<SnapshotEntry>) -> Self {
        let store = Self::default();
        store.tables.lock().unwrap().insert(platform, entries);
        store
    }

    pub fn entries(&self, platform: Platform) -> Vec<SnapshotEntry> {
        self.tables
            .lock()
            .unwrap()
            .get(&platform)
            .cloned()
            .unwrap_or_default()
    }
}

impl SnapshotStore for MemoryStore {
    type Error = FakeError;

    async fn save_snapshot(
        &self,
        platform: Platform,
        rows: &[SheetRow],
        start_row: u32,
    ) -> Result<usize, FakeError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let entries = (start_row..)
            .zip(rows.iter().cloned())
            .map(|(row_position, row)| SnapshotEntry { row_position, row })
            .collect();
        self.tables.lock().unwrap().insert(platform, entries);
        Ok(rows.len())
    }

    async fn get_snapshot(&self, platform: Platform) -> Result<Vec<SnapshotEntry>, FakeError> {
        Ok(self.entries(platform))
    }

    async fn save_title_keys(
        &self,
        platform: Platform,
        aliases: &[TitleAlias],
    ) -> Result<usize, FakeError> {
        let mut tables = self.aliases.lock().unwrap();
        let table = tables.entry(platform).or_default();
        for alias in aliases {
            table.insert(alias.title.clone(), alias.title_key.clone());
        }
        Ok(aliases.len())
    }

    async fn get_title_keys(&self, platform: Platform) -> Result<Vec<TitleAlias>, FakeError> {
        Ok(self
            .aliases
            .lock()
            .unwrap()
            .get(&platform)
            .map(|table| {
                table
                    .iter()
                    .map(|(title, title_key)| TitleAlias {
                        title: title.clone(),
                        title_key: title_key.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Sheet
// ---------------------------------------------------------------------------

/// A grid that behaves like a sheet tab: row 1 is the first element, values
/// are stored as the sheet would display them.
#[derive(Default)]
pub struct MemorySheet {
    grid: Mutex<Vec<Vec<String>>>,
    pub fail_appends: AtomicBool,
    /// Cell writes fail with a permission error that retrying cannot fix.
    pub deny_writes: AtomicBool,
    pub writes: AtomicU32,
    pub appends: AtomicU32,
}

fn column_of(reference: &str) -> (usize, usize) {
    let letters: String = reference.chars().take_while(char::is_ascii_alphabetic).collect();
    let digits: String = reference.chars().skip_while(char::is_ascii_alphabetic).collect();
    let col = letters.chars().next().map_or(0, |c| c as usize - 'A' as usize);
    (col, digits.parse::<usize>().unwrap_or(1))
}

fn display(value: &CellValue) -> String {
    match value {
        CellValue::Number(n) => n.to_string(),
        CellValue::Text(text) => text.strip_prefix('\'').unwrap_or(text).to_string(),
    }
}

impl MemorySheet {
    /// Two header rows followed by `rows`.
    pub fn with_rows(rows: Vec<Vec<&str>>) -> Self {
        let sheet = Self::default();
        {
            let mut grid = sheet.grid.lock().unwrap();
            grid.push(vec!["Report".to_string()]);
            grid.push(vec!["No".to_string(), "Title".to_string()]);
            for row in rows {
                grid.push(row.into_iter().map(str::to_string).collect());
            }
        }
        sheet
    }

    pub fn row(&self, row_number: usize) -> Vec<String> {
        self.grid
            .lock()
            .unwrap()
            .get(row_number - 1)
            .cloned()
            .unwrap_or_default()
    }

    pub fn row_count(&self) -> usize {
        self.grid.lock().unwrap().len()
    }
}

impl SheetWriter for MemorySheet {
    type Error = FakeError;

    fn is_retriable(error: &FakeError) -> bool {
        !error.0.starts_with("403")
    }

    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, FakeError> {
        let (start, end) = range.split_once(':').ok_or_else(|| FakeError(range.into()))?;
        let (_, first_row) = column_of(start);
        let (_, last_row) = column_of(end);
        let grid = self.grid.lock().unwrap();
        let mut rows: Vec<Vec<String>> = grid
            .iter()
            .skip(first_row - 1)
            .take(last_row + 1 - first_row)
            .map(|row| {
                let mut row = row.clone();
                while row.last().is_some_and(String::is_empty) {
                    row.pop();
                }
                row
            })
            .collect();
        while rows.last().is_some_and(Vec::is_empty) {
            rows.pop();
        }
        Ok(rows)
    }

    async fn write_cells(&self, updates: &[CellUpdate]) -> Result<(), FakeError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.deny_writes.load(Ordering::SeqCst) {
            return Err(FakeError("403 caller lacks edit access".to_string()));
        }
        let mut grid = self.grid.lock().unwrap();
        for update in updates {
            let (col, row) = column_of(&update.range);
            if grid.len() < row {
                grid.resize(row, Vec::new());
            }
            let cells = &mut grid[row - 1];
            if cells.len() <= col {
                cells.resize(col + 1, String::new());
            }
            cells[col] = display(&update.value);
        }
        Ok(())
    }

    async fn append_rows(&self, rows: &[Vec<CellValue>]) -> Result<(), FakeError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(FakeError("quota exceeded".to_string()));
        }
        let mut grid = self.grid.lock().unwrap();
        while grid.last().is_some_and(|r| r.iter().all(String::is_empty)) {
            grid.pop();
        }
        for row in rows {
            grid.push(row.iter().map(display).collect());
        }
        Ok(())
    }

    async fn resolve_sheet_id(&self) -> Result<i64, FakeError> {
        Ok(0)
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Titles every caption `"EN: <caption>"` and counts calls.
#[derive(Default)]
pub struct EchoGateway {
    pub calls: AtomicU32,
}

impl EnrichmentGateway for EchoGateway {
    type Error = FakeError;

    async fn enrich(
        &self,
        batch: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, EnrichedContent>, FakeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(batch
            .iter()
            .map(|(id, caption)| {
                (
                    id.clone(),
                    EnrichedContent {
                        title: format!("EN: {caption}"),
                        description: format!("About {caption}"),
                    },
                )
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn tiktok_raw(id: &str, caption: &str, date: &str, views: &str, likes: &str) -> RawRecord {
    let mut metrics = BTreeMap::new();
    metrics.insert(MetricKind::Views, MetricValue::from(views));
    metrics.insert(MetricKind::Likes, MetricValue::from(likes));
    RawRecord {
        url: Some(format!("https://www.tiktok.com/@shop/video/{id}")),
        title: caption.to_string(),
        date: date.to_string(),
        format: None,
        metrics,
    }
}

pub fn facebook_raw(caption: &str, date: &str, views: &str) -> RawRecord {
    let mut metrics = BTreeMap::new();
    metrics.insert(MetricKind::Views, MetricValue::from(views));
    RawRecord {
        url: None,
        title: caption.to_string(),
        date: date.to_string(),
        format: None,
        metrics,
    }
}

pub fn tiktok_row<'a>(
    no: &'a str,
    title: &'a str,
    url: &'a str,
    views: &'a str,
    likes: &'a str,
) -> Vec<&'a str> {
    vec![
        no, title, "", "Video", "TikTok", "4/2", "Published", url, views, likes, "0", "0", "",
    ]
}
