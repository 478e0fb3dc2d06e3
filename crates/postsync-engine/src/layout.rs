//! Column layouts of the per-platform sheet tabs.

use postsync_core::{CellValue, MetricKind, Metrics, SheetRow};

use crate::metrics::parse_metric_str;

/// Which column letter holds which field in a platform's tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub no: char,
    pub title: char,
    pub description: char,
    pub format: char,
    pub channel: Option<char>,
    pub publish_date: char,
    pub status: Option<char>,
    pub url: char,
    pub metrics: &'static [(MetricKind, char)],
    pub note: char,
    pub last: char,
}

/// `A No, B Title, C Describe, D Format, E Channel, F Date, G Status, H Link,
/// I View, J Like, K Comment, L Share, M Note`.
pub const TIKTOK_LAYOUT: ColumnLayout = ColumnLayout {
    no: 'A',
    title: 'B',
    description: 'C',
    format: 'D',
    channel: Some('E'),
    publish_date: 'F',
    status: Some('G'),
    url: 'H',
    metrics: &[
        (MetricKind::Views, 'I'),
        (MetricKind::Likes, 'J'),
        (MetricKind::Comments, 'K'),
        (MetricKind::Shares, 'L'),
    ],
    note: 'M',
    last: 'M',
};

/// `A No, B Title, C Describe, D Format, E Date, F Link, G View,
/// H Reach, I Like, J Comment, K Share, L Note`.
pub const FACEBOOK_LAYOUT: ColumnLayout = ColumnLayout {
    no: 'A',
    title: 'B',
    description: 'C',
    format: 'D',
    channel: None,
    publish_date: 'E',
    status: None,
    url: 'F',
    metrics: &[
        (MetricKind::Views, 'G'),
        (MetricKind::Impressions, 'H'),
        (MetricKind::Likes, 'I'),
        (MetricKind::Comments, 'J'),
        (MetricKind::Shares, 'K'),
    ],
    note: 'L',
    last: 'L',
};

/// Zero-based index of a column letter (`'A'` is `0`).
#[must_use]
pub fn column_index(column: char) -> usize {
    (column.to_ascii_uppercase() as usize).saturating_sub('A' as usize)
}

/// A1 reference of a single cell, e.g. `cell_ref('I', 3) == "I3"`.
#[must_use]
pub fn cell_ref(column: char, row: u32) -> String {
    format!("{column}{row}")
}

impl ColumnLayout {
    /// Number of columns from `A` through the last one.
    #[must_use]
    pub fn width(&self) -> usize {
        column_index(self.last) + 1
    }

    /// Range covering every data row, e.g. `A3:M1000`.
    #[must_use]
    pub fn data_range(&self, start_row: u32, max_row: u32) -> String {
        format!("A{start_row}:{}{max_row}", self.last)
    }

    #[must_use]
    pub fn metric_column(&self, kind: MetricKind) -> Option<char> {
        self.metrics
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, column)| *column)
    }

    /// First and last metric column, for number formatting.
    #[must_use]
    pub fn metric_span(&self) -> Option<(char, char)> {
        let first = self.metrics.iter().map(|(_, c)| *c).min()?;
        let last = self.metrics.iter().map(|(_, c)| *c).max()?;
        Some((first, last))
    }

    /// Reads one row of display strings as returned by the sheet.
    ///
    /// Short rows (the API trims trailing blanks) read as empty cells.
    #[must_use]
    pub fn row_from_cells(&self, cells: &[String]) -> SheetRow {
        let get = |column: char| -> String {
            cells
                .get(column_index(column))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        let get_opt = |column: Option<char>| column.map(get).unwrap_or_default();

        let mut metrics = Metrics::new();
        for (kind, column) in self.metrics {
            metrics.set(*kind, parse_metric_str(&get(*column)));
        }

        SheetRow {
            no: get(self.no),
            title: get(self.title),
            description: get(self.description),
            format: get(self.format),
            channel: get_opt(self.channel),
            publish_date: get(self.publish_date),
            status: get_opt(self.status),
            url: get(self.url),
            metrics,
            note: get(self.note),
        }
    }

    /// Lays out a full row for appending; columns without a field stay empty.
    #[must_use]
    pub fn cells_for_row(&self, row: &SheetRow) -> Vec<CellValue> {
        let mut cells = vec![CellValue::Text(String::new()); self.width()];
        let mut put = |column: char, value: CellValue| {
            if let Some(slot) = cells.get_mut(column_index(column)) {
                *slot = value;
            }
        };

        put(self.no, no_cell(&row.no));
        put(self.title, CellValue::from(row.title.clone()));
        put(self.description, CellValue::from(row.description.clone()));
        put(self.format, CellValue::from(row.format.clone()));
        if let Some(column) = self.channel {
            put(column, CellValue::from(row.channel.clone()));
        }
        put(self.publish_date, CellValue::from(row.publish_date.clone()));
        if let Some(column) = self.status {
            put(column, CellValue::from(row.status.clone()));
        }
        put(self.url, CellValue::from(row.url.clone()));
        for (kind, column) in self.metrics {
            put(*column, CellValue::Number(row.metrics.get(*kind)));
        }
        put(self.note, CellValue::from(row.note.clone()));

        cells
    }
}

fn no_cell(no: &str) -> CellValue {
    no.parse::<i64>()
        .map_or_else(|_| CellValue::from(no), CellValue::Number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn column_index_is_zero_based() {
        assert_eq!(column_index('A'), 0);
        assert_eq!(column_index('m'), 12);
    }

    #[test]
    fn data_range_spans_every_column() {
        assert_eq!(TIKTOK_LAYOUT.data_range(3, 1000), "A3:M1000");
        assert_eq!(FACEBOOK_LAYOUT.data_range(3, 1000), "A3:L1000");
    }

    #[test]
    fn tiktok_row_reads_formatted_metrics() {
        let cells = strings(&[
            "1",
            "Morning vlog",
            "A short vlog",
            "Video",
            "TikTok",
            "5/2",
            "Published",
            "https://www.tiktok.com/@a/video/1",
            "12,345",
            "1.2K",
            "",
            "7",
            "Update 06/02",
        ]);
        let row = TIKTOK_LAYOUT.row_from_cells(&cells);
        assert_eq!(row.title, "Morning vlog");
        assert_eq!(row.channel, "TikTok");
        assert_eq!(row.metrics.get(MetricKind::Views), 12_345);
        assert_eq!(row.metrics.get(MetricKind::Likes), 1_200);
        assert_eq!(row.metrics.get(MetricKind::Comments), 0);
        assert_eq!(row.metrics.get(MetricKind::Shares), 7);
        assert_eq!(row.note, "Update 06/02");
    }

    #[test]
    fn short_rows_read_as_blank() {
        let row = FACEBOOK_LAYOUT.row_from_cells(&strings(&["", "Only title"]));
        assert_eq!(row.title, "Only title");
        assert!(row.url.is_empty());
        assert_eq!(row.metrics.get(MetricKind::Impressions), 0);
    }

    #[test]
    fn facebook_reach_column_holds_impressions() {
        assert_eq!(FACEBOOK_LAYOUT.metric_column(MetricKind::Impressions), Some('H'));
        assert_eq!(FACEBOOK_LAYOUT.metric_span(), Some(('G', 'K')));
        assert_eq!(TIKTOK_LAYOUT.metric_span(), Some(('I', 'L')));
    }

    #[test]
    fn cells_for_row_places_values_by_column() {
        let row = SheetRow {
            no: "4".to_string(),
            title: "Title".to_string(),
            format: "Reel".to_string(),
            publish_date: "'5/2".to_string(),
            url: "https://www.facebook.com/reel/9".to_string(),
            metrics: Metrics::new().with(MetricKind::Views, 10),
            note: "Insert 06/02".to_string(),
            ..SheetRow::default()
        };
        let cells = FACEBOOK_LAYOUT.cells_for_row(&row);
        assert_eq!(cells.len(), 12);
        assert_eq!(cells[0], CellValue::Number(4));
        assert_eq!(cells[3], CellValue::from("Reel"));
        assert_eq!(cells[4], CellValue::from("'5/2"));
        assert_eq!(cells[6], CellValue::Number(10));
        assert_eq!(cells[7], CellValue::Number(0));
        assert_eq!(cells[11], CellValue::from("Insert 06/02"));
    }
}
