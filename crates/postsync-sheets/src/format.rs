//! `spreadsheets:batchUpdate` request bodies for data-row formatting.

use serde_json::{json, Value};

pub const NUMBER_PATTERN: &str = "#,##0";

/// Requests that clear bold text on rows `first_row..=last_row` (1-based)
/// and apply [`NUMBER_PATTERN`] to every column in `number_columns`
/// (zero-based, inclusive).
#[must_use]
pub fn format_requests(
    sheet_id: i64,
    first_row: u32,
    last_row: u32,
    number_columns: (usize, usize),
) -> Value {
    let start_row = first_row.saturating_sub(1);
    let mut requests = vec![json!({
        "repeatCell": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": start_row,
                "endRowIndex": last_row,
            },
            "cell": { "userEnteredFormat": { "textFormat": { "bold": false } } },
            "fields": "userEnteredFormat.textFormat.bold",
        }
    })];

    let (first_col, last_col) = number_columns;
    for column in first_col..=last_col {
        requests.push(json!({
            "repeatCell": {
                "range": {
                    "sheetId": sheet_id,
                    "startRowIndex": start_row,
                    "endRowIndex": last_row,
                    "startColumnIndex": column,
                    "endColumnIndex": column + 1,
                },
                "cell": {
                    "userEnteredFormat": {
                        "numberFormat": { "type": "NUMBER", "pattern": NUMBER_PATTERN }
                    }
                },
                "fields": "userEnteredFormat.numberFormat",
            }
        }));
    }

    json!({ "requests": requests })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_bold_request_then_one_per_number_column() {
        let body = format_requests(42, 3, 10, (8, 11));
        let requests = body["requests"].as_array().unwrap();

        assert_eq!(requests.len(), 5);
        let bold = &requests[0]["repeatCell"];
        assert_eq!(bold["range"]["sheetId"], 42);
        assert_eq!(bold["range"]["startRowIndex"], 2);
        assert_eq!(bold["range"]["endRowIndex"], 10);
        assert!(bold["range"].get("startColumnIndex").is_none());
        assert_eq!(bold["cell"]["userEnteredFormat"]["textFormat"]["bold"], false);
    }

    #[test]
    fn number_format_covers_each_column_once() {
        let body = format_requests(0, 3, 3, (6, 10));
        let columns: Vec<u64> = body["requests"].as_array().unwrap()[1..]
            .iter()
            .map(|r| r["repeatCell"]["range"]["startColumnIndex"].as_u64().unwrap())
            .collect();

        assert_eq!(columns, vec![6, 7, 8, 9, 10]);
        assert_eq!(
            body["requests"][1]["repeatCell"]["cell"]["userEnteredFormat"]["numberFormat"]["pattern"],
            "#,##0"
        );
    }
}
