//! Google Sheets v4 REST client for one spreadsheet tab.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use postsync_core::{AppConfig, CellUpdate, CellValue, Platform, SheetWriter};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::error::SheetsError;
use crate::format::format_requests;

/// Path-segment encoding: everything but unreserved characters.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Where the client points and how it authenticates.
#[derive(Clone)]
pub struct SheetsConfig {
    /// Scheme and host, e.g. `https://sheets.googleapis.com`.
    pub api_base: String,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for SheetsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsConfig")
            .field("api_base", &self.api_base)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("sheet_name", &self.sheet_name)
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SheetsConfig {
    /// # Errors
    ///
    /// Returns [`SheetsError::NotConfigured`] when `platform` has no
    /// spreadsheet id.
    pub fn from_app_config(config: &AppConfig, platform: Platform) -> Result<Self, SheetsError> {
        let target = config.sheet_target(platform);
        let spreadsheet_id = target
            .spreadsheet_id
            .clone()
            .ok_or(SheetsError::NotConfigured(match platform {
                Platform::TikTok => "TIKTOK_SPREADSHEET_ID",
                Platform::Facebook => "FB_SPREADSHEET_ID",
            }))?;

        Ok(Self {
            api_base: config.sheets_api_base.clone(),
            spreadsheet_id,
            sheet_name: target.sheet_name.clone(),
            access_token: config.sheets_access_token.clone(),
            timeout_secs: config.request_timeout_secs,
        })
    }
}

/// Reads and writes one tab. The tab's numeric id is looked up once and
/// cached for formatting requests.
pub struct SheetsClient {
    client: Client,
    config: SheetsConfig,
    sheet_id: OnceCell<i64>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Serialize)]
struct BatchUpdateValues<'a> {
    #[serde(rename = "valueInputOption")]
    value_input_option: &'a str,
    data: Vec<RangeValues<'a>>,
}

#[derive(Serialize)]
struct RangeValues<'a> {
    range: String,
    values: [[&'a CellValue; 1]; 1],
}

#[derive(Serialize)]
struct AppendValues<'a> {
    values: &'a [Vec<CellValue>],
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    #[serde(rename = "sheetId", default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
}

fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl SheetsClient {
    /// # Errors
    ///
    /// Returns [`SheetsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: SheetsConfig) -> Result<Self, SheetsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("postsync/0.1 (metrics-sync)")
            .build()?;

        Ok(Self {
            client,
            config,
            sheet_id: OnceCell::new(),
        })
    }

    #[must_use]
    pub fn sheet_name(&self) -> &str {
        &self.config.sheet_name
    }

    /// `'Tab name'!A3:M1000`, quoted so names with spaces work.
    fn qualified(&self, range: &str) -> String {
        format!("'{}'!{range}", self.config.sheet_name.replace('\'', "''"))
    }

    fn spreadsheet_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}",
            self.config.api_base.trim_end_matches('/'),
            utf8_percent_encode(&self.config.spreadsheet_id, SEGMENT)
        )
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            utf8_percent_encode(&self.qualified(range), SEGMENT)
        )
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<Response, SheetsError> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SheetsError::Status {
            operation,
            status: status.as_u16(),
            body,
        })
    }

    async fn json<T: DeserializeOwned>(
        response: Response,
        context: &'static str,
    ) -> Result<T, SheetsError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| SheetsError::Deserialize { context, source })
    }

    async fn fetch_sheet_id(&self) -> Result<i64, SheetsError> {
        let url = format!("{}?fields=sheets.properties", self.spreadsheet_url());
        let response = self.send("spreadsheets.get", self.client.get(&url)).await?;
        let meta: SpreadsheetMeta = Self::json(response, "spreadsheets.get").await?;

        meta.sheets
            .into_iter()
            .find(|sheet| sheet.properties.title == self.config.sheet_name)
            .map(|sheet| sheet.properties.sheet_id)
            .ok_or_else(|| SheetsError::SheetNotFound(self.config.sheet_name.clone()))
    }
}

impl SheetWriter for SheetsClient {
    type Error = SheetsError;

    fn is_retriable(error: &SheetsError) -> bool {
        error.is_retriable()
    }

    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.values_url(range);
        let response = self.send("values.get", self.client.get(&url)).await?;
        let body: ValueRange = Self::json(response, "values.get").await?;

        Ok(body
            .values
            .iter()
            .map(|row| row.iter().map(display_string).collect())
            .collect())
    }

    async fn write_cells(&self, updates: &[CellUpdate]) -> Result<(), SheetsError> {
        if updates.is_empty() {
            return Ok(());
        }
        let body = BatchUpdateValues {
            value_input_option: "USER_ENTERED",
            data: updates
                .iter()
                .map(|update| RangeValues {
                    range: self.qualified(&update.range),
                    values: [[&update.value]],
                })
                .collect(),
        };

        let url = format!("{}/values:batchUpdate", self.spreadsheet_url());
        self.send("values.batchUpdate", self.client.post(&url).json(&body))
            .await?;
        tracing::debug!(sheet = %self.config.sheet_name, cells = updates.len(), "cells written");
        Ok(())
    }

    async fn append_rows(&self, rows: &[Vec<CellValue>]) -> Result<(), SheetsError> {
        if rows.is_empty() {
            return Ok(());
        }
        let url = format!(
            "{}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
            self.values_url("A:A")
        );
        self.send(
            "values.append",
            self.client.post(&url).json(&AppendValues { values: rows }),
        )
        .await?;
        tracing::debug!(sheet = %self.config.sheet_name, rows = rows.len(), "rows appended");
        Ok(())
    }

    async fn resolve_sheet_id(&self) -> Result<i64, SheetsError> {
        self.sheet_id
            .get_or_try_init(|| self.fetch_sheet_id())
            .await
            .copied()
    }

    async fn format_rows(
        &self,
        first_row: u32,
        last_row: u32,
        number_columns: (usize, usize),
    ) -> Result<(), SheetsError> {
        let sheet_id = self.resolve_sheet_id().await?;
        let body = format_requests(sheet_id, first_row, last_row, number_columns);
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        self.send("spreadsheets.batchUpdate", self.client.post(&url).json(&body))
            .await?;
        Ok(())
    }
}
