use crate::Platform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Where one platform's rows live in the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTarget {
    pub spreadsheet_id: Option<String>,
    pub sheet_name: String,
    /// 1-based row of the first data row (rows above are headers).
    pub data_start_row: u32,
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub ai_endpoint: String,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub enrich_batch_size: usize,
    pub enrich_retry_delay_secs: u64,
    pub growth_threshold_percent: f64,
    pub sheets_api_base: String,
    pub sheets_access_token: Option<String>,
    pub tiktok_sheet: SheetTarget,
    pub facebook_sheet: SheetTarget,
    pub sheet_max_row: u32,
    pub write_max_attempts: u32,
    pub write_retry_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    #[must_use]
    pub fn sheet_target(&self, platform: Platform) -> &SheetTarget {
        match platform {
            Platform::TikTok => &self.tiktok_sheet,
            Platform::Facebook => &self.facebook_sheet,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &self.database_url)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("ai_endpoint", &self.ai_endpoint)
            .field("ai_api_key", &self.ai_api_key.as_ref().map(|_| "[redacted]"))
            .field("ai_model", &self.ai_model)
            .field("enrich_batch_size", &self.enrich_batch_size)
            .field("enrich_retry_delay_secs", &self.enrich_retry_delay_secs)
            .field("growth_threshold_percent", &self.growth_threshold_percent)
            .field("sheets_api_base", &self.sheets_api_base)
            .field(
                "sheets_access_token",
                &self.sheets_access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("tiktok_sheet", &self.tiktok_sheet)
            .field("facebook_sheet", &self.facebook_sheet)
            .field("sheet_max_row", &self.sheet_max_row)
            .field("write_max_attempts", &self.write_max_attempts)
            .field("write_retry_delay_ms", &self.write_retry_delay_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
