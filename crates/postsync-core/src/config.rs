use std::str::FromStr;

use crate::app_config::{AppConfig, Environment, SheetTarget};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value fails to parse or validate.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value fails to parse or validate.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Blank values are treated as unset so a `.env` line like `AI_API_KEY=`
    // does not produce `Some("")`.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse = |var: &str, default: &str| -> Result<u64, ConfigError> {
        parse_value::<u64>(var, &or_default(var, default))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        parse_value::<u32>(var, &or_default(var, default))
    };

    let env = parse_environment(&or_default("POSTSYNC_ENV", "development"))?;
    let log_level = or_default("POSTSYNC_LOG_LEVEL", "info");

    let database_url = or_default("POSTSYNC_DATABASE_URL", "sqlite://.runtime/data/snapshot.db");
    let db_max_connections = parse_u32("POSTSYNC_DB_MAX_CONNECTIONS", "5")?;
    let db_acquire_timeout_secs = parse("POSTSYNC_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let ai_endpoint = or_default(
        "AI_API_ENDPOINT",
        "https://api.openai.com/v1/chat/completions",
    );
    let ai_api_key = optional("AI_API_KEY");
    let ai_model = or_default("AI_API_MODEL", "gpt-4o-mini");

    let enrich_batch_size = parse_value::<usize>(
        "POSTSYNC_ENRICH_BATCH_SIZE",
        &or_default("POSTSYNC_ENRICH_BATCH_SIZE", "10"),
    )?;
    let enrich_retry_delay_secs = parse("POSTSYNC_ENRICH_RETRY_DELAY_SECS", "5")?;
    let growth_threshold_percent = parse_value::<f64>(
        "POSTSYNC_GROWTH_THRESHOLD_PERCENT",
        &or_default("POSTSYNC_GROWTH_THRESHOLD_PERCENT", "5"),
    )?;

    let sheets_api_base = or_default("GOOGLE_SHEETS_API_BASE", "https://sheets.googleapis.com");
    let sheets_access_token = optional("GOOGLE_SHEETS_ACCESS_TOKEN");

    let tiktok_sheet = SheetTarget {
        spreadsheet_id: optional("TIKTOK_SPREADSHEET_ID"),
        sheet_name: or_default("TIKTOK_SHEET_NAME", "Tiktok"),
        data_start_row: parse_u32("TIKTOK_DATA_START_ROW", "3")?,
    };
    let facebook_sheet = SheetTarget {
        spreadsheet_id: optional("FB_SPREADSHEET_ID"),
        sheet_name: or_default("FB_SHEET_NAME", "Facebook"),
        data_start_row: parse_u32("FB_DATA_START_ROW", "3")?,
    };

    let sheet_max_row = parse_u32("POSTSYNC_SHEET_MAX_ROW", "1000")?;
    let write_max_attempts = parse_u32("POSTSYNC_WRITE_MAX_ATTEMPTS", "3")?;
    let write_retry_delay_ms = parse("POSTSYNC_WRITE_RETRY_DELAY_MS", "2000")?;
    let request_timeout_secs = parse("POSTSYNC_REQUEST_TIMEOUT_SECS", "30")?;

    let config = AppConfig {
        env,
        log_level,
        database_url,
        db_max_connections,
        db_acquire_timeout_secs,
        ai_endpoint,
        ai_api_key,
        ai_model,
        enrich_batch_size,
        enrich_retry_delay_secs,
        growth_threshold_percent,
        sheets_api_base,
        sheets_access_token,
        tiktok_sheet,
        facebook_sheet,
        sheet_max_row,
        write_max_attempts,
        write_retry_delay_ms,
        request_timeout_secs,
    };

    validate(&config)?;
    Ok(config)
}

fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "POSTSYNC_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.db_max_connections == 0 {
        return Err(ConfigError::Validation(
            "POSTSYNC_DB_MAX_CONNECTIONS must be at least 1".to_string(),
        ));
    }
    if config.enrich_batch_size == 0 {
        return Err(ConfigError::Validation(
            "POSTSYNC_ENRICH_BATCH_SIZE must be at least 1".to_string(),
        ));
    }
    if !config.growth_threshold_percent.is_finite() || config.growth_threshold_percent < 0.0 {
        return Err(ConfigError::Validation(format!(
            "POSTSYNC_GROWTH_THRESHOLD_PERCENT must be a non-negative number, got {}",
            config.growth_threshold_percent
        )));
    }
    if config.write_max_attempts == 0 {
        return Err(ConfigError::Validation(
            "POSTSYNC_WRITE_MAX_ATTEMPTS must be at least 1".to_string(),
        ));
    }
    for (label, target) in [
        ("TIKTOK_DATA_START_ROW", &config.tiktok_sheet),
        ("FB_DATA_START_ROW", &config.facebook_sheet),
    ] {
        if target.data_start_row == 0 {
            return Err(ConfigError::Validation(format!(
                "{label} is 1-based and must be at least 1"
            )));
        }
        if config.sheet_max_row < target.data_start_row {
            return Err(ConfigError::Validation(format!(
                "POSTSYNC_SHEET_MAX_ROW ({}) is below {label} ({})",
                config.sheet_max_row, target.data_start_row
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
