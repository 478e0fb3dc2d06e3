use std::collections::HashMap;
use std::env::VarError;

use super::*;
use crate::Platform;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with the sheet and AI settings a real run would carry.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("POSTSYNC_DATABASE_URL", "sqlite::memory:");
    m.insert("AI_API_KEY", "sk-test");
    m.insert("GOOGLE_SHEETS_ACCESS_TOKEN", "ya29.test");
    m.insert("TIKTOK_SPREADSHEET_ID", "tiktok-sheet-id");
    m.insert("FB_SPREADSHEET_ID", "fb-sheet-id");
    m
}

#[test]
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "POSTSYNC_ENV"));
}

#[test]
fn build_app_config_uses_defaults_with_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.database_url, "sqlite://.runtime/data/snapshot.db");
    assert_eq!(cfg.db_max_connections, 5);
    assert_eq!(cfg.db_acquire_timeout_secs, 10);
    assert_eq!(cfg.ai_endpoint, "https://api.openai.com/v1/chat/completions");
    assert!(cfg.ai_api_key.is_none());
    assert_eq!(cfg.ai_model, "gpt-4o-mini");
    assert_eq!(cfg.enrich_batch_size, 10);
    assert_eq!(cfg.enrich_retry_delay_secs, 5);
    assert!((cfg.growth_threshold_percent - 5.0).abs() < f64::EPSILON);
    assert_eq!(cfg.sheets_api_base, "https://sheets.googleapis.com");
    assert!(cfg.sheets_access_token.is_none());
    assert_eq!(cfg.tiktok_sheet.sheet_name, "Tiktok");
    assert_eq!(cfg.tiktok_sheet.data_start_row, 3);
    assert_eq!(cfg.facebook_sheet.sheet_name, "Facebook");
    assert_eq!(cfg.facebook_sheet.data_start_row, 3);
    assert_eq!(cfg.sheet_max_row, 1000);
    assert_eq!(cfg.write_max_attempts, 3);
    assert_eq!(cfg.write_retry_delay_ms, 2000);
    assert_eq!(cfg.request_timeout_secs, 30);
}

#[test]
fn build_app_config_reads_sheet_targets() {
    let map = full_env();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(
        cfg.sheet_target(Platform::TikTok).spreadsheet_id.as_deref(),
        Some("tiktok-sheet-id")
    );
    assert_eq!(
        cfg.sheet_target(Platform::Facebook).spreadsheet_id.as_deref(),
        Some("fb-sheet-id")
    );
}

#[test]
fn blank_optional_values_are_treated_as_unset() {
    let mut map = full_env();
    map.insert("AI_API_KEY", "   ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.ai_api_key.is_none());
}

#[test]
fn build_app_config_overrides_threshold_and_batch_size() {
    let mut map = full_env();
    map.insert("POSTSYNC_GROWTH_THRESHOLD_PERCENT", "12.5");
    map.insert("POSTSYNC_ENRICH_BATCH_SIZE", "4");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!((cfg.growth_threshold_percent - 12.5).abs() < f64::EPSILON);
    assert_eq!(cfg.enrich_batch_size, 4);
}

#[test]
fn build_app_config_fails_with_invalid_start_row() {
    let mut map = full_env();
    map.insert("TIKTOK_DATA_START_ROW", "third");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TIKTOK_DATA_START_ROW"),
        "expected InvalidEnvVar(TIKTOK_DATA_START_ROW), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_batch_size() {
    let mut map = full_env();
    map.insert("POSTSYNC_ENRICH_BATCH_SIZE", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("POSTSYNC_ENRICH_BATCH_SIZE")),
        "expected Validation error, got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_negative_threshold() {
    let mut map = full_env();
    map.insert("POSTSYNC_GROWTH_THRESHOLD_PERCENT", "-1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn build_app_config_rejects_zero_start_row() {
    let mut map = full_env();
    map.insert("FB_DATA_START_ROW", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("FB_DATA_START_ROW")),
        "expected Validation error, got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_max_row_below_start_row() {
    let mut map = full_env();
    map.insert("POSTSYNC_SHEET_MAX_ROW", "2");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn debug_output_redacts_secrets() {
    let map = full_env();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("sk-test"));
    assert!(!debug.contains("ya29.test"));
    assert!(debug.contains("[redacted]"));
}
