//! Reconciliation engine: matches scraped posts against the last snapshot,
//! enriches the ones that need it, and turns the result into sheet writes.

pub mod enrich;
pub mod error;
pub mod growth;
pub mod layout;
pub mod metrics;
pub mod pipeline;
pub mod plan;
pub mod platform;
pub mod recall;
pub mod reconcile;
pub mod retry;

pub use enrich::{enrich_captions, strip_hashtags, EnrichmentPolicy, EnrichmentStats};
pub use error::SyncError;
pub use growth::{
    growth_percent, needs_enrichment, select_growth_candidates, should_scrape_extra_metric,
    GrowthCandidate, DEFAULT_GROWTH_THRESHOLD,
};
pub use layout::{ColumnLayout, FACEBOOK_LAYOUT, TIKTOK_LAYOUT};
pub use metrics::{parse_metric_str, parse_metric_value};
pub use pipeline::{read_sheet_rows, run_platform_sync, SyncFailure, SyncSettings, SyncSummary};
pub use plan::{build_plan, MergePlan, PlanContext, RowUpdate};
pub use platform::{adapter_for, extract_platform_id, FacebookAdapter, PlatformAdapter, TikTokAdapter};
pub use recall::{run_recall, RecallSummary};
pub use reconcile::{
    classify, classify_with_aliases, reconcile, Classification, MatchKey, ReconcileEvent,
    Reconciliation,
};
pub use retry::{Backoff, RetryPolicy};
