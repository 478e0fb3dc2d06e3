//! Shared domain types, configuration, and collaborator contracts for postsync.
//!
//! Every other crate in the workspace depends on this one. It owns no I/O
//! beyond reading environment variables.

pub mod app_config;
pub mod collaborators;
pub mod config;
pub mod platform;
pub mod records;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, SheetTarget};
pub use collaborators::{EnrichmentGateway, SheetWriter, SnapshotStore};
pub use config::{load_app_config, load_app_config_from_env};
pub use platform::Platform;
pub use records::{
    CellUpdate, CellValue, EnrichedContent, MetricKind, MetricValue, Metrics, PostRecord,
    RawRecord, SheetRow, SnapshotEntry, TitleAlias,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("config validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
}
