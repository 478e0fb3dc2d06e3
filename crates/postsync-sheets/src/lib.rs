//! Google Sheets v4 implementation of [`postsync_core::SheetWriter`].

pub mod client;
pub mod error;
pub mod format;

pub use client::{SheetsClient, SheetsConfig};
pub use error::SheetsError;
pub use format::{format_requests, NUMBER_PATTERN};
