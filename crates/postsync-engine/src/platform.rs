//! Per-platform capabilities: id extraction, date handling, and column layout.
//!
//! The reconciliation engine is written once against [`PlatformAdapter`];
//! adding a platform means adding an adapter here.

use std::sync::LazyLock;

use chrono::NaiveDate;
use postsync_core::Platform;
use regex::Regex;

use crate::layout::{ColumnLayout, FACEBOOK_LAYOUT, TIKTOK_LAYOUT};

pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Platform-specific post id from a permalink, `None` when no pattern
    /// matches.
    fn extract_id(&self, url: &str) -> Option<String>;

    /// Sortable form of a raw scraped date; `0` when it does not parse.
    fn date_sort_key(&self, raw: &str) -> i64;

    /// `d/m` display form of a raw scraped date. Unrecognized text is
    /// returned unchanged.
    fn format_date(&self, raw: &str) -> String;

    fn layout(&self) -> &'static ColumnLayout;

    /// Number of characters of the stripped caption used as a match key.
    fn title_key_len(&self) -> usize;

    /// Format written for new rows when the scraper did not report one.
    fn default_format(&self) -> &'static str;

    /// Value of the channel column, for layouts that have one.
    fn channel(&self) -> &'static str;
}

#[must_use]
pub fn adapter_for(platform: Platform) -> &'static dyn PlatformAdapter {
    match platform {
        Platform::TikTok => &TikTokAdapter,
        Platform::Facebook => &FacebookAdapter,
    }
}

/// Extract a post id using `platform`'s ordered pattern list.
#[must_use]
pub fn extract_platform_id(url: &str, platform: Platform) -> Option<String> {
    adapter_for(platform).extract_id(url)
}

fn first_capture(patterns: &[Regex], url: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

// ---------------------------------------------------------------------------
// TikTok
// ---------------------------------------------------------------------------

static TIKTOK_ID_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| vec![Regex::new(r"video/(\d+)").expect("valid tiktok id regex")]);

/// `"Feb 5, 10:38 PM"`: only month and day are present.
static TIKTOK_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+(\d+)")
        .expect("valid tiktok date regex")
});

#[derive(Debug, Clone, Copy, Default)]
pub struct TikTokAdapter;

impl TikTokAdapter {
    fn month_day(raw: &str) -> Option<(u32, u32)> {
        let caps = TIKTOK_DATE.captures(raw.trim())?;
        let month = match &caps[1] {
            "Jan" => 1,
            "Feb" => 2,
            "Mar" => 3,
            "Apr" => 4,
            "May" => 5,
            "Jun" => 6,
            "Jul" => 7,
            "Aug" => 8,
            "Sep" => 9,
            "Oct" => 10,
            "Nov" => 11,
            _ => 12,
        };
        let day = caps[2].parse::<u32>().ok()?;
        Some((month, day))
    }
}

impl PlatformAdapter for TikTokAdapter {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    fn extract_id(&self, url: &str) -> Option<String> {
        first_capture(&TIKTOK_ID_PATTERNS, url)
    }

    fn date_sort_key(&self, raw: &str) -> i64 {
        Self::month_day(raw).map_or(0, |(month, day)| i64::from(month * 100 + day))
    }

    fn format_date(&self, raw: &str) -> String {
        match Self::month_day(raw) {
            Some((month, day)) => format!("{day}/{month}"),
            None => raw.trim().to_string(),
        }
    }

    fn layout(&self) -> &'static ColumnLayout {
        &TIKTOK_LAYOUT
    }

    fn title_key_len(&self) -> usize {
        50
    }

    fn default_format(&self) -> &'static str {
        "Video"
    }

    fn channel(&self) -> &'static str {
        "TikTok"
    }
}

// ---------------------------------------------------------------------------
// Facebook
// ---------------------------------------------------------------------------

static FACEBOOK_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"posts/(pfbid[A-Za-z0-9]+)",
        r"reel/(\d+)",
        r"watch\?v=(\d+)",
        r"videos/(\d+)",
        r"story_fbid=(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid facebook id regex"))
    .collect()
});

/// `"MM/DD/YYYY HH:MM"`.
static FACEBOOK_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2})/(\d{2})/(\d{4})(?:\s+(\d{2}):(\d{2}))?")
        .expect("valid facebook date regex")
});

#[derive(Debug, Clone, Copy, Default)]
pub struct FacebookAdapter;

impl FacebookAdapter {
    fn parts(raw: &str) -> Option<(u32, u32, i32, Option<(u32, u32)>)> {
        let caps = FACEBOOK_DATE.captures(raw.trim())?;
        let month = caps[1].parse().ok()?;
        let day = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        let time = match (caps.get(4), caps.get(5)) {
            (Some(h), Some(m)) => Some((h.as_str().parse().ok()?, m.as_str().parse().ok()?)),
            _ => None,
        };
        Some((month, day, year, time))
    }
}

impl PlatformAdapter for FacebookAdapter {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    fn extract_id(&self, url: &str) -> Option<String> {
        first_capture(&FACEBOOK_ID_PATTERNS, url)
    }

    /// Milliseconds since the epoch; a date without a time sorts as midnight.
    fn date_sort_key(&self, raw: &str) -> i64 {
        let Some((month, day, year, time)) = Self::parts(raw) else {
            return 0;
        };
        let (hour, minute) = time.unwrap_or((0, 0));
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .map_or(0, |dt| dt.and_utc().timestamp_millis())
    }

    fn format_date(&self, raw: &str) -> String {
        match Self::parts(raw) {
            Some((month, day, _, _)) => format!("{day}/{month}"),
            None => raw.trim().to_string(),
        }
    }

    fn layout(&self) -> &'static ColumnLayout {
        &FACEBOOK_LAYOUT
    }

    fn title_key_len(&self) -> usize {
        80
    }

    fn default_format(&self) -> &'static str {
        "Post"
    }

    fn channel(&self) -> &'static str {
        "Facebook"
    }
}
