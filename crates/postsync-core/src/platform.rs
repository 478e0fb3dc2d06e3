use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A social network whose post metrics are tracked in its own sheet tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    TikTok,
    Facebook,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::TikTok, Platform::Facebook];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok",
            Platform::Facebook => "facebook",
        }
    }

    /// Name of the snapshot table holding this platform's rows.
    #[must_use]
    pub fn snapshot_table(self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok_snapshot",
            Platform::Facebook => "facebook_snapshot",
        }
    }

    /// Name of the table mapping written titles back to caption title keys.
    #[must_use]
    pub fn title_key_table(self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok_title_keys",
            Platform::Facebook => "facebook_title_keys",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tiktok" => Ok(Platform::TikTok),
            "facebook" | "fb" => Ok(Platform::Facebook),
            other => Err(CoreError::UnknownPlatform(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_platform_names_case_insensitively() {
        assert_eq!("TikTok".parse::<Platform>().unwrap(), Platform::TikTok);
        assert_eq!("facebook".parse::<Platform>().unwrap(), Platform::Facebook);
        assert_eq!(" fb ".parse::<Platform>().unwrap(), Platform::Facebook);
    }

    #[test]
    fn rejects_unknown_platform() {
        let err = "zalo".parse::<Platform>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownPlatform(ref p) if p == "zalo"));
    }

    #[test]
    fn snapshot_tables_are_distinct() {
        assert_ne!(
            Platform::TikTok.snapshot_table(),
            Platform::Facebook.snapshot_table()
        );
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Platform::TikTok).unwrap();
        assert_eq!(json, "\"tiktok\"");
    }
}
