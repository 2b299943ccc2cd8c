//! Remote reveal-status document.
//!
//! The backend answers `GET <status_url>` with a JSON document shaped like
//! [`RemoteStatus`]. Wire names are camelCase; missing fields fall back to
//! documented defaults and unknown fields are ignored, so older and newer
//! backends interoperate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Poll interval used before any response has carried a
/// `config.refreshInterval`.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 60_000;

/// Display-only screen configuration delivered alongside the status.
///
/// None of this carries gate logic except `refresh_interval_ms`, which
/// feeds the poller's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenConfig {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default = "default_message")]
    pub message: String,
    #[serde(default)]
    pub social_links: HashMap<String, String>,
    #[serde(default)]
    pub background_image: Option<String>,
    /// Poll interval in milliseconds.
    #[serde(default = "default_refresh_interval_ms", rename = "refreshInterval")]
    pub refresh_interval_ms: u64,
}

fn default_message() -> String {
    "Coming Soon".into()
}

fn default_refresh_interval_ms() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            subtitle: String::new(),
            message: default_message(),
            social_links: HashMap::new(),
            background_image: None,
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

/// Authoritative reveal state as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStatus {
    #[serde(default)]
    pub is_revealed: bool,
    /// Reveal instant in epoch milliseconds, when the backend knows it.
    #[serde(default)]
    pub reveal_date: Option<u64>,
    /// Remaining time in milliseconds. Display parity only -- the countdown
    /// anchors on `reveal_date` where present, since a relative value does
    /// not survive clock skew.
    #[serde(default, rename = "timeRemaining")]
    pub time_remaining_ms: Option<u64>,
    #[serde(default)]
    pub config: Option<ScreenConfig>,
}

impl RemoteStatus {
    /// Synthetic status applied when a fetch fails.
    ///
    /// An outage must never accidentally reveal the site.
    pub fn fail_closed() -> Self {
        Self {
            is_revealed: false,
            reveal_date: None,
            time_remaining_ms: Some(0),
            config: None,
        }
    }

    /// The poll interval this status asks for, if it carries one.
    pub fn refresh_interval_ms(&self) -> Option<u64> {
        self.config.as_ref().map(|c| c.refresh_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_wire_document() {
        let json = r#"{
            "isRevealed": false,
            "revealDate": 1780000000000,
            "timeRemaining": 86400000,
            "config": {
                "title": "SKAIZ",
                "subtitle": "WORLD",
                "message": "Coming Soon",
                "socialLinks": { "instagram": "https://instagram.com/example" },
                "backgroundImage": "/bg.png",
                "refreshInterval": 30000
            }
        }"#;
        let status: RemoteStatus = serde_json::from_str(json).unwrap();
        assert!(!status.is_revealed);
        assert_eq!(status.reveal_date, Some(1_780_000_000_000));
        assert_eq!(status.time_remaining_ms, Some(86_400_000));
        let config = status.config.unwrap();
        assert_eq!(config.title, "SKAIZ");
        assert_eq!(config.refresh_interval_ms, 30_000);
        assert_eq!(
            config.social_links.get("instagram").map(String::as_str),
            Some("https://instagram.com/example")
        );
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let status: RemoteStatus = serde_json::from_str("{}").unwrap();
        assert!(!status.is_revealed);
        assert!(status.reveal_date.is_none());
        assert!(status.config.is_none());

        let config: ScreenConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.message, "Coming Soon");
        assert_eq!(config.refresh_interval_ms, DEFAULT_REFRESH_INTERVAL_MS);
        assert!(config.social_links.is_empty());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r#"{ "isRevealed": true, "experimental": { "x": 1 } }"#;
        let status: RemoteStatus = serde_json::from_str(json).unwrap();
        assert!(status.is_revealed);
    }

    #[test]
    fn fail_closed_never_reveals() {
        let status = RemoteStatus::fail_closed();
        assert!(!status.is_revealed);
        assert_eq!(status.reveal_date, None);
        assert_eq!(status.time_remaining_ms, Some(0));
        assert!(status.refresh_interval_ms().is_none());
    }
}
