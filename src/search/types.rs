// src/search/types.rs
//! Canonical wire types shared by every platform handler, live or mock.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Instagram,
    Eitaa,
    Facebook,
    Telegram,
    Rubika,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Twitter,
        Platform::Instagram,
        Platform::Eitaa,
        Platform::Facebook,
        Platform::Telegram,
        Platform::Rubika,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitter" | "x" => Some(Platform::Twitter),
            "instagram" => Some(Platform::Instagram),
            "eitaa" => Some(Platform::Eitaa),
            "facebook" => Some(Platform::Facebook),
            "telegram" => Some(Platform::Telegram),
            "rubika" => Some(Platform::Rubika),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
            Platform::Eitaa => "eitaa",
            Platform::Facebook => "facebook",
            Platform::Telegram => "telegram",
            Platform::Rubika => "rubika",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub username: String,
    pub display_name: String,
    pub verified: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Engagement {
    pub likes: u64,
    pub shares: u64,
    pub comments: u64,
    pub views: u64,
}

/// One post/message, normalized to the same shape regardless of source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchItem {
    pub id: String,
    pub text: String,
    pub author: Author,
    pub metrics: Engagement,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub platform: Platform,
}

/// Marks whether a result set came from a real integration or the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformData {
    pub results: Vec<SearchItem>,
    pub total: usize,
    pub source: DataSource,
}

/// Per-platform slot in the aggregate: either data or an error string, never
/// a request-level failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PlatformData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlatformResult {
    pub fn ok(data: PlatformData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MultiSearchResponse {
    pub success: bool,
    pub query: String,
    pub platforms: BTreeMap<String, PlatformResult>,
    /// Sum of successful platforms' `data.total`.
    pub total: usize,
}
