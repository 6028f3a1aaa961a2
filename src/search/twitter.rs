// src/search/twitter.rs
//! Live Twitter/X recent-search client.
//!
//! The only platform with a genuine outbound integration. Bearer tokens come
//! from the rotation registry: a 401/429 rotates the cursor and retries with
//! the next credential, bounded by the pool size.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::keys::{KeyRegistry, Service};
use crate::search::types::{Author, DataSource, Engagement, Platform, PlatformData, SearchItem};

pub const TWITTER_API_BASE: &str = "https://api.twitter.com";

/// The recent-search endpoint accepts 10..=100 results per request.
pub const LIVE_MIN_COUNT: usize = 10;
pub const LIVE_MAX_COUNT: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum TwitterError {
    #[error("no Twitter credentials configured")]
    NoCredentials,
    #[error("all {0} Twitter credentials rejected or rate-limited")]
    CredentialsExhausted(usize),
    #[error("Twitter API returned status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct TwitterClient {
    http: reqwest::Client,
    base_url: String,
}

impl TwitterClient {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .connect_timeout(Duration::from_secs(4))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: TWITTER_API_BASE.to_string(),
        })
    }

    /// Points the client at a different host; used by tests with a local
    /// mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Runs a recent search, rotating through the credential pool on 401/429.
    pub async fn search(
        &self,
        keys: &KeyRegistry,
        query: &str,
        count: usize,
    ) -> Result<PlatformData, TwitterError> {
        let attempts = keys.pool_size(Service::Twitter);
        if attempts == 0 {
            return Err(TwitterError::NoCredentials);
        }

        let max_results = count.clamp(LIVE_MIN_COUNT, LIVE_MAX_COUNT);
        let url = format!("{}/2/tweets/search/recent", self.base_url);
        let params = [
            ("query", query.to_string()),
            ("max_results", max_results.to_string()),
            (
                "tweet.fields",
                "created_at,public_metrics,author_id".to_string(),
            ),
            ("expansions", "author_id".to_string()),
            ("user.fields", "username,name,verified".to_string()),
        ];

        for _ in 0..attempts {
            let Some(token) = keys.current(Service::Twitter).map(str::to_owned) else {
                return Err(TwitterError::NoCredentials);
            };

            let resp = self
                .http
                .get(&url)
                .bearer_auth(&token)
                .query(&params)
                .send()
                .await?;

            let status = resp.status();
            if status.as_u16() == 401 || status.as_u16() == 429 {
                warn!(status = status.as_u16(), "Twitter credential rejected, rotating");
                keys.rotate(Service::Twitter);
                continue;
            }
            if !status.is_success() {
                return Err(TwitterError::Status(status.as_u16()));
            }

            let body: RecentSearchResponse = resp.json().await?;
            return Ok(normalize(body));
        }

        Err(TwitterError::CredentialsExhausted(attempts))
    }
}

// --- Twitter API v2 wire shapes ---

#[derive(Debug, Deserialize)]
struct RecentSearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Option<Includes>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    public_metrics: Option<TweetMetrics>,
}

#[derive(Debug, Default, Deserialize)]
struct TweetMetrics {
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    retweet_count: u64,
    #[serde(default)]
    reply_count: u64,
    #[serde(default)]
    impression_count: u64,
}

#[derive(Debug, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<TwitterUser>,
}

#[derive(Debug, Deserialize)]
struct TwitterUser {
    id: String,
    username: String,
    name: String,
    #[serde(default)]
    verified: bool,
}

fn normalize(body: RecentSearchResponse) -> PlatformData {
    let users = body.includes.map(|i| i.users).unwrap_or_default();

    let results: Vec<SearchItem> = body
        .data
        .into_iter()
        .map(|tweet| {
            let user = tweet
                .author_id
                .as_deref()
                .and_then(|id| users.iter().find(|u| u.id == id));
            let author = match user {
                Some(u) => Author {
                    username: u.username.clone(),
                    display_name: u.name.clone(),
                    verified: u.verified,
                },
                None => Author {
                    username: "unknown".to_string(),
                    display_name: "Unknown".to_string(),
                    verified: false,
                },
            };
            let metrics = tweet.public_metrics.unwrap_or_default();

            SearchItem {
                url: format!(
                    "https://twitter.com/{}/status/{}",
                    author.username, tweet.id
                ),
                text: tweet.text,
                author,
                metrics: Engagement {
                    likes: metrics.like_count,
                    shares: metrics.retweet_count,
                    comments: metrics.reply_count,
                    views: metrics.impression_count,
                },
                created_at: tweet.created_at.unwrap_or_else(Utc::now),
                platform: Platform::Twitter,
                id: tweet.id,
            }
        })
        .collect();

    PlatformData {
        total: results.len(),
        results,
        source: DataSource::Live,
    }
}
