// src/search/mock.rs
//! Mock Data Generator.
//!
//! Produces plausible placeholder posts for platforms without a live
//! integration, in the same `SearchItem` shape the live handlers emit so the
//! UI needs no special-casing. Content is intentionally randomized; only the
//! shape is stable.

use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use rand::Rng;

use crate::search::types::{Author, DataSource, Engagement, Platform, PlatformData, SearchItem};

/// Mock result sets are capped well below the live Twitter ceiling.
pub const MOCK_MAX_COUNT: usize = 50;

static TEXT_TEMPLATES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "Interesting discussion about {q} going on right now.",
        "Here is my take on {q} after following it for a while.",
        "Breaking: new developments around {q} reported today.",
        "Can't believe what people are saying about {q} lately.",
        "A thread on {q} and why it matters more than you think.",
        "Sharing some context on {q} that the coverage missed.",
        "Hot take: {q} is not going the way anyone expected.",
        "Live updates on {q} as the story develops.",
    ]
});

static USERNAMES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "newswatcher", "daily_digest", "trend_radar", "city_reporter", "open_mic",
        "signal_feed", "night_owl", "media_lens", "fact_stream", "field_notes",
    ]
});

static DISPLAY_NAMES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "News Watcher", "Daily Digest", "Trend Radar", "City Reporter", "Open Mic",
        "Signal Feed", "Night Owl", "Media Lens", "Fact Stream", "Field Notes",
    ]
});

/// Generates `count` placeholder items for `platform`, clamped to
/// `1..=MOCK_MAX_COUNT`. Timestamps are spaced backward from now.
pub fn generate(platform: Platform, query: &str, count: usize) -> PlatformData {
    let count = count.clamp(1, MOCK_MAX_COUNT);
    let mut rng = rand::rng();
    let now = Utc::now();

    let mut results = Vec::with_capacity(count);
    let mut minutes_back: i64 = 0;
    for i in 0..count {
        minutes_back += rng.random_range(5..90);

        let template = TEXT_TEMPLATES[rng.random_range(0..TEXT_TEMPLATES.len())];
        let user_idx = rng.random_range(0..USERNAMES.len());
        let id = format!("{}-{}-{}", platform, now.timestamp(), i + 1);

        let likes = rng.random_range(0..5_000u64);
        let shares = rng.random_range(0..800u64);
        let comments = rng.random_range(0..400u64);
        let views = likes + rng.random_range(1_000..50_000u64);

        results.push(SearchItem {
            url: item_url(platform, USERNAMES[user_idx], &id),
            id,
            text: template.replace("{q}", query),
            author: Author {
                username: USERNAMES[user_idx].to_string(),
                display_name: DISPLAY_NAMES[user_idx].to_string(),
                verified: rng.random_range(0..10) == 0,
            },
            metrics: Engagement {
                likes,
                shares,
                comments,
                views,
            },
            created_at: now - Duration::minutes(minutes_back),
            platform,
        });
    }

    metrics::counter!("mock_results_total", "platform" => platform.as_str())
        .increment(results.len() as u64);

    PlatformData {
        total: results.len(),
        results,
        source: DataSource::Mock,
    }
}

fn item_url(platform: Platform, username: &str, id: &str) -> String {
    match platform {
        Platform::Twitter => format!("https://twitter.com/{username}/status/{id}"),
        Platform::Instagram => format!("https://www.instagram.com/p/{id}/"),
        Platform::Eitaa => format!("https://eitaa.com/{username}/{id}"),
        Platform::Facebook => format!("https://www.facebook.com/{username}/posts/{id}"),
        Platform::Telegram => format!("https://t.me/{username}/{id}"),
        Platform::Rubika => format!("https://rubika.ir/{username}/{id}"),
    }
}
