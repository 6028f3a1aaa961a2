// src/search/mod.rs
//! Platform Search Dispatcher.
//!
//! Resolves platform names + a query into per-platform result slots. Handlers
//! run concurrently as spawned tasks and the join collects every outcome,
//! success or failure, so one platform's outage never hides the others.

pub mod mock;
pub mod twitter;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;

use crate::keys::{KeyRegistry, Service};
use crate::search::twitter::TwitterClient;
use crate::search::types::{MultiSearchResponse, Platform, PlatformResult};

pub const DEFAULT_COUNT: usize = 20;

#[derive(Clone)]
pub struct SearchDispatcher {
    keys: Arc<KeyRegistry>,
    twitter: TwitterClient,
    #[cfg(test)]
    panic_platform: Option<Platform>,
}

impl SearchDispatcher {
    pub fn new(keys: Arc<KeyRegistry>) -> anyhow::Result<Self> {
        Ok(Self {
            keys,
            twitter: TwitterClient::new()?,
            #[cfg(test)]
            panic_platform: None,
        })
    }

    /// Swaps in a preconfigured Twitter client (tests point it at wiremock).
    pub fn with_twitter_client(mut self, twitter: TwitterClient) -> Self {
        self.twitter = twitter;
        self
    }

    /// Makes the handler for `platform` panic, to exercise the join-side
    /// isolation of a crashing task.
    #[cfg(test)]
    fn with_panicking_handler(mut self, platform: Platform) -> Self {
        self.panic_platform = Some(platform);
        self
    }

    /// Searches one platform. Supported platforms always yield a successful
    /// slot: live failures on the Twitter path degrade to mock data.
    pub async fn search_platform(
        &self,
        platform: Platform,
        query: &str,
        count: usize,
    ) -> PlatformResult {
        metrics::counter!("platform_searches_total", "platform" => platform.as_str()).increment(1);

        #[cfg(test)]
        if self.panic_platform == Some(platform) {
            panic!("injected handler failure for {platform}");
        }

        if platform == Platform::Twitter && self.keys.pool_size(Service::Twitter) > 0 {
            match self.twitter.search(&self.keys, query, count).await {
                Ok(data) => return PlatformResult::ok(data),
                Err(e) => {
                    warn!(error = %e, "live Twitter search failed, serving mock data");
                    metrics::counter!("mock_fallbacks_total", "platform" => "twitter")
                        .increment(1);
                }
            }
        }

        PlatformResult::ok(mock::generate(platform, query, count))
    }

    /// Fans out over `platforms` concurrently and waits for every handler to
    /// settle. Unknown identifiers get an error slot; a panicking handler is
    /// caught at the join and recorded the same way.
    pub async fn dispatch(
        &self,
        query: &str,
        platforms: &[String],
        count: usize,
    ) -> MultiSearchResponse {
        let mut slots: BTreeMap<String, PlatformResult> = BTreeMap::new();
        let mut tasks = Vec::new();

        for name in platforms {
            // Dedup on the canonical slot key so aliases ("x", "twitter")
            // resolve to one handler and one slot.
            match Platform::parse(name) {
                Some(platform) => {
                    let slot_name = platform.as_str().to_string();
                    if tasks.iter().any(|(n, _)| *n == slot_name) {
                        continue;
                    }
                    let dispatcher = self.clone();
                    let query = query.to_string();
                    let handle = tokio::spawn(async move {
                        dispatcher.search_platform(platform, &query, count).await
                    });
                    tasks.push((slot_name, handle));
                }
                None => {
                    let slot_name = name.trim().to_ascii_lowercase();
                    if slots.contains_key(&slot_name) {
                        continue;
                    }
                    slots.insert(
                        slot_name,
                        PlatformResult::err(format!("unsupported platform: {name}")),
                    );
                }
            }
        }

        let names: Vec<String> = tasks.iter().map(|(n, _)| n.clone()).collect();
        let settled = join_all(tasks.into_iter().map(|(_, handle)| handle)).await;
        for (name, outcome) in names.into_iter().zip(settled) {
            let result = match outcome {
                Ok(result) => result,
                Err(e) => {
                    warn!(platform = %name, error = %e, "platform handler panicked");
                    PlatformResult::err("platform handler failed")
                }
            };
            slots.insert(name, result);
        }

        let total = slots
            .values()
            .filter_map(|r| r.data.as_ref())
            .map(|d| d.total)
            .sum();

        MultiSearchResponse {
            success: true,
            query: query.to_string(),
            platforms: slots,
            total,
        }
    }
}
