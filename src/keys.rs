// src/keys.rs
//! Key Rotation Registry.
//!
//! Each external service owns an ordered, immutable pool of credentials and a
//! rotation cursor pointing at the currently preferred one. Callers rotate on
//! 401/429 and bound their retries by `pool_size`. The cursor is a relaxed
//! atomic: two concurrent rotations may skip a key, which only costs one extra
//! retry somewhere and never corrupts the index.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Twitter,
    OpenAi,
    Gemini,
}

impl Service {
    pub fn as_str(self) -> &'static str {
        match self {
            Service::Twitter => "twitter",
            Service::OpenAi => "openai",
            Service::Gemini => "gemini",
        }
    }
}

#[derive(Debug, Default)]
struct KeyPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl KeyPool {
    fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    fn current(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        // Cursor always stays in [0, len); the modulo guards a torn read
        // against a pool that raced construction, which cannot happen today.
        let idx = self.cursor.load(Ordering::Relaxed) % self.keys.len();
        Some(&self.keys[idx])
    }

    fn rotate(&self) {
        let len = self.keys.len();
        if len < 2 {
            return;
        }
        let _ = self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some((c + 1) % len)
            });
    }

    fn cursor_index(&self) -> usize {
        if self.keys.is_empty() {
            0
        } else {
            self.cursor.load(Ordering::Relaxed) % self.keys.len()
        }
    }
}

/// Per-service diagnostic view; never carries credential values.
#[derive(Debug, Serialize)]
pub struct PoolStatus {
    pub configured: bool,
    pub keys: usize,
    pub cursor: usize,
}

#[derive(Debug, Default)]
pub struct KeyRegistry {
    twitter: KeyPool,
    openai: KeyPool,
    gemini: KeyPool,
}

impl KeyRegistry {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::from_pools(
            config.twitter_keys.clone(),
            config.openai_keys.clone(),
            config.gemini_keys.clone(),
        )
    }

    pub fn from_pools(twitter: Vec<String>, openai: Vec<String>, gemini: Vec<String>) -> Self {
        Self {
            twitter: KeyPool::new(twitter),
            openai: KeyPool::new(openai),
            gemini: KeyPool::new(gemini),
        }
    }

    fn pool(&self, service: Service) -> &KeyPool {
        match service {
            Service::Twitter => &self.twitter,
            Service::OpenAi => &self.openai,
            Service::Gemini => &self.gemini,
        }
    }

    /// Credential at the current cursor, or `None` when the pool is empty.
    /// A `None` means "service unavailable": the caller must not attempt an
    /// outbound call.
    pub fn current(&self, service: Service) -> Option<&str> {
        self.pool(service).current()
    }

    /// Advances the cursor for `service` by one position, wrapping around.
    /// No-op when fewer than two credentials exist.
    pub fn rotate(&self, service: Service) {
        self.pool(service).rotate();
        metrics::counter!("key_rotations_total", "service" => service.as_str()).increment(1);
    }

    /// Retry bound for callers: one attempt per configured credential.
    pub fn pool_size(&self, service: Service) -> usize {
        self.pool(service).keys.len()
    }

    pub fn status(&self) -> BTreeMap<&'static str, PoolStatus> {
        [Service::Twitter, Service::OpenAi, Service::Gemini]
            .into_iter()
            .map(|s| {
                let pool = self.pool(s);
                (
                    s.as_str(),
                    PoolStatus {
                        configured: !pool.keys.is_empty(),
                        keys: pool.keys.len(),
                        cursor: pool.cursor_index(),
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("key-{i}")).collect()
    }

    #[test]
    fn empty_pool_yields_no_credential() {
        let reg = KeyRegistry::from_pools(vec![], vec![], vec![]);
        assert_eq!(reg.current(Service::Twitter), None);
        assert_eq!(reg.pool_size(Service::Twitter), 0);
    }

    #[test]
    fn rotation_walks_the_pool_in_order() {
        let reg = KeyRegistry::from_pools(keys(3), vec![], vec![]);
        assert_eq!(reg.current(Service::Twitter), Some("key-1"));
        reg.rotate(Service::Twitter);
        assert_eq!(reg.current(Service::Twitter), Some("key-2"));
        reg.rotate(Service::Twitter);
        assert_eq!(reg.current(Service::Twitter), Some("key-3"));
    }

    #[test]
    fn n_rotations_close_the_round_robin() {
        let n = 5;
        let reg = KeyRegistry::from_pools(keys(n), vec![], vec![]);
        let start = reg.current(Service::Twitter).map(str::to_owned);
        for _ in 0..n {
            reg.rotate(Service::Twitter);
        }
        assert_eq!(reg.current(Service::Twitter).map(str::to_owned), start);
    }

    #[test]
    fn single_key_rotation_is_a_noop() {
        let reg = KeyRegistry::from_pools(keys(1), vec![], vec![]);
        reg.rotate(Service::Twitter);
        assert_eq!(reg.current(Service::Twitter), Some("key-1"));
    }

    #[test]
    fn pools_rotate_independently() {
        let reg = KeyRegistry::from_pools(keys(2), keys(2), vec![]);
        reg.rotate(Service::Twitter);
        assert_eq!(reg.current(Service::Twitter), Some("key-2"));
        assert_eq!(reg.current(Service::OpenAi), Some("key-1"));
    }

    #[test]
    fn status_reports_counts_without_values() {
        let reg = KeyRegistry::from_pools(keys(2), vec![], vec![]);
        let status = reg.status();
        assert!(status["twitter"].configured);
        assert_eq!(status["twitter"].keys, 2);
        assert!(!status["gemini"].configured);
        let json = serde_json::to_string(&status).expect("serialize status");
        assert!(!json.contains("key-1"), "status must not leak credentials");
    }
}
