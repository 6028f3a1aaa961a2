// src/config.rs
//! Environment-driven configuration.
//!
//! Credential pools use a base variable plus numeric suffixes, e.g.
//! `TWITTER_BEARER_TOKEN`, `TWITTER_BEARER_TOKEN_2`, `TWITTER_BEARER_TOKEN_3`.
//! Values still carrying a placeholder marker (from a copied `.env.example`)
//! are treated as not configured.

use anyhow::{Context, Result};
use std::env;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: usize = 120;

pub const ENV_TWITTER_KEYS: &str = "TWITTER_BEARER_TOKEN";
pub const ENV_OPENAI_KEYS: &str = "OPENAI_API_KEY";
pub const ENV_GEMINI_KEYS: &str = "GEMINI_API_KEY";

/// MTProto credential set. Parsed and reported by diagnostics even though the
/// Telegram search path itself serves placeholder data.
#[derive(Debug, Clone)]
pub struct TelegramCredentials {
    pub api_id: i32,
    pub api_hash: String,
    pub session: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Exact origin allowed by CORS; `None` means permissive (local dev).
    pub frontend_origin: Option<String>,
    pub rate_limit: RateLimitConfig,
    pub twitter_keys: Vec<String>,
    pub openai_keys: Vec<String>,
    pub gemini_keys: Vec<String>,
    pub telegram: Option<TelegramCredentials>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = match env::var("PORT") {
            Ok(v) => v.parse::<u16>().context("PORT must be a valid port number")?,
            Err(_) => DEFAULT_PORT,
        };

        let frontend_origin = env::var("FRONTEND_ORIGIN")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && !is_placeholder(v));

        let window_secs = parse_env_or("RATE_LIMIT_WINDOW_SECS", DEFAULT_RATE_LIMIT_WINDOW_SECS)?;
        let max_requests =
            parse_env_or("RATE_LIMIT_MAX_REQUESTS", DEFAULT_RATE_LIMIT_MAX_REQUESTS)?;

        let twitter_keys = load_key_pool(ENV_TWITTER_KEYS);
        let openai_keys = load_key_pool(ENV_OPENAI_KEYS);
        let gemini_keys = load_key_pool(ENV_GEMINI_KEYS);

        if twitter_keys.is_empty() {
            warn!("no Twitter credentials configured; Twitter searches will serve mock data");
        }
        if openai_keys.is_empty() && gemini_keys.is_empty() {
            warn!("no AI credentials configured; /api/ai/enhance will serve the canned fallback");
        }

        Ok(Self {
            port,
            frontend_origin,
            rate_limit: RateLimitConfig {
                window_secs,
                max_requests,
            },
            twitter_keys,
            openai_keys,
            gemini_keys,
            telegram: load_telegram_credentials()?,
        })
    }
}

fn parse_env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(v) => v
            .parse::<T>()
            .with_context(|| format!("{name} must be a valid number")),
        Err(_) => Ok(default),
    }
}

/// Reads `base`, `base_2`, `base_3`, ... stopping at the first absent suffix.
/// Placeholder or empty values are skipped but do not stop the scan.
fn load_key_pool(base: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut n = 1usize;
    loop {
        let name = if n == 1 {
            base.to_string()
        } else {
            format!("{base}_{n}")
        };
        let Ok(raw) = env::var(&name) else { break };
        let value = raw.trim();
        if value.is_empty() || is_placeholder(value) {
            warn!(var = %name, "skipping placeholder credential value");
        } else {
            keys.push(value.to_string());
        }
        n += 1;
    }
    keys
}

fn load_telegram_credentials() -> Result<Option<TelegramCredentials>> {
    let fetch = |name: &str| {
        env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && !is_placeholder(v))
    };

    let (Some(api_id), Some(api_hash), Some(session), Some(phone)) = (
        fetch("TELEGRAM_API_ID"),
        fetch("TELEGRAM_API_HASH"),
        fetch("TELEGRAM_SESSION"),
        fetch("TELEGRAM_PHONE"),
    ) else {
        return Ok(None);
    };

    let api_id = api_id
        .parse::<i32>()
        .context("TELEGRAM_API_ID must be numeric")?;

    Ok(Some(TelegramCredentials {
        api_id,
        api_hash,
        session,
        phone,
    }))
}

/// Sentinel markers left behind by `.env.example` copies.
pub fn is_placeholder(value: &str) -> bool {
    let v = value.to_ascii_lowercase();
    v.contains("your_") || v.contains("placeholder") || v.contains("changeme") || v.contains("xxx")
}
