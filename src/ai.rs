// src/ai.rs
//! AI enhancement: forwards text to OpenAI or Gemini for a short
//! summarization/sentiment analysis.
//!
//! Both providers sit behind the same seam. Credential handling mirrors the
//! search path: 401/429 rotates the pool and retries, bounded by the pool
//! size. Any failure degrades to a canned analysis instead of surfacing an
//! error to the client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::keys::{KeyRegistry, Service};

pub const OPENAI_API_BASE: &str = "https://api.openai.com";
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

const OPENAI_MODEL: &str = "gpt-4o-mini";
const GEMINI_MODEL: &str = "gemini-1.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Served when no provider call can complete.
pub const FALLBACK_ANALYSIS: &str =
    "Automated analysis is temporarily unavailable. The collected posts could not be summarized; \
     please review the raw results directly or retry later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiServiceKind {
    OpenAi,
    Gemini,
}

impl AiServiceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(AiServiceKind::OpenAi),
            "gemini" => Some(AiServiceKind::Gemini),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AiServiceKind::OpenAi => "openai",
            AiServiceKind::Gemini => "gemini",
        }
    }

    fn service(self) -> Service {
        match self {
            AiServiceKind::OpenAi => Service::OpenAi,
            AiServiceKind::Gemini => Service::Gemini,
        }
    }
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("no credentials configured")]
    NoCredentials,
    #[error("all {0} credentials rejected or rate-limited")]
    CredentialsExhausted(usize),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("provider returned an empty completion")]
    EmptyCompletion,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
trait AiProvider: Send + Sync {
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, AiError>;
}

#[derive(Debug, Serialize)]
pub struct Enhancement {
    pub analysis: String,
    pub service: &'static str,
    /// True when the canned fallback was served instead of a provider answer.
    pub fallback: bool,
}

pub struct AiEnhancer {
    keys: Arc<KeyRegistry>,
    openai: OpenAiProvider,
    gemini: GeminiProvider,
}

impl AiEnhancer {
    pub fn new(keys: Arc<KeyRegistry>) -> anyhow::Result<Self> {
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
            keys,
            openai: OpenAiProvider {
                http: http.clone(),
                base_url: OPENAI_API_BASE.to_string(),
            },
            gemini: GeminiProvider {
                http,
                base_url: GEMINI_API_BASE.to_string(),
            },
        })
    }

    /// Points both providers at a different host; used by tests.
    pub fn with_base_urls(
        mut self,
        openai_base: impl Into<String>,
        gemini_base: impl Into<String>,
    ) -> Self {
        self.openai.base_url = openai_base.into();
        self.gemini.base_url = gemini_base.into();
        self
    }

    /// Analyzes `text`, never fails: exhausted or missing credentials and
    /// transport errors all degrade to [`FALLBACK_ANALYSIS`].
    pub async fn enhance(
        &self,
        text: &str,
        kind: AiServiceKind,
        query: Option<&str>,
    ) -> Enhancement {
        metrics::counter!("ai_enhance_requests_total", "service" => kind.as_str()).increment(1);

        let prompt = build_prompt(text, query);
        match self.try_complete(kind, &prompt).await {
            Ok(analysis) => Enhancement {
                analysis,
                service: kind.as_str(),
                fallback: false,
            },
            Err(e) => {
                warn!(service = kind.as_str(), error = %e, "AI enhancement failed, serving fallback");
                metrics::counter!("ai_fallbacks_total", "service" => kind.as_str()).increment(1);
                Enhancement {
                    analysis: FALLBACK_ANALYSIS.to_string(),
                    service: kind.as_str(),
                    fallback: true,
                }
            }
        }
    }

    async fn try_complete(&self, kind: AiServiceKind, prompt: &str) -> Result<String, AiError> {
        let service = kind.service();
        let attempts = self.keys.pool_size(service);
        if attempts == 0 {
            return Err(AiError::NoCredentials);
        }

        let provider: &dyn AiProvider = match kind {
            AiServiceKind::OpenAi => &self.openai,
            AiServiceKind::Gemini => &self.gemini,
        };

        for _ in 0..attempts {
            let Some(key) = self.keys.current(service).map(str::to_owned) else {
                return Err(AiError::NoCredentials);
            };
            match provider.complete(&key, prompt).await {
                Ok(analysis) => return Ok(analysis),
                Err(AiError::Status(code)) if code == 401 || code == 429 => {
                    warn!(service = kind.as_str(), status = code, "AI credential rejected, rotating");
                    self.keys.rotate(service);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AiError::CredentialsExhausted(attempts))
    }
}

fn build_prompt(text: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.trim().is_empty() => format!(
            "These social media posts were collected for the search query \"{q}\". \
             Summarize the main themes and overall sentiment in a few sentences:\n\n{text}"
        ),
        _ => format!(
            "Summarize the main themes and overall sentiment of these social media posts \
             in a few sentences:\n\n{text}"
        ),
    }
}

/// Collapse whitespace and cap the analysis length for the response envelope.
fn tidy_analysis(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len().min(2000));
    let mut prev_space = false;
    for ch in raw.chars() {
        let c = if ch == '\t' || ch == '\r' { ' ' } else { ch };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
        if out.chars().count() >= 2000 {
            break;
        }
    }
    out.trim().to_string()
}

// --- OpenAI (chat completions) ---

struct OpenAiProvider {
    http: reqwest::Client,
    base_url: String,
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, AiError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: OPENAI_MODEL,
            messages: vec![
                Msg {
                    role: "system",
                    content: "You analyze social media content. Be concise and neutral.",
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.3,
            max_tokens: 256,
        };

        let resp = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AiError::Status(status.as_u16()));
        }

        let body: Resp = resp.json().await?;
        let content = body
            .choices
            .first()
            .map(|c| tidy_analysis(&c.message.content))
            .unwrap_or_default();
        if content.is_empty() {
            return Err(AiError::EmptyCompletion);
        }
        Ok(content)
    }
}

// --- Gemini (generateContent; key travels as a query parameter) ---

struct GeminiProvider {
    http: reqwest::Client,
    base_url: String,
}

#[async_trait]
impl AiProvider for GeminiProvider {
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, AiError> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: CandidateContent,
        }
        #[derive(Deserialize)]
        struct CandidateContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: String,
        }

        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, GEMINI_MODEL
            ))
            .query(&[("key", api_key)])
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AiError::Status(status.as_u16()));
        }

        let body: Resp = resp.json().await?;
        let content = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| tidy_analysis(&p.text))
            .unwrap_or_default();
        if content.is_empty() {
            return Err(AiError::EmptyCompletion);
        }
        Ok(content)
    }
}
