// src/api.rs
//! HTTP surface: routes, shared state, request/response envelopes.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::ai::{AiEnhancer, AiServiceKind, Enhancement};
use crate::config::AppConfig;
use crate::keys::{KeyRegistry, PoolStatus};
use crate::middleware::{enforce_rate_limit, RateLimitState};
use crate::search::types::{DataSource, MultiSearchResponse, Platform, SearchItem};
use crate::search::{SearchDispatcher, DEFAULT_COUNT};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: Arc<KeyRegistry>,
    pub dispatcher: SearchDispatcher,
    pub ai: Arc<AiEnhancer>,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let keys = Arc::new(KeyRegistry::from_config(&config));
        let dispatcher = SearchDispatcher::new(Arc::clone(&keys))?;
        let ai = Arc::new(AiEnhancer::new(Arc::clone(&keys))?);
        Ok(Self {
            config: Arc::new(config),
            keys,
            dispatcher,
            ai,
        })
    }
}

pub fn router(state: AppState) -> Router {
    let rate_limit = RateLimitState::from_config(&state.config.rate_limit);
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health))
        .route("/api/test", get(api_test))
        .route("/api/search/multi", post(search_multi))
        .route("/api/search/{platform}", post(search_single))
        .route("/api/ai/enhance", post(ai_enhance))
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    match config.frontend_origin.as_deref() {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
            Err(_) => {
                warn!(origin, "invalid FRONTEND_ORIGIN, falling back to permissive CORS");
                CorsLayer::very_permissive()
            }
        },
        None => CorsLayer::very_permissive(),
    }
}

// --- Error envelope ---

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                success: false,
                error: ErrorDetail {
                    code: self.code,
                    message: self.message,
                },
            }),
        )
            .into_response()
    }
}

async fn not_found() -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: "route not found".to_string(),
    }
}

// --- Health & diagnostics ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: DateTime<Utc>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

#[derive(Serialize)]
struct DiagnosticsResponse {
    status: &'static str,
    services: std::collections::BTreeMap<&'static str, PoolStatus>,
    telegram_configured: bool,
    rate_limit: RateLimitInfo,
}

#[derive(Serialize)]
struct RateLimitInfo {
    window_secs: u64,
    max_requests: usize,
}

/// Configuration snapshot: which credentials are present, never their values.
async fn api_test(State(state): State<AppState>) -> Json<DiagnosticsResponse> {
    Json(DiagnosticsResponse {
        status: "ok",
        services: state.keys.status(),
        telegram_configured: state.config.telegram.is_some(),
        rate_limit: RateLimitInfo {
            window_secs: state.config.rate_limit.window_secs,
            max_requests: state.config.rate_limit.max_requests,
        },
    })
}

// --- Search ---

// Required fields are `Option` so missing ones map to 400 instead of the
// extractor's 422.
#[derive(Deserialize)]
struct SearchRequest {
    query: Option<String>,
    count: Option<usize>,
}

#[derive(Deserialize)]
struct MultiSearchRequest {
    query: Option<String>,
    platforms: Option<Vec<String>>,
    count: Option<usize>,
}

#[derive(Serialize)]
struct SingleSearchResponse {
    success: bool,
    data: SingleSearchData,
}

#[derive(Serialize)]
struct SingleSearchData {
    platform: Platform,
    results: Vec<SearchItem>,
    total: usize,
    source: DataSource,
}

fn validate_query(query: Option<String>) -> Result<String, ApiError> {
    let query = query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("query is required and must be non-empty"))?;
    Ok(query)
}

async fn search_single(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SingleSearchResponse>, ApiError> {
    let platform = Platform::parse(&platform)
        .ok_or_else(|| ApiError::bad_request(format!("unsupported platform: {platform}")))?;
    let query = validate_query(body.query)?;
    let count = body.count.unwrap_or(DEFAULT_COUNT);

    let result = state.dispatcher.search_platform(platform, &query, count).await;
    match result.data {
        Some(data) => Ok(Json(SingleSearchResponse {
            success: true,
            data: SingleSearchData {
                platform,
                total: data.total,
                results: data.results,
                source: data.source,
            },
        })),
        // Supported platforms always resolve to data (mock at worst).
        None => Err(ApiError::bad_request(
            result.error.unwrap_or_else(|| "search failed".to_string()),
        )),
    }
}

async fn search_multi(
    State(state): State<AppState>,
    Json(body): Json<MultiSearchRequest>,
) -> Result<Json<MultiSearchResponse>, ApiError> {
    let query = validate_query(body.query)?;
    let platforms = body
        .platforms
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("platforms is required and must be non-empty"))?;
    let count = body.count.unwrap_or(DEFAULT_COUNT);

    Ok(Json(state.dispatcher.dispatch(&query, &platforms, count).await))
}

// --- AI enhancement ---

#[derive(Deserialize)]
struct EnhanceRequest {
    text: Option<String>,
    service: Option<String>,
    query: Option<String>,
}

#[derive(Serialize)]
struct EnhanceResponse {
    success: bool,
    data: Enhancement,
}

async fn ai_enhance(
    State(state): State<AppState>,
    Json(body): Json<EnhanceRequest>,
) -> Result<Json<EnhanceResponse>, ApiError> {
    let text = body
        .text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("text is required and must be non-empty"))?;

    let service = match body.service.as_deref() {
        Some(raw) => AiServiceKind::parse(raw)
            .ok_or_else(|| ApiError::bad_request(format!("unsupported AI service: {raw}")))?,
        None => AiServiceKind::OpenAi,
    };

    let enhancement = state
        .ai
        .enhance(&text, service, body.query.as_deref())
        .await;
    Ok(Json(EnhanceResponse {
        success: true,
        data: enhancement,
    }))
}
