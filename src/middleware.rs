// src/middleware.rs
//! Fixed-window rate limiting for the public API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;

#[derive(Debug)]
struct Window {
    started_at: Instant,
    count: usize,
}

/// Process-wide request counter reset every window.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<Window>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(Window {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }
}

#[derive(Debug, Serialize)]
struct RateLimitBody {
    success: bool,
    error: RateLimitError,
}

#[derive(Debug, Serialize)]
struct RateLimitError {
    code: &'static str,
    message: &'static str,
}

/// Middleware enforcing the request-per-window ceiling; 429 with a JSON body
/// once exhausted.
pub async fn enforce_rate_limit(
    State(limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = limit.state.lock().await;

    if window.started_at.elapsed() >= limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= limit.max_requests {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(RateLimitBody {
                success: false,
                error: RateLimitError {
                    code: "rate_limited",
                    message: "rate limit exceeded, retry after the current window",
                },
            }),
        )
            .into_response();
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}
