// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /api/test
// - POST /api/search/{platform}
// - POST /api/search/multi (validation + aggregation)
// - POST /api/ai/enhance (validation + fallback)
// - 404 fallback and rate limiting

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use social_search_aggregator::config::{AppConfig, RateLimitConfig};
use social_search_aggregator::{router, AppState};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn test_config() -> AppConfig {
    AppConfig {
        port: 0,
        frontend_origin: None,
        rate_limit: RateLimitConfig {
            window_secs: 60,
            max_requests: 10_000,
        },
        twitter_keys: vec![],
        openai_keys: vec![],
        gemini_keys: vec![],
        telegram: None,
    }
}

/// Build the same Router the binary uses, with no credentials configured.
fn test_router() -> Router {
    let state = AppState::new(test_config()).expect("build app state");
    router(state)
}

async fn post_json(app: Router, uri: &str, payload: Json) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body: Json = serde_json::from_slice(&bytes).expect("parse json body");
    (status, body)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body: Json = serde_json::from_slice(&bytes).expect("parse json body");
    (status, body)
}

#[tokio::test]
async fn health_returns_200_with_status_ok() {
    let (status, body) = get_json(test_router(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body.get("version").is_some(), "missing 'version'");
    assert!(body.get("timestamp").is_some(), "missing 'timestamp'");
}

#[tokio::test]
async fn api_test_reports_credential_presence_without_values() {
    let mut config = test_config();
    config.twitter_keys = vec!["secret-token-a".into(), "secret-token-b".into()];
    let state = AppState::new(config).expect("build app state");

    let (status, body) = get_json(router(state), "/api/test").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["services"]["twitter"]["configured"], true);
    assert_eq!(body["services"]["twitter"]["keys"], 2);
    assert_eq!(body["services"]["openai"]["configured"], false);
    assert_eq!(body["telegram_configured"], false);

    let raw = body.to_string();
    assert!(
        !raw.contains("secret-token"),
        "diagnostics must not leak credential values"
    );
}

#[tokio::test]
async fn single_platform_search_serves_mock_data_without_credentials() {
    let (status, body) = post_json(
        test_router(),
        "/api/search/twitter",
        json!({"query": "election", "count": 10}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["platform"], "twitter");
    assert_eq!(body["data"]["source"], "mock");
    let results = body["data"]["results"].as_array().expect("results array");
    assert_eq!(results.len(), 10);
    for item in results {
        assert_eq!(item["platform"], "twitter");
        assert!(item["text"].as_str().expect("text").contains("election"));
    }
}

#[tokio::test]
async fn single_platform_search_rejects_unknown_platform() {
    let (status, body) = post_json(
        test_router(),
        "/api/search/myspace",
        json!({"query": "anything"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn multi_search_rejects_empty_query() {
    let (status, _) = post_json(
        test_router(),
        "/api/search/multi",
        json!({"query": "   ", "platforms": ["twitter"]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        test_router(),
        "/api/search/multi",
        json!({"platforms": ["twitter"]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn multi_search_rejects_missing_or_empty_platforms() {
    let (status, _) = post_json(
        test_router(),
        "/api/search/multi",
        json!({"query": "election"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        test_router(),
        "/api/search/multi",
        json!({"query": "election", "platforms": []}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn multi_search_aggregates_mock_platforms_and_sums_totals() {
    let (status, body) = post_json(
        test_router(),
        "/api/search/multi",
        json!({"query": "election", "platforms": ["twitter", "eitaa"], "count": 10}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["query"], "election");
    assert_eq!(body["platforms"]["twitter"]["success"], true);
    assert_eq!(body["platforms"]["eitaa"]["success"], true);
    assert_eq!(body["platforms"]["twitter"]["data"]["source"], "mock");

    let twitter_total = body["platforms"]["twitter"]["data"]["total"]
        .as_u64()
        .expect("twitter total");
    let eitaa_total = body["platforms"]["eitaa"]["data"]["total"]
        .as_u64()
        .expect("eitaa total");
    assert_eq!(body["total"].as_u64(), Some(twitter_total + eitaa_total));
}

#[tokio::test]
async fn multi_search_isolates_unsupported_platforms() {
    let (status, body) = post_json(
        test_router(),
        "/api/search/multi",
        json!({"query": "storm", "platforms": ["myspace", "rubika"], "count": 5}),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "aggregate stays 200 on partial failure");
    assert_eq!(body["platforms"]["myspace"]["success"], false);
    assert!(body["platforms"]["myspace"]["error"]
        .as_str()
        .expect("error string")
        .contains("unsupported"));
    assert_eq!(body["platforms"]["rubika"]["success"], true);

    let rubika_total = body["platforms"]["rubika"]["data"]["total"]
        .as_u64()
        .expect("rubika total");
    assert_eq!(body["total"].as_u64(), Some(rubika_total));
}

#[tokio::test]
async fn ai_enhance_rejects_empty_text() {
    let (status, _) = post_json(test_router(), "/api/ai/enhance", json!({"text": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(test_router(), "/api/ai/enhance", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ai_enhance_rejects_unknown_service() {
    let (status, _) = post_json(
        test_router(),
        "/api/ai/enhance",
        json!({"text": "some posts", "service": "claude"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ai_enhance_serves_canned_fallback_without_credentials() {
    let (status, body) = post_json(
        test_router(),
        "/api/ai/enhance",
        json!({"text": "a batch of posts about the election", "service": "gemini"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["fallback"], true);
    assert_eq!(body["data"]["service"], "gemini");
    assert!(!body["data"]["analysis"]
        .as_str()
        .expect("analysis")
        .is_empty());
}

#[tokio::test]
async fn unmatched_routes_return_404_envelope() {
    let (status, body) = get_json(test_router(), "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn rate_limit_returns_429_after_ceiling() {
    let mut config = test_config();
    config.rate_limit = RateLimitConfig {
        window_secs: 3600,
        max_requests: 2,
    };
    let state = AppState::new(config).expect("build app state");
    let app = router(state);

    for _ in 0..2 {
        let (status, _) = get_json(app.clone(), "/health").await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "rate_limited");
}
