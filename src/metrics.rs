// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::AppConfig;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and register the series the
    /// handlers emit. Call once per process.
    pub fn init(config: &AppConfig) -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_counter!(
            "platform_searches_total",
            "Searches dispatched per platform."
        );
        describe_counter!(
            "mock_results_total",
            "Placeholder items generated per platform."
        );
        describe_counter!(
            "mock_fallbacks_total",
            "Live searches that degraded to mock data."
        );
        describe_counter!("key_rotations_total", "Credential rotations per service.");
        describe_counter!("ai_enhance_requests_total", "AI enhancement requests.");
        describe_counter!(
            "ai_fallbacks_total",
            "AI enhancements that served the canned fallback."
        );

        gauge!("configured_twitter_keys").set(config.twitter_keys.len() as f64);
        gauge!("configured_openai_keys").set(config.openai_keys.len() as f64);
        gauge!("configured_gemini_keys").set(config.gemini_keys.len() as f64);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` in Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
