// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod ai;
pub mod api;
pub mod config;
pub mod keys;
pub mod metrics;
pub mod middleware;
pub mod search;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::keys::{KeyRegistry, Service};
