//! HTTP endpoint handlers for the exporter.
//!
//! Only `/metrics` is served; every other path falls through to axum's 404.

pub mod metrics;

// Re-export handlers
pub use metrics::metrics_handler;
