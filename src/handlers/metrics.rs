//! Metrics endpoint handler for Prometheus scraping.
//!
//! This module provides the `/metrics` endpoint handler that encodes the
//! current registry state in Prometheus text format.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use nvidia_smi_exporter::encode_text;
use prometheus::{Encoder, TextEncoder};
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");

    let body = encode_text(&state.registry).map_err(|e| {
        error!("Failed to encode Prometheus metrics: {}", e);
        MetricsError::EncodingFailed
    })?;

    debug!(
        "Metrics request completed: {} bytes, last update at {}, {:.3}ms",
        body.len(),
        state.metrics.last_updated(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::body::to_bytes;
    use nvidia_smi_exporter::{GpuMetrics, Sample, GPU_STATS};
    use prometheus::Registry;
    use std::sync::Arc;

    fn state() -> SharedState {
        let registry = Registry::new();
        let metrics = Arc::new(GpuMetrics::new(&registry, &GPU_STATS).unwrap());
        Arc::new(AppState {
            registry,
            metrics,
            start_time: Instant::now(),
        })
    }

    #[tokio::test]
    async fn test_metrics_handler_serves_current_values() {
        let state = state();
        state.metrics.record(
            &Sample {
                device_id: "0".to_string(),
                values: vec![1024.0, 8192.0, 15.0, 3.0, 42.0, 120.5],
            },
            1_700_000_000.0,
        );

        let response = metrics_handler(State(state)).await.unwrap().into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("nvidia_memory_total_megabytes{device=\"0\"} 8192"));
        assert!(text.contains("nvidia_temperature_celsius{device=\"0\"} 42"));
        assert!(text.contains("nvidia_last_updated_time 1700000000"));
    }

    #[tokio::test]
    async fn test_metrics_handler_before_first_sample() {
        let response = metrics_handler(State(state()))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("# HELP nvidia_last_updated_time"));
        assert!(!text.contains("device="));
    }
}
