//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers. The sampler writes into the same registry through its
//! own `Arc<GpuMetrics>`.

use nvidia_smi_exporter::GpuMetrics;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests and the sampler thread.
pub struct AppState {
    pub registry: Registry,
    pub metrics: Arc<GpuMetrics>,
    /// Server start time for uptime logging.
    pub start_time: Instant,
}
