//! nvidia-smi exporter library
//!
//! Streams `nvidia-smi` output and republishes it as Prometheus gauges. The
//! library holds everything except the HTTP server and CLI, so the sampling
//! loop can be driven from tests with any [`std::io::BufRead`] source.
//!
//! # Usage
//!
//! ```rust
//! use std::io::Cursor;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use nvidia_smi_exporter::{encode_text, GpuMetrics, Sampler, SamplerError, GPU_STATS};
//! use prometheus::Registry;
//!
//! let registry = Registry::new();
//! let metrics = Arc::new(GpuMetrics::new(&registry, &GPU_STATS).unwrap());
//! let sampler = Sampler::new("nvidia-smi", Duration::from_secs(5), metrics.clone()).unwrap();
//!
//! // Feed one line instead of spawning the tool.
//! let err = sampler.consume(Cursor::new("0, 1024, 8192, 15, 3, 42, 120.5\n"));
//! assert!(matches!(err, SamplerError::StreamClosed));
//! assert_eq!(metrics.value("power.draw", "0"), Some(120.5));
//!
//! let text = encode_text(&registry).unwrap();
//! assert!(text.contains("nvidia_temperature_celsius{device=\"0\"} 42"));
//! ```

pub mod error;
pub mod metrics;
pub mod parser;
pub mod sampler;
pub mod schema;

// Re-export main types for convenience
pub use error::SamplerError;
pub use metrics::{encode_text, GpuMetrics};
pub use parser::{parse_line, Sample};
pub use sampler::{interval_seconds, query_once, Sampler};
pub use schema::{MetricDefinition, GPU_STATS};
