//! Static table of the nvidia-smi fields exported as gauges.
//!
//! The order of [`GPU_STATS`] is the order of the `--query-gpu` argument and
//! therefore the column order of every output line.

/// Label attached to every per-GPU gauge.
pub const DEVICE_LABEL: &str = "device";

/// Query key for the device index; always the first column.
pub const INDEX_QUERY_KEY: &str = "index";

/// One nvidia-smi field and the gauge it is exported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDefinition {
    /// Field name passed to `--query-gpu`.
    pub query_key: &'static str,
    /// Prometheus metric name.
    pub exposed_name: &'static str,
    pub help_text: &'static str,
}

pub const GPU_STATS: [MetricDefinition; 6] = [
    MetricDefinition {
        query_key: "memory.used",
        exposed_name: "nvidia_memory_used_megabytes",
        help_text: "Total memory allocated by active contexts",
    },
    MetricDefinition {
        query_key: "memory.total",
        exposed_name: "nvidia_memory_total_megabytes",
        help_text: "Total installed GPU memory",
    },
    MetricDefinition {
        query_key: "utilization.gpu",
        exposed_name: "nvidia_gpu_utilization_percent",
        help_text: "Percent of time over the past sample period during which one or more kernels was executing on the GPU",
    },
    MetricDefinition {
        query_key: "utilization.memory",
        exposed_name: "nvidia_memory_utilization_percent",
        help_text: "Percent of time over the past sample period during which global (device) memory was being read or written",
    },
    MetricDefinition {
        query_key: "temperature.gpu",
        exposed_name: "nvidia_temperature_celsius",
        help_text: "Core GPU temperature",
    },
    MetricDefinition {
        query_key: "power.draw",
        exposed_name: "nvidia_power_draw_watts",
        help_text: "The last measured power draw for the entire board",
    },
];

pub const LAST_UPDATED_NAME: &str = "nvidia_last_updated_time";
pub const LAST_UPDATED_HELP: &str = "Last time that we read output from nvidia-smi";

/// Builds `--query-gpu=index,<key>,<key>,...` for the given definitions.
pub fn query_argument(defs: &[MetricDefinition]) -> String {
    let keys: Vec<&str> = std::iter::once(INDEX_QUERY_KEY)
        .chain(defs.iter().map(|d| d.query_key))
        .collect();
    format!("--query-gpu={}", keys.join(","))
}
