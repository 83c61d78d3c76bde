//! Prometheus gauges fed by the sampler.
//!
//! All gauges live in an explicit [`Registry`] owned by the caller. The
//! sampler writes through [`GpuMetrics::record`] while HTTP handlers read the
//! same registry through [`encode_text`].

use prometheus::core::Collector;
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::parser::Sample;
use crate::schema::{MetricDefinition, DEVICE_LABEL, LAST_UPDATED_HELP, LAST_UPDATED_NAME};

/// Buffer capacity for metrics encoding.
const BUFFER_CAP: usize = 16 * 1024;

/// Per-GPU gauges plus the last-updated timestamp.
pub struct GpuMetrics {
    gauges: Vec<(MetricDefinition, GaugeVec)>,
    last_updated: Gauge,
}

impl GpuMetrics {
    /// Creates one gauge per definition and registers all of them.
    ///
    /// Fails with `prometheus::Error::AlreadyReg` if any name is already
    /// present in `registry`.
    pub fn new(registry: &Registry, defs: &[MetricDefinition]) -> Result<Self, prometheus::Error> {
        let last_updated = Gauge::new(LAST_UPDATED_NAME, LAST_UPDATED_HELP)?;
        registry.register(Box::new(last_updated.clone()))?;

        let mut gauges = Vec::with_capacity(defs.len());
        for def in defs {
            let gauge = GaugeVec::new(Opts::new(def.exposed_name, def.help_text), &[DEVICE_LABEL])?;
            registry.register(Box::new(gauge.clone()))?;
            gauges.push((*def, gauge));
        }

        Ok(Self {
            gauges,
            last_updated,
        })
    }

    /// Definitions in query order.
    pub fn definitions(&self) -> Vec<MetricDefinition> {
        self.gauges.iter().map(|(def, _)| *def).collect()
    }

    /// Writes one sample: timestamp first, then each gauge for the device.
    ///
    /// Each gauge is set independently, so a concurrent scrape may see a mix
    /// of old and new values for the same device.
    pub fn record(&self, sample: &Sample, unix_time: f64) {
        debug_assert_eq!(
            sample.values.len(),
            self.gauges.len(),
            "sample for device {} does not match the metric definitions",
            sample.device_id
        );
        self.last_updated.set(unix_time);
        for ((_, gauge), value) in self.gauges.iter().zip(&sample.values) {
            gauge
                .with_label_values(&[sample.device_id.as_str()])
                .set(*value);
        }
    }

    /// Unix time of the last recorded sample, `0.0` if none yet.
    pub fn last_updated(&self) -> f64 {
        self.last_updated.get()
    }

    /// Current value of `query_key` for `device_id`.
    ///
    /// `None` for an unknown key or a device that was never recorded. The
    /// lookup never adds a series to the registry.
    pub fn value(&self, query_key: &str, device_id: &str) -> Option<f64> {
        let (_, gauge) = self.gauges.iter().find(|(def, _)| def.query_key == query_key)?;
        gauge
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .find(|m| m.get_label().iter().any(|l| l.value() == device_id))
            .map(|m| m.get_gauge().value())
    }
}

/// Encodes the full registry in the Prometheus text exposition format.
pub fn encode_text(registry: &Registry) -> Result<String, prometheus::Error> {
    let families = registry.gather();
    let mut buffer = Vec::with_capacity(BUFFER_CAP);
    TextEncoder::new().encode(&families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
