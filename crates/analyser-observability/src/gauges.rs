//! Labelled gauge registry
//!
//! Wraps a [`prometheus::Registry`]. A `GaugeVec` is registered the first
//! time a gauge name is set, with the label names of that call; later calls
//! must use the same label names. Setting a series overwrites its value, so
//! repeated runs never accumulate.

use crate::error::{ObservabilityError, Result};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::Mutex;

struct RegisteredGauge {
    vec: GaugeVec,
    label_names: Vec<String>,
}

/// Process-wide gauge registry
pub struct GaugeRegistry {
    registry: Registry,
    gauges: Mutex<HashMap<String, RegisteredGauge>>,
}

impl GaugeRegistry {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            gauges: Mutex::new(HashMap::new()),
        }
    }

    /// Set one gauge series
    ///
    /// # Arguments
    /// * `name` - Gauge name, registered on first use
    /// * `help` - Help text used when registering
    /// * `labels` - Label name/value pairs identifying the series
    /// * `value` - New value (overwrites)
    pub fn set(&self, name: &str, help: &str, labels: &[(&str, &str)], value: f64) -> Result<()> {
        let mut gauges = self.gauges.lock().map_err(|_| ObservabilityError::Poisoned)?;

        let names: Vec<String> = labels.iter().map(|(k, _)| k.to_string()).collect();

        if !gauges.contains_key(name) {
            let label_refs: Vec<&str> = labels.iter().map(|(k, _)| *k).collect();
            let vec = GaugeVec::new(Opts::new(name, help), &label_refs)?;
            self.registry.register(Box::new(vec.clone()))?;
            tracing::trace!("Registered gauge {} {:?}", name, names);
            gauges.insert(
                name.to_string(),
                RegisteredGauge {
                    vec,
                    label_names: names.clone(),
                },
            );
        }

        let gauge = gauges
            .get(name)
            .ok_or_else(|| ObservabilityError::Prometheus(format!("gauge {} vanished", name)))?;

        if !same_names(&gauge.label_names, &names) {
            return Err(ObservabilityError::LabelMismatch {
                name: name.to_string(),
                expected: gauge.label_names.clone(),
                got: names,
            });
        }

        let map: HashMap<&str, &str> = labels.iter().copied().collect();
        gauge.vec.get_metric_with(&map)?.set(value);
        Ok(())
    }

    /// Current value of a series, `None` when it was never set
    pub fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.registry
            .gather()
            .iter()
            .find(|family| family.get_name() == name)?
            .get_metric()
            .iter()
            .find(|metric| {
                let pairs = metric.get_label();
                pairs.len() == labels.len()
                    && labels.iter().all(|(k, v)| {
                        pairs
                            .iter()
                            .any(|p| p.get_name() == *k && p.get_value() == *v)
                    })
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    /// Number of series currently set under `name`
    pub fn series_count(&self, name: &str) -> usize {
        self.registry
            .gather()
            .iter()
            .find(|family| family.get_name() == name)
            .map(|family| family.get_metric().len())
            .unwrap_or(0)
    }

    /// Snapshot of every metric family
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition format of the current snapshot
    pub fn encode_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ObservabilityError::Prometheus(e.to_string()))
    }
}

impl Default for GaugeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GaugeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .gauges
            .lock()
            .map(|g| g.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("GaugeRegistry").field("gauges", &names).finish()
    }
}

fn same_names(a: &[String], b: &[String]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}
