//! Statistics sinks for node-emitted metrics.

use std::collections::HashMap;
use std::sync::RwLock;

/// Receiver for fire-and-forget metric emissions.
///
/// Called synchronously from the driver's action loop, so implementations
/// must not block.
pub trait MetricSink: Send + Sync {
    fn record(&self, metric: &'static str, value: u64);
}

/// Sink that keeps every recorded value in memory, in emission order.
///
/// Interior mutability lets the driver record through a shared handle
/// while the caller keeps a clone for reading the results afterwards.
#[derive(Debug, Default)]
pub struct MemorySink {
    values: RwLock<HashMap<&'static str, Vec<u64>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All values recorded under a metric, in emission order.
    pub fn values(&self, metric: &str) -> Vec<u64> {
        self.values
            .read()
            .map(|m| m.get(metric).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Number of values recorded under a metric.
    pub fn count(&self, metric: &str) -> usize {
        self.values
            .read()
            .map(|m| m.get(metric).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl MetricSink for MemorySink {
    fn record(&self, metric: &'static str, value: u64) {
        if let Ok(mut values) = self.values.write() {
            values.entry(metric).or_default().push(value);
        }
    }
}

/// Sink that discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl MetricSink for NullSink {
    fn record(&self, _metric: &'static str, _value: u64) {}
}
