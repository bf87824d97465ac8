//! Name-keyed metric factory. The registry exclusively owns every metric
//! instance it creates and deduplicates by name: asking for the same name
//! twice returns the same underlying instance; asking for it under a
//! different metric type is rejected as a type mismatch.

use crate::buckets::BucketConfig;
use crate::entry::MetricKind;
use crate::error::{MetricsError, Result};
use crate::primitives::{LabeledCounter, RateCounter, ValueGauge, ValueHistogram};
use crate::snapshot::MetricFamilySnapshot;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// `description`, `unit`, and `label_names` default to empty; `name` must
/// be non-empty.
#[derive(Clone, Debug)]
pub struct MetricMetadata {
    pub metric_id: u32,
    pub name: String,
    pub description: String,
    pub unit: String,
    pub kind: MetricKind,
    pub label_names: Vec<String>,
}

impl MetricMetadata {
    fn new(metric_id: u32, name: &str, kind: MetricKind) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(MetricsError::EmptyName);
        }
        Ok(Self {
            metric_id,
            name: name.to_string(),
            description: String::new(),
            unit: String::new(),
            kind,
            label_names: Vec::new(),
        })
    }
}

enum Registered {
    Counter(Arc<RateCounter>),
    Gauge(Arc<ValueGauge>),
    Histogram(Arc<ValueHistogram>),
    LabeledCounter(Arc<LabeledCounter>),
}

struct Entry {
    metadata: MetricMetadata,
    instance: Registered,
}

/// Factory + owner for every metric instance created through it.
pub struct MetricRegistry {
    next_id: AtomicU32,
    entries: DashMap<String, Entry>,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self { next_id: AtomicU32::new(1), entries: DashMap::new() }
    }

    fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn counter(&self, name: &str) -> Result<Arc<RateCounter>> {
        if let Some(entry) = self.entries.get(name) {
            return match &entry.instance {
                Registered::Counter(c) => Ok(c.clone()),
                _ => Err(MetricsError::TypeMismatch(name.to_string())),
            };
        }
        let metadata = MetricMetadata::new(self.next_id(), name, MetricKind::RateCounter)?;
        let counter = Arc::new(RateCounter::new());
        self.entries.insert(name.to_string(), Entry { metadata, instance: Registered::Counter(counter.clone()) });
        Ok(counter)
    }

    pub fn gauge(&self, name: &str) -> Result<Arc<ValueGauge>> {
        if let Some(entry) = self.entries.get(name) {
            return match &entry.instance {
                Registered::Gauge(g) => Ok(g.clone()),
                _ => Err(MetricsError::TypeMismatch(name.to_string())),
            };
        }
        let metadata = MetricMetadata::new(self.next_id(), name, MetricKind::Gauge)?;
        let gauge = Arc::new(ValueGauge::new());
        self.entries.insert(name.to_string(), Entry { metadata, instance: Registered::Gauge(gauge.clone()) });
        Ok(gauge)
    }

    pub fn histogram(&self, name: &str, buckets: BucketConfig) -> Result<Arc<ValueHistogram>> {
        if let Some(entry) = self.entries.get(name) {
            return match &entry.instance {
                Registered::Histogram(h) => Ok(h.clone()),
                _ => Err(MetricsError::TypeMismatch(name.to_string())),
            };
        }
        let metadata = MetricMetadata::new(self.next_id(), name, MetricKind::Histogram)?;
        let bounds = buckets.build()?;
        let histogram = Arc::new(ValueHistogram::with_buckets(bounds));
        self.entries
            .insert(name.to_string(), Entry { metadata, instance: Registered::Histogram(histogram.clone()) });
        Ok(histogram)
    }

    pub fn labeled_counter(&self, name: &str, label_names: Vec<String>) -> Result<Arc<LabeledCounter>> {
        if let Some(entry) = self.entries.get(name) {
            return match &entry.instance {
                Registered::LabeledCounter(c) => Ok(c.clone()),
                _ => Err(MetricsError::TypeMismatch(name.to_string())),
            };
        }
        let mut metadata = MetricMetadata::new(self.next_id(), name, MetricKind::LabeledCounter)?;
        let arity = label_names.len();
        metadata.label_names = label_names;
        let counter = Arc::new(LabeledCounter::new(arity));
        self.entries
            .insert(name.to_string(), Entry { metadata, instance: Registered::LabeledCounter(counter.clone()) });
        Ok(counter)
    }

    /// Snapshots every registered metric and resets counters/histograms so
    /// the next aggregation window starts clean. Gauges are not reset —
    /// they represent current state, not an accumulation over the window.
    pub fn snapshot_and_reset(&self) -> Vec<MetricFamilySnapshot> {
        let mut out = Vec::with_capacity(self.entries.len());
        for entry in self.entries.iter() {
            let name = entry.metadata.name.as_str();
            match &entry.instance {
                Registered::Counter(c) => {
                    out.push(MetricFamilySnapshot::Counter(c.snapshot(name)));
                    c.reset();
                }
                Registered::Gauge(g) => {
                    out.push(MetricFamilySnapshot::Gauge(g.snapshot(name)));
                }
                Registered::Histogram(h) => {
                    out.push(MetricFamilySnapshot::Histogram(h.snapshot(name)));
                    h.reset();
                }
                Registered::LabeledCounter(c) => {
                    out.push(MetricFamilySnapshot::LabeledCounter(c.snapshot(name)));
                    c.reset();
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_returns_same_instance_by_name() {
        let reg = MetricRegistry::new();
        let a = reg.counter("requests_total").unwrap();
        let b = reg.counter("requests_total").unwrap();
        a.increment(5);
        assert_eq!(b.value(), 5);
    }

    #[test]
    fn rejects_type_mismatch_on_same_name() {
        let reg = MetricRegistry::new();
        reg.counter("dup").unwrap();
        let err = reg.gauge("dup");
        assert!(matches!(err, Err(MetricsError::TypeMismatch(_))));
    }

    #[test]
    fn rejects_empty_name() {
        let reg = MetricRegistry::new();
        assert!(matches!(reg.counter(""), Err(MetricsError::EmptyName)));
    }

    #[test]
    fn snapshot_and_reset_drains_counters() {
        let reg = MetricRegistry::new();
        let counter = reg.counter("ops").unwrap();
        counter.increment(3);
        let gauge = reg.gauge("queue_depth").unwrap();
        gauge.set(7);
        let snapshot = reg.snapshot_and_reset();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(counter.value(), 0);
        assert_eq!(gauge.value(), 7);
    }
}
