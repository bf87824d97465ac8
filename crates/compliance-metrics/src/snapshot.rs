//! Value-equal snapshot records produced by `MetricRegistry::snapshot_and_reset`
//! and delivered to `MetricAggregator` window callbacks.

use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq)]
pub struct CounterSnapshot {
    pub name: String,
    pub labels: Vec<String>,
    pub value: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RateCounterSnapshot {
    pub name: String,
    pub value: i64,
    pub rate: f64,
    pub average_rate: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetricSnapshot {
    pub name: String,
    pub value: i64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistogramBucket {
    pub upper_bound: f64,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistogramSnapshot {
    pub name: String,
    pub count: u64,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub buckets: Vec<HistogramBucket>,
}

/// One entry in the array handed to a window callback; which variant
/// depends on which primitive produced it.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricFamilySnapshot {
    Counter(RateCounterSnapshot),
    Gauge(MetricSnapshot),
    Histogram(HistogramSnapshot),
    LabeledCounter(Vec<CounterSnapshot>),
}
