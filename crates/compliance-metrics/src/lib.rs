//! # Metrics Core
//!
//! A lock-free, cache-line-aware in-process metrics system: counters,
//! gauges, histograms, labeled counters, rate counters, and time-windowed
//! aggregation with pluggable emission callbacks. Standalone leaf crate —
//! no dependency on the compliance data model, so any subsystem can
//! instrument itself against it.

pub mod aggregator;
pub mod buckets;
pub mod cache_aligned;
pub mod entry;
pub mod error;
pub mod primitives;
pub mod registry;
pub mod snapshot;

pub use aggregator::{MetricAggregator, WindowCallback};
pub use buckets::BucketConfig;
pub use cache_aligned::{AlignedBuffer, CacheAlignedCounter, CacheAlignedTimestamp, CACHE_LINE};
pub use entry::{MetricEntry, MetricKind};
pub use error::{MetricsError, Result};
pub use primitives::{LabelSet, LabeledCounter, RateCounter, SimpleCounter, ValueGauge, ValueHistogram};
pub use registry::{MetricMetadata, MetricRegistry};
pub use snapshot::{CounterSnapshot, HistogramBucket, HistogramSnapshot, MetricFamilySnapshot, MetricSnapshot, RateCounterSnapshot};
