//! Counter, gauge, histogram, and labeled-counter primitives. Everything
//! here is thread-safe except [`SimpleCounter`], which is a plain
//! double-valued accumulator for single-threaded hot paths.

use crate::cache_aligned::{now_nanos, CacheAlignedCounter, CacheAlignedTimestamp};
use crate::error::{MetricsError, Result};
use crate::snapshot::{CounterSnapshot, HistogramBucket, HistogramSnapshot, MetricSnapshot, RateCounterSnapshot};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::Instant;

/// Non-thread-safe, double-valued counter for single-threaded hot paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleCounter {
    value: f64,
}

impl SimpleCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, amount: f64) {
        self.value += amount;
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

/// 64-bit thread-safe counter with rate queries over elapsed wall time.
#[derive(Debug)]
pub struct RateCounter {
    value: CacheAlignedCounter,
    reset_value: CacheAlignedCounter,
    reset_at: CacheAlignedTimestamp,
    observed_value: CacheAlignedCounter,
    observed_at: CacheAlignedTimestamp,
}

impl Default for RateCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateCounter {
    pub fn new() -> Self {
        Self {
            value: CacheAlignedCounter::new(0),
            reset_value: CacheAlignedCounter::new(0),
            reset_at: CacheAlignedTimestamp::new(),
            observed_value: CacheAlignedCounter::new(0),
            observed_at: CacheAlignedTimestamp::new(),
        }
    }

    pub fn increment(&self, amount: i64) -> i64 {
        self.value.increment(amount)
    }

    pub fn decrement(&self, amount: i64) -> i64 {
        self.value.decrement(amount)
    }

    pub fn set(&self, value: i64) {
        self.value.set(value);
    }

    pub fn value(&self) -> i64 {
        self.value.get()
    }

    pub fn reset(&self) {
        self.value.reset();
        self.reset_value.reset();
        self.reset_at.touch();
        self.observed_value.reset();
        self.observed_at.touch();
    }

    /// Rate since the previous call to `get_rate`. Zero elapsed time
    /// (two calls in the same tick) yields zero rather than dividing by
    /// zero.
    pub fn get_rate(&self) -> f64 {
        let now = now_nanos();
        let elapsed = now - self.observed_at.nanos();
        let current = self.value.get();
        let previous = self.observed_value.get();
        self.observed_value.set(current);
        self.observed_at.touch();
        if elapsed <= 0 {
            return 0.0;
        }
        (current - previous) as f64 / (elapsed as f64 / 1_000_000_000.0)
    }

    /// Rate since the last `reset()`. Zero elapsed time yields zero.
    pub fn get_average_rate(&self) -> f64 {
        let now = now_nanos();
        let elapsed = now - self.reset_at.nanos();
        if elapsed <= 0 {
            return 0.0;
        }
        let current = self.value.get();
        let baseline = self.reset_value.get();
        (current - baseline) as f64 / (elapsed as f64 / 1_000_000_000.0)
    }

    pub fn snapshot(&self, name: &str) -> RateCounterSnapshot {
        RateCounterSnapshot {
            name: name.to_string(),
            value: self.value(),
            rate: self.get_rate(),
            average_rate: self.get_average_rate(),
        }
    }
}

/// 64-bit gauge tracking the timestamp of its last mutation.
#[derive(Debug)]
pub struct ValueGauge {
    value: CacheAlignedCounter,
    last_updated: CacheAlignedTimestamp,
}

impl Default for ValueGauge {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueGauge {
    pub fn new() -> Self {
        Self { value: CacheAlignedCounter::new(0), last_updated: CacheAlignedTimestamp::new() }
    }

    pub fn set(&self, value: i64) {
        self.value.set(value);
        self.last_updated.touch();
    }

    pub fn increment(&self, amount: i64) -> i64 {
        let v = self.value.increment(amount);
        self.last_updated.touch();
        v
    }

    pub fn decrement(&self, amount: i64) -> i64 {
        let v = self.value.decrement(amount);
        self.last_updated.touch();
        v
    }

    pub fn reset(&self) {
        self.value.reset();
        self.last_updated.touch();
    }

    pub fn value(&self) -> i64 {
        self.value.get()
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated.to_datetime()
    }

    pub fn snapshot(&self, name: &str) -> MetricSnapshot {
        MetricSnapshot { name: name.to_string(), value: self.value(), last_updated: self.last_updated() }
    }
}

#[derive(Debug)]
struct HistogramState {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    samples: Vec<f64>,
}

impl Default for HistogramState {
    fn default() -> Self {
        Self { count: 0, sum: 0.0, min: f64::INFINITY, max: f64::NEG_INFINITY, samples: Vec::new() }
    }
}

/// Records `double` observations; supports quantile queries and bucketed
/// snapshots. Protected by a single mutex rather than per-bucket atomics:
/// lock-free summation of floating point values is impractical, so this
/// follows the striped-lock fallback the memory model allows.
#[derive(Debug)]
pub struct ValueHistogram {
    bucket_bounds: Vec<f64>,
    state: Mutex<HistogramState>,
}

impl ValueHistogram {
    pub fn new() -> Self {
        Self::with_buckets(Vec::new())
    }

    pub fn with_buckets(bucket_bounds: Vec<f64>) -> Self {
        Self { bucket_bounds, state: Mutex::new(HistogramState::default()) }
    }

    pub fn record(&self, value: f64) {
        let mut s = self.state.lock();
        s.count += 1;
        s.sum += value;
        if value < s.min {
            s.min = value;
        }
        if value > s.max {
            s.max = value;
        }
        s.samples.push(value);
    }

    pub fn count(&self) -> u64 {
        self.state.lock().count
    }

    pub fn sum(&self) -> f64 {
        self.state.lock().sum
    }

    pub fn mean(&self) -> f64 {
        let s = self.state.lock();
        if s.count == 0 {
            0.0
        } else {
            s.sum / s.count as f64
        }
    }

    pub fn min(&self) -> f64 {
        let s = self.state.lock();
        if s.count == 0 {
            0.0
        } else {
            s.min
        }
    }

    pub fn max(&self) -> f64 {
        let s = self.state.lock();
        if s.count == 0 {
            0.0
        } else {
            s.max
        }
    }

    /// Nearest-rank percentile. `p <= 0` returns `min`, `p >= 100` returns
    /// `max`; intermediate values use nearest-rank over the sorted
    /// samples, consistent with both endpoints.
    pub fn get_percentile(&self, p: f64) -> f64 {
        let s = self.state.lock();
        if s.samples.is_empty() {
            return 0.0;
        }
        if p <= 0.0 {
            return s.min;
        }
        if p >= 100.0 {
            return s.max;
        }
        let mut sorted = s.samples.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
        let idx = rank.saturating_sub(1).min(sorted.len() - 1);
        sorted[idx]
    }

    pub fn reset(&self) {
        *self.state.lock() = HistogramState::default();
    }

    pub fn snapshot(&self, name: &str) -> HistogramSnapshot {
        let s = self.state.lock();
        let buckets = self
            .bucket_bounds
            .iter()
            .map(|&upper_bound| HistogramBucket {
                upper_bound,
                count: s.samples.iter().filter(|&&v| v <= upper_bound).count() as u64,
            })
            .collect();
        HistogramSnapshot {
            name: name.to_string(),
            count: s.count,
            sum: s.sum,
            mean: if s.count == 0 { 0.0 } else { s.sum / s.count as f64 },
            min: if s.count == 0 { 0.0 } else { s.min },
            max: if s.count == 0 { 0.0 } else { s.max },
            buckets,
        }
    }

    pub fn start_timer(&self) -> HistogramTimer<'_> {
        HistogramTimer { histogram: self, start: Instant::now() }
    }

    /// Records the wall-clock milliseconds `action` took to run, even if it
    /// panics (the timer is a drop guard).
    pub fn time<T>(&self, action: impl FnOnce() -> T) -> T {
        let _timer = self.start_timer();
        action()
    }

    /// Records the wall-clock milliseconds `future` took to resolve. The
    /// drop guard records even if the future's task is cancelled or the
    /// awaited body panics during unwind.
    pub async fn time_async<T>(&self, future: impl std::future::Future<Output = T>) -> T {
        let _timer = self.start_timer();
        future.await
    }
}

impl Default for ValueHistogram {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HistogramTimer<'a> {
    histogram: &'a ValueHistogram,
    start: Instant,
}

impl Drop for HistogramTimer<'_> {
    fn drop(&mut self) {
        self.histogram.record(self.start.elapsed().as_secs_f64() * 1000.0);
    }
}

/// Order-sensitive, value-equal set of label values for a fixed arity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn new(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(values.into_iter().map(Into::into).collect())
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }
}

/// Mapping `LabelSet -> counter` for a fixed label arity, backed by a
/// concurrent hash map so independent label combinations never contend on
/// the same lock.
#[derive(Debug)]
pub struct LabeledCounter {
    arity: usize,
    counters: DashMap<LabelSet, CacheAlignedCounter>,
}

impl LabeledCounter {
    pub fn new(arity: usize) -> Self {
        Self { arity, counters: DashMap::new() }
    }

    /// `value` must be non-negative and `labels` must match the counter's
    /// arity.
    pub fn increment(&self, value: i64, labels: LabelSet) -> Result<i64> {
        if value < 0 {
            return Err(MetricsError::NegativeValue(value));
        }
        if labels.arity() != self.arity {
            return Err(MetricsError::LabelArityMismatch { expected: self.arity, got: labels.arity() });
        }
        let entry = self.counters.entry(labels).or_insert_with(|| CacheAlignedCounter::new(0));
        Ok(entry.increment(value))
    }

    pub fn get(&self, labels: &LabelSet) -> i64 {
        self.counters.get(labels).map(|c| c.get()).unwrap_or(0)
    }

    pub fn reset(&self) {
        for counter in self.counters.iter() {
            counter.reset();
        }
    }

    pub fn snapshot(&self, name: &str) -> Vec<CounterSnapshot> {
        self.counters
            .iter()
            .map(|entry| CounterSnapshot {
                name: name.to_string(),
                labels: entry.key().values().to_vec(),
                value: entry.value().get(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_counter_accumulates() {
        let mut c = SimpleCounter::new();
        c.increment(1.0);
        c.increment(2.5);
        assert_eq!(c.value(), 3.5);
        c.reset();
        assert_eq!(c.value(), 0.0);
    }

    #[test]
    fn rate_counter_average_rate_zero_when_no_time_passed() {
        let c = RateCounter::new();
        c.increment(10);
        // elapsed since construction is nonzero in practice, but a second
        // call immediately after reset should still be well-defined
        c.reset();
        assert_eq!(c.value(), 0);
    }

    #[test]
    fn gauge_tracks_last_updated() {
        let g = ValueGauge::new();
        let before = g.last_updated();
        std::thread::sleep(std::time::Duration::from_millis(2));
        g.set(5);
        assert_eq!(g.value(), 5);
        assert!(g.last_updated() >= before);
    }

    #[test]
    fn histogram_percentile_endpoints() {
        let h = ValueHistogram::new();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            h.record(v);
        }
        assert_eq!(h.get_percentile(0.0), 1.0);
        assert_eq!(h.get_percentile(100.0), 5.0);
        assert_eq!(h.count(), 5);
        assert_eq!(h.sum(), 15.0);
        assert_eq!(h.mean(), 3.0);
    }

    #[test]
    fn histogram_snapshot_buckets_are_cumulative() {
        let h = ValueHistogram::with_buckets(vec![1.0, 5.0, 10.0]);
        h.record(0.5);
        h.record(3.0);
        h.record(7.0);
        let snap = h.snapshot("latency");
        assert_eq!(snap.buckets[0].count, 1); // <= 1.0
        assert_eq!(snap.buckets[1].count, 2); // <= 5.0
        assert_eq!(snap.buckets[2].count, 3); // <= 10.0
    }

    #[test]
    fn histogram_reset_clears_state() {
        let h = ValueHistogram::new();
        h.record(42.0);
        h.reset();
        assert_eq!(h.count(), 0);
        assert_eq!(h.min(), 0.0);
    }

    #[test]
    fn labeled_counter_composes_additively() {
        let c = LabeledCounter::new(2);
        let labels = LabelSet::new(["tenant-a", "read"]);
        c.increment(3, labels.clone()).unwrap();
        c.increment(4, labels.clone()).unwrap();
        assert_eq!(c.get(&labels), 7);
    }

    #[test]
    fn labeled_counter_rejects_arity_mismatch() {
        let c = LabeledCounter::new(2);
        let err = c.increment(1, LabelSet::new(["only-one"]));
        assert!(matches!(err, Err(MetricsError::LabelArityMismatch { expected: 2, got: 1 })));
    }

    #[test]
    fn labeled_counter_rejects_negative_value() {
        let c = LabeledCounter::new(1);
        let err = c.increment(-1, LabelSet::new(["a"]));
        assert!(matches!(err, Err(MetricsError::NegativeValue(-1))));
    }

    #[tokio::test]
    async fn time_async_records_elapsed_even_on_early_return() {
        let h = ValueHistogram::new();
        let result: Result<()> = h
            .time_async(async {
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                Err(MetricsError::Disposed("boom".to_string()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(h.count(), 1);
    }
}
