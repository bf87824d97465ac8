//! Histogram bucket boundary configurations.

use crate::error::{MetricsError, Result};

/// Upper-bound generators for [`crate::primitives::ValueHistogram`]. All
/// reject non-finite or non-positive parameters.
#[derive(Clone, Debug)]
pub enum BucketConfig {
    /// Exponentially-spaced seconds starting at 5ms — suited to operation
    /// latency.
    DefaultLatency,
    /// Exponentially-spaced bytes — suited to payload/message sizes.
    DefaultSize,
    Exponential { start: f64, factor: f64, count: usize },
    Linear { start: f64, width: f64, count: usize },
}

impl BucketConfig {
    pub fn build(&self) -> Result<Vec<f64>> {
        match self {
            BucketConfig::DefaultLatency => exponential_bounds(0.005, 2.0, 12),
            BucketConfig::DefaultSize => exponential_bounds(64.0, 2.0, 16),
            BucketConfig::Exponential { start, factor, count } => exponential_bounds(*start, *factor, *count),
            BucketConfig::Linear { start, width, count } => linear_bounds(*start, *width, *count),
        }
    }
}

fn exponential_bounds(start: f64, factor: f64, count: usize) -> Result<Vec<f64>> {
    if !start.is_finite() || start <= 0.0 {
        return Err(MetricsError::InvalidBucketConfig("start must be finite and positive".to_string()));
    }
    if !factor.is_finite() || factor <= 1.0 {
        return Err(MetricsError::InvalidBucketConfig("factor must be finite and greater than 1".to_string()));
    }
    if count == 0 {
        return Err(MetricsError::InvalidBucketConfig("count must be positive".to_string()));
    }
    let mut bounds = Vec::with_capacity(count);
    let mut bound = start;
    for _ in 0..count {
        bounds.push(bound);
        bound *= factor;
    }
    Ok(bounds)
}

fn linear_bounds(start: f64, width: f64, count: usize) -> Result<Vec<f64>> {
    if !start.is_finite() {
        return Err(MetricsError::InvalidBucketConfig("start must be finite".to_string()));
    }
    if !width.is_finite() || width <= 0.0 {
        return Err(MetricsError::InvalidBucketConfig("width must be finite and positive".to_string()));
    }
    if count == 0 {
        return Err(MetricsError::InvalidBucketConfig("count must be positive".to_string()));
    }
    Ok((0..count).map(|i| start + width * i as f64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_latency_is_increasing() {
        let bounds = BucketConfig::DefaultLatency.build().unwrap();
        assert_eq!(bounds.len(), 12);
        assert!(bounds.windows(2).all(|w| w[1] > w[0]));
        assert!((bounds[0] - 0.005).abs() < f64::EPSILON);
    }

    #[test]
    fn linear_bounds_are_evenly_spaced() {
        let bounds = BucketConfig::Linear { start: 0.0, width: 10.0, count: 5 }.build().unwrap();
        assert_eq!(bounds, vec![0.0, 10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn rejects_non_positive_factor() {
        let err = BucketConfig::Exponential { start: 1.0, factor: 1.0, count: 3 }.build();
        assert!(err.is_err());
    }

    #[test]
    fn rejects_non_finite_start() {
        let err = BucketConfig::Exponential { start: f64::NAN, factor: 2.0, count: 3 }.build();
        assert!(err.is_err());
    }

    #[test]
    fn rejects_zero_count() {
        assert!(BucketConfig::Linear { start: 0.0, width: 1.0, count: 0 }.build().is_err());
    }
}
