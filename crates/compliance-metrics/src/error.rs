//! Metrics-local error taxonomy. Kept separate from the compliance error
//! type in `compliance-types` since this crate has no GDPR-specific
//! concerns — it is a leaf dependency consumed by any subsystem that wants
//! in-process counters.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metric name must not be empty")]
    EmptyName,
    #[error("metric '{0}' is already registered under a different metric type")]
    TypeMismatch(String),
    #[error("label set arity mismatch: expected {expected}, got {got}")]
    LabelArityMismatch { expected: usize, got: usize },
    #[error("counter value must be non-negative, got {0}")]
    NegativeValue(i64),
    #[error("invalid histogram bucket configuration: {0}")]
    InvalidBucketConfig(String),
    #[error("malformed metric entry: {0}")]
    MalformedEntry(String),
    #[error("component disposed: {0}")]
    Disposed(String),
}

pub type Result<T> = std::result::Result<T, MetricsError>;
