//! The `HealthCheck` capability every probe in this crate implements, and
//! the three-valued status that gets reported up to the embedding
//! application's transport layer — which is out of scope here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration as StdDuration;

/// Ordered worst-to-best as `Unhealthy > Degraded > Healthy`; the
/// aggregator's overall status is the worst of its constituent checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

#[derive(Clone, Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub latency: StdDuration,
    pub checked_at: DateTime<Utc>,
}

impl CheckResult {
    pub fn healthy(name: impl Into<String>, latency: StdDuration) -> Self {
        Self { name: name.into(), status: HealthStatus::Healthy, message: None, latency, checked_at: Utc::now() }
    }

    pub fn degraded(name: impl Into<String>, latency: StdDuration, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Degraded,
            message: Some(message.into()),
            latency,
            checked_at: Utc::now(),
        }
    }

    pub fn unhealthy(name: impl Into<String>, latency: StdDuration, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            latency,
            checked_at: Utc::now(),
        }
    }
}

/// A single probe against one subsystem. Implementations must be cheap and
/// must never panic — a failing collaborator is reported as `Unhealthy`,
/// not propagated as a Rust error, since the aggregator's job is to keep
/// reporting even when everything underneath it is down.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self) -> CheckResult;
}
