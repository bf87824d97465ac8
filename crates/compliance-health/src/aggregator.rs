//! `HealthCheckAggregator`: runs every registered [`HealthCheck`]
//! concurrently, bounds each by a timeout, and composes an overall
//! [`HealthStatus`] as the worst of its constituents — the check-logic half
//! of the health check, with the transport-exposure half left to the
//! embedding application.

use crate::check::{CheckResult, HealthCheck, HealthStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;

#[derive(Clone, Debug)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: Vec<CheckResult>,
    pub generated_at: DateTime<Utc>,
}

pub struct HealthCheckAggregator {
    checks: Vec<Arc<dyn HealthCheck>>,
    per_check_timeout: StdDuration,
}

impl HealthCheckAggregator {
    pub fn new(checks: Vec<Arc<dyn HealthCheck>>, per_check_timeout: StdDuration) -> Self {
        Self { checks, per_check_timeout }
    }

    /// Runs all checks concurrently. A check that doesn't return within
    /// `per_check_timeout` is reported `Unhealthy` with a timeout message
    /// rather than stalling the whole report.
    pub async fn run(&self) -> HealthReport {
        let futures = self.checks.iter().map(|check| {
            let timeout = self.per_check_timeout;
            async move {
                match tokio::time::timeout(timeout, check.check()).await {
                    Ok(result) => result,
                    Err(_) => CheckResult::unhealthy(check.name(), timeout, "health check timed out"),
                }
            }
        });
        let checks: Vec<CheckResult> = futures::future::join_all(futures).await;
        let status = checks.iter().map(|c| c.status).max().unwrap_or(HealthStatus::Healthy);
        HealthReport { status, checks, generated_at: Utc::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct AlwaysHealthy;
    #[async_trait]
    impl HealthCheck for AlwaysHealthy {
        fn name(&self) -> &str {
            "always_healthy"
        }
        async fn check(&self) -> CheckResult {
            CheckResult::healthy(self.name(), StdDuration::from_millis(1))
        }
    }

    struct AlwaysUnhealthy;
    #[async_trait]
    impl HealthCheck for AlwaysUnhealthy {
        fn name(&self) -> &str {
            "always_unhealthy"
        }
        async fn check(&self) -> CheckResult {
            CheckResult::unhealthy(self.name(), StdDuration::from_millis(1), "boom")
        }
    }

    struct NeverReturns;
    #[async_trait]
    impl HealthCheck for NeverReturns {
        fn name(&self) -> &str {
            "never_returns"
        }
        async fn check(&self) -> CheckResult {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn overall_status_is_worst_of_all_checks() {
        let aggregator = HealthCheckAggregator::new(
            vec![Arc::new(AlwaysHealthy), Arc::new(AlwaysUnhealthy)],
            StdDuration::from_secs(1),
        );
        let report = aggregator.run().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.checks.len(), 2);
    }

    #[tokio::test]
    async fn all_healthy_reports_healthy() {
        let aggregator = HealthCheckAggregator::new(vec![Arc::new(AlwaysHealthy)], StdDuration::from_secs(1));
        let report = aggregator.run().await;
        assert_eq!(report.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn timed_out_check_counts_as_unhealthy() {
        let aggregator =
            HealthCheckAggregator::new(vec![Arc::new(NeverReturns)], StdDuration::from_millis(10));
        let report = aggregator.run().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(report.checks[0].message.as_deref().unwrap().contains("timed out"));
    }
}
