//! # Compliance Runtime
//!
//! Facade crate: composes every `compliance-*` subsystem crate into a
//! single [`ComplianceRuntime`] an embedding message-dispatch platform can
//! construct once at start-up and hold for the life of the process.
//!
//! Subsystems are split by concern into one crate per bounded
//! responsibility: `compliance-types` (shared data model), `compliance-metrics`
//! (independent lock-free instrumentation core), `compliance-crypto`
//! (envelope encryption, key rotation, Shamir splitting),
//! `compliance-keys` (key-management providers, multi-region failover,
//! caching), `compliance-backup` (master-key backup/recovery),
//! `compliance-legal-hold` / `compliance-inventory` (retention gating and
//! data-location tracking), `compliance-erasure` (the GDPR erasure state
//! machine, scheduler, cascade resolver, verification), `compliance-
//! decorators` (transparent store encryption), and `compliance-health`
//! (liveness probes over all of the above). This crate only wires them
//! together — see [`runtime::ComplianceRuntimeBuilder`].

pub mod config;
pub mod runtime;

pub use config::{ComplianceOptions, CryptoSettings, ErasureSettings, HealthSettings, LegalHoldSettings, MetricsSettings, MultiRegionSettings};
pub use runtime::{ComplianceRuntime, ComplianceRuntimeBuilder, SecondaryRegion};

#[cfg(test)]
mod tests {
    use super::*;

    fn options_with_signing_key() -> ComplianceOptions {
        let mut options = ComplianceOptions::default();
        options.erasure.certificate_signing_key_hex = Some("11".repeat(32));
        options.legal_hold.expiration_poll_interval_secs = 3600;
        options.erasure.scheduler_poll_interval_secs = 3600;
        options.metrics.aggregation_window_secs = 0;
        options
    }

    #[tokio::test]
    async fn builds_runtime_with_in_memory_defaults() {
        let runtime = ComplianceRuntimeBuilder::new(options_with_signing_key())
            .build()
            .await
            .expect("runtime should build from default in-memory wiring");

        let report = runtime.health.run().await;
        assert!(report.checks.len() >= 4);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn missing_signing_key_fails_to_build() {
        let options = ComplianceOptions::default();
        let result = ComplianceRuntimeBuilder::new(options).build().await;
        assert!(result.is_err());
    }
}
