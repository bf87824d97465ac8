//! Facade configuration.
//!
//! One top-level struct grouping a settings struct per subsystem, all
//! `serde`-derived, loaded via `toml::from_str` over a file read from disk
//! and falling back to `Default` when no file is given.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComplianceOptions {
    pub crypto: CryptoSettings,
    pub erasure: ErasureSettings,
    pub legal_hold: LegalHoldSettings,
    pub multi_region: MultiRegionSettings,
    pub metrics: MetricsSettings,
    pub health: HealthSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CryptoSettings {
    /// Require providers and keys to report FIPS compliance.
    pub require_fips_compliance: bool,
    /// Mirrors `RotatingEncryptionProvider::AutoRotateBeforeEncryption`.
    pub auto_rotate_before_encryption: bool,
    /// Mirrors `RotatingEncryptionProvider::ReEncryptOnRead`.
    pub re_encrypt_on_read: bool,
    pub max_key_age_days: i64,
}

impl Default for CryptoSettings {
    fn default() -> Self {
        Self {
            require_fips_compliance: false,
            auto_rotate_before_encryption: false,
            re_encrypt_on_read: true,
            max_key_age_days: 90,
        }
    }
}

/// Grace-period bounds and scheduler cadence. The certificate
/// signing key has no default: its absence is a configuration
/// error raised at construction time, not silently defaulted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErasureSettings {
    pub default_grace_period_hours: i64,
    pub minimum_grace_period_hours: i64,
    pub maximum_grace_period_days: i64,
    /// Hex-encoded HMAC-SHA-256 signing key, >= 32 bytes once decoded.
    pub certificate_signing_key_hex: Option<String>,
    pub scheduler_poll_interval_secs: u64,
    pub scheduler_batch_size: usize,
    pub scheduler_request_timeout_secs: u64,
}

impl Default for ErasureSettings {
    fn default() -> Self {
        Self {
            default_grace_period_hours: 72,
            minimum_grace_period_hours: 1,
            maximum_grace_period_days: 30,
            certificate_signing_key_hex: None,
            scheduler_poll_interval_secs: 60,
            scheduler_batch_size: 50,
            scheduler_request_timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LegalHoldSettings {
    pub expiration_poll_interval_secs: u64,
}

impl Default for LegalHoldSettings {
    fn default() -> Self {
        Self { expiration_poll_interval_secs: 300 }
    }
}

/// `enabled = false` (the default) means the facade wires a single
/// in-memory key-management provider with no failover wrapper; the
/// secondary region and its background health-check task only exist when
/// a caller opts in via `ComplianceRuntimeBuilder::with_secondary_region`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultiRegionSettings {
    pub enabled: bool,
    pub health_check_interval_secs: u64,
    pub enable_automatic_failover: bool,
    pub failover_threshold: u32,
    pub operation_timeout_secs: u64,
}

impl Default for MultiRegionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            health_check_interval_secs: 30,
            enable_automatic_failover: false,
            failover_threshold: 3,
            operation_timeout_secs: 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsSettings {
    pub aggregation_window_secs: u64,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { aggregation_window_secs: 60 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthSettings {
    pub per_check_timeout_ms: u64,
    pub erasure_backlog_degraded_threshold: usize,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self { per_check_timeout_ms: 500, erasure_backlog_degraded_threshold: 500 }
    }
}

impl Default for ComplianceOptions {
    fn default() -> Self {
        Self {
            crypto: CryptoSettings::default(),
            erasure: ErasureSettings::default(),
            legal_hold: LegalHoldSettings::default(),
            multi_region: MultiRegionSettings::default(),
            metrics: MetricsSettings::default(),
            health: HealthSettings::default(),
        }
    }
}

impl ComplianceOptions {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn signing_key(&self) -> anyhow::Result<Vec<u8>> {
        let hex_str = self
            .erasure
            .certificate_signing_key_hex
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("erasure.certificate_signing_key_hex is required"))?;
        Ok(hex::decode(hex_str)?)
    }
}
