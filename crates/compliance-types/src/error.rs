//! Error taxonomy for the compliance runtime.
//!
//! Every subsystem crate wraps its own error enum in [`ComplianceError`] so
//! that the facade (`compliance`) can surface a single type to the embedding
//! application while still preserving the stable integer codes crypto and
//! backup failures carry across the wire.

use thiserror::Error;

/// Stable codes for encryption/decryption failures, preserved across the
/// wire and used in tests (`EncryptionErrorCode` in spec terms).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum EncryptionErrorCode {
    UnsupportedAlgorithm = 1,
    AuthenticationFailed = 2,
    FipsViolation = 3,
    KeyNotFound = 4,
    MalformedEnvelope = 5,
    ProviderNotFound = 6,
}

/// Stable codes for master-key backup failures (`MasterKeyBackupErrorCode`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MasterKeyBackupErrorCode {
    KeyNotFound = 1,
    ShareMismatch = 2,
    InsufficientShares = 3,
    BackupExpired = 4,
    InvalidShare = 5,
}

/// The top-level error kind every compliance-runtime crate resolves to.
#[derive(Debug, Error)]
pub enum ComplianceError {
    /// Null/invalid construction arguments, missing signing key, unsupported
    /// algorithm choice at setup time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Registry duplicate id, unknown primary, unregistered legacy id,
    /// failover state violations.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// Malformed erasure request (empty subject, missing tenant/categories).
    #[error("erasure request validation failed: {0}")]
    ErasureValidation(String),

    /// Request or execution blocked by an active legal hold.
    #[error("blocked by legal hold: {0}")]
    LegalHoldBlocked(String),

    /// Cancel on terminal state, double fulfillment, concurrent execute
    /// loss.
    #[error("invalid state transition: {0}")]
    StateTransition(String),

    /// Referenced key absent from the provider.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Decryption auth failure, FIPS violation, unsupported ciphertext.
    #[error("cryptographic error ({code:?}): {message}")]
    Crypto {
        code: EncryptionErrorCode,
        message: String,
    },

    /// Share mismatch, insufficient shares, expired share/backup.
    #[error("backup invariant violated ({code:?}): {message}")]
    BackupInvariant {
        code: MasterKeyBackupErrorCode,
        message: String,
    },

    /// Operation attempted after component disposal.
    #[error("component disposed: {0}")]
    Disposed(String),

    /// Cooperative cancellation.
    #[error("operation cancelled")]
    Cancelled,

    /// Catch-all for collaborator failures the caller can't recover (e.g.
    /// store I/O) that still need to propagate as `ComplianceError`.
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ComplianceError>;

impl ComplianceError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub fn crypto(code: EncryptionErrorCode, msg: impl Into<String>) -> Self {
        Self::Crypto {
            code,
            message: msg.into(),
        }
    }

    pub fn backup(code: MasterKeyBackupErrorCode, msg: impl Into<String>) -> Self {
        Self::BackupInvariant {
            code,
            message: msg.into(),
        }
    }
}
