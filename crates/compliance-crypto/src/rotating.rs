//! `RotatingEncryptionProvider`: wraps any provider with opportunistic
//! key rotation before encrypt and opportunistic re-encryption on read.

use crate::provider::EncryptionProvider;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use compliance_types::{
    ComplianceError, EncryptedData, EncryptionAlgorithm, EncryptionContext, KeyManagementProvider, Result,
};
use parking_lot::RwLock;
use std::sync::Arc;

const DEFAULT_MAX_KEY_AGE_DAYS: i64 = 90;

pub struct RotatingEncryptionProviderOptions {
    pub auto_rotate_before_encryption: bool,
    pub re_encrypt_on_read: bool,
    pub max_key_age: Duration,
}

impl Default for RotatingEncryptionProviderOptions {
    fn default() -> Self {
        Self {
            auto_rotate_before_encryption: false,
            re_encrypt_on_read: true,
            max_key_age: Duration::days(DEFAULT_MAX_KEY_AGE_DAYS),
        }
    }
}

pub struct RotatingEncryptionProvider {
    inner: Arc<dyn EncryptionProvider>,
    key_management: Arc<dyn KeyManagementProvider>,
    options: RotatingEncryptionProviderOptions,
    disposed: RwLock<bool>,
}

impl RotatingEncryptionProvider {
    pub fn new(
        inner: Arc<dyn EncryptionProvider>,
        key_management: Arc<dyn KeyManagementProvider>,
        options: RotatingEncryptionProviderOptions,
    ) -> Self {
        Self {
            inner,
            key_management,
            options,
            disposed: RwLock::new(false),
        }
    }

    fn check_disposed(&self) -> Result<()> {
        if *self.disposed.read() {
            return Err(ComplianceError::Disposed("RotatingEncryptionProvider".to_string()));
        }
        Ok(())
    }

    /// Best-effort rotation check ahead of an encrypt call.
    async fn maybe_rotate(&self, purpose: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if !self.options.auto_rotate_before_encryption {
            return Ok(());
        }
        let active = self.key_management.get_active_key(purpose).await?;
        if now - active.created_at > self.options.max_key_age {
            self.key_management
                .rotate_key(&active.key_id, active.algorithm, purpose, None)
                .await?;
        }
        Ok(())
    }

    /// Returns the same instance if `encrypted` is already under the
    /// current active key, otherwise decrypts then re-encrypts under it.
    pub async fn re_encrypt(&self, encrypted: &EncryptedData, ctx: &EncryptionContext) -> Result<EncryptedData> {
        self.check_disposed()?;
        let active = self.key_management.get_active_key(ctx.purpose.as_deref()).await?;
        if encrypted.key_id == active.key_id && encrypted.key_version == active.version {
            return Ok(encrypted.clone());
        }
        let plaintext = self.inner.decrypt(encrypted, ctx).await?;
        let mut fresh_ctx = ctx.clone();
        fresh_ctx.key_id = Some(active.key_id);
        fresh_ctx.key_version = Some(active.version);
        self.inner.encrypt(&plaintext, &fresh_ctx).await
    }

    /// Idempotent: safe to call more than once.
    pub async fn dispose(&self) {
        *self.disposed.write() = true;
    }
}

#[async_trait]
impl EncryptionProvider for RotatingEncryptionProvider {
    fn provider_id(&self) -> &str {
        self.inner.provider_id()
    }

    fn supported_algorithms(&self) -> &[EncryptionAlgorithm] {
        self.inner.supported_algorithms()
    }

    async fn encrypt(&self, plaintext: &[u8], ctx: &EncryptionContext) -> Result<EncryptedData> {
        self.check_disposed()?;
        self.maybe_rotate(ctx.purpose.as_deref(), Utc::now()).await?;
        self.inner.encrypt(plaintext, ctx).await
    }

    async fn decrypt(&self, encrypted: &EncryptedData, ctx: &EncryptionContext) -> Result<Vec<u8>> {
        self.check_disposed()?;
        self.inner.decrypt(encrypted, ctx).await
    }

    fn can_decrypt(&self, encrypted: &EncryptedData) -> bool {
        self.inner.can_decrypt(encrypted)
    }

    fn validate_fips_compliance(&self) -> bool {
        self.inner.validate_fips_compliance()
    }
}
