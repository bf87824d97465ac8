//! Name-keyed encryption provider registry.
//!
//! Exclusive writes, shared reads: a single `RwLock`-guarded map plus a
//! primary slot and an ordered legacy list. Lookups are case-insensitive —
//! ids are normalized to lowercase on every operation.

use crate::provider::EncryptionProvider;
use compliance_types::{ComplianceError, EncryptedData, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

struct Inner {
    providers: HashMap<String, Arc<dyn EncryptionProvider>>,
    primary: Option<String>,
    legacy: Vec<String>,
}

pub struct EncryptionProviderRegistry {
    inner: RwLock<Inner>,
}

impl Default for EncryptionProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptionProviderRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                providers: HashMap::new(),
                primary: None,
                legacy: Vec::new(),
            }),
        }
    }

    fn norm(id: &str) -> String {
        id.to_ascii_lowercase()
    }

    pub fn register(&self, id: &str, provider: Arc<dyn EncryptionProvider>) -> Result<()> {
        let key = Self::norm(id);
        let mut inner = self.inner.write();
        if inner.providers.contains_key(&key) {
            return Err(ComplianceError::invariant(format!("provider '{id}' already registered")));
        }
        inner.providers.insert(key, provider);
        Ok(())
    }

    pub fn get_provider(&self, id: &str) -> Option<Arc<dyn EncryptionProvider>> {
        self.inner.read().providers.get(&Self::norm(id)).cloned()
    }

    pub fn set_primary(&self, id: &str) -> Result<()> {
        let key = Self::norm(id);
        let mut inner = self.inner.write();
        if !inner.providers.contains_key(&key) {
            return Err(ComplianceError::invariant(format!("cannot set unregistered provider '{id}' as primary")));
        }
        inner.legacy.retain(|existing| existing != &key);
        inner.primary = Some(key);
        Ok(())
    }

    pub fn get_primary(&self) -> Result<Arc<dyn EncryptionProvider>> {
        let inner = self.inner.read();
        let key = inner
            .primary
            .as_ref()
            .ok_or_else(|| ComplianceError::invariant("no primary provider set"))?;
        inner
            .providers
            .get(key)
            .cloned()
            .ok_or_else(|| ComplianceError::invariant("primary provider id no longer registered"))
    }

    pub fn add_legacy_provider(&self, id: &str) -> Result<()> {
        let key = Self::norm(id);
        let mut inner = self.inner.write();
        if !inner.providers.contains_key(&key) {
            return Err(ComplianceError::invariant(format!("cannot add unregistered provider '{id}' as legacy")));
        }
        if !inner.legacy.contains(&key) {
            inner.legacy.push(key);
        }
        Ok(())
    }

    pub fn get_legacy_providers(&self) -> Vec<Arc<dyn EncryptionProvider>> {
        let inner = self.inner.read();
        inner
            .legacy
            .iter()
            .filter_map(|id| inner.providers.get(id).cloned())
            .collect()
    }

    /// Scans primary then legacy, in order, for the first provider whose
    /// `can_decrypt` accepts `encrypted`.
    pub fn find_decryption_provider(&self, encrypted: &EncryptedData) -> Option<Arc<dyn EncryptionProvider>> {
        let inner = self.inner.read();
        let mut candidates: Vec<&String> = Vec::with_capacity(1 + inner.legacy.len());
        if let Some(primary) = &inner.primary {
            candidates.push(primary);
        }
        candidates.extend(inner.legacy.iter());

        candidates
            .into_iter()
            .filter_map(|id| inner.providers.get(id))
            .find(|provider| provider.can_decrypt(encrypted))
            .cloned()
    }

    pub fn get_all(&self) -> Vec<Arc<dyn EncryptionProvider>> {
        self.inner.read().providers.values().cloned().collect()
    }
}
