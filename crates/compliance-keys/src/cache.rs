//! `KeyCache`: a `key_id -> (metadata, expires_at)` map with a
//! single-flight `get_or_add` and an optional sliding-expiration mode.

use chrono::{DateTime, Duration, Utc};
use compliance_types::{ComplianceError, KeyMetadata, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

struct Entry {
    metadata: KeyMetadata,
    ttl: Option<Duration>,
    expires_at: Option<DateTime<Utc>>,
}

/// `key_id -> (metadata, expires_at)`, single-flight per key on miss.
pub struct KeyCache {
    entries: DashMap<String, Entry>,
    in_flight: DashMap<String, Arc<OnceCell<Option<KeyMetadata>>>>,
    sliding_expiration: bool,
    disposed: RwLock<bool>,
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(false)
    }
}

impl KeyCache {
    pub fn new(sliding_expiration: bool) -> Self {
        Self {
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            sliding_expiration,
            disposed: RwLock::new(false),
        }
    }

    fn check_disposed(&self) -> Result<()> {
        if *self.disposed.read() {
            return Err(ComplianceError::Disposed("KeyCache".to_string()));
        }
        Ok(())
    }

    fn is_live(entry: &Entry, now: DateTime<Utc>) -> bool {
        entry.expires_at.map(|exp| exp > now).unwrap_or(true)
    }

    pub fn try_get(&self, key_id: &str) -> Result<Option<KeyMetadata>> {
        self.check_disposed()?;
        let now = Utc::now();
        if let Some(mut entry) = self.entries.get_mut(key_id) {
            if !Self::is_live(&entry, now) {
                drop(entry);
                self.entries.remove(key_id);
                return Ok(None);
            }
            if self.sliding_expiration {
                if let Some(ttl) = entry.ttl {
                    entry.expires_at = Some(now + ttl);
                }
            }
            return Ok(Some(entry.metadata.clone()));
        }
        Ok(None)
    }

    pub fn set(&self, metadata: KeyMetadata, ttl: Option<Duration>) -> Result<()> {
        self.check_disposed()?;
        let expires_at = ttl.map(|d| Utc::now() + d);
        self.entries
            .insert(metadata.key_id.clone(), Entry { metadata, ttl, expires_at });
        Ok(())
    }

    pub fn remove(&self, key_id: &str) -> Result<()> {
        self.check_disposed()?;
        self.entries.remove(key_id);
        Ok(())
    }

    /// Alias for `remove`, kept since callers expect both names.
    pub fn invalidate(&self, key_id: &str) -> Result<()> {
        self.remove(key_id)
    }

    pub fn clear(&self) -> Result<()> {
        self.check_disposed()?;
        self.entries.clear();
        Ok(())
    }

    pub fn dispose(&self) {
        *self.disposed.write() = true;
        self.entries.clear();
        self.in_flight.clear();
    }

    /// Single-flight cache-or-load: concurrent misses for the same
    /// `key_id` collapse onto one `loader` call. `None` results from the
    /// loader are never cached.
    pub async fn get_or_add<F, Fut>(&self, key_id: &str, ttl: Option<Duration>, loader: F) -> Result<Option<KeyMetadata>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<KeyMetadata>>>,
    {
        self.check_disposed()?;
        if let Some(found) = self.try_get(key_id)? {
            return Ok(Some(found));
        }

        let cell = self
            .in_flight
            .entry(key_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let result = cell
            .get_or_try_init(|| async { loader().await })
            .await?
            .clone();

        // First caller to finish clears the in-flight slot so a future
        // miss (e.g. after eviction) triggers a fresh load rather than
        // reusing a stale `OnceCell`.
        self.in_flight.remove_if(key_id, |_, v| Arc::ptr_eq(v, &cell));

        if let Some(metadata) = &result {
            self.set(metadata.clone(), ttl)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_types::{EncryptionAlgorithm, KeyStatus};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc as StdArc;

    fn sample_key(id: &str) -> KeyMetadata {
        KeyMetadata {
            key_id: id.to_string(),
            version: 1,
            algorithm: EncryptionAlgorithm::Aes256Gcm,
            status: KeyStatus::Active,
            created_at: Utc::now(),
            expires_at: None,
            last_rotated_at: None,
            purpose: None,
            is_fips_compliant: true,
        }
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = KeyCache::default();
        cache.set(sample_key("k1"), None).unwrap();
        let found = cache.try_get("k1").unwrap().unwrap();
        assert_eq!(found.key_id, "k1");
    }

    #[tokio::test]
    async fn expired_entry_is_evicted_on_read() {
        let cache = KeyCache::default();
        cache.set(sample_key("k1"), Some(Duration::milliseconds(-1))).unwrap();
        assert!(cache.try_get("k1").unwrap().is_none());
    }

    #[tokio::test]
    async fn disposed_cache_rejects_operations() {
        let cache = KeyCache::default();
        cache.dispose();
        assert!(cache.try_get("k1").is_err());
        assert!(cache.set(sample_key("k1"), None).is_err());
    }

    #[tokio::test]
    async fn get_or_add_collapses_concurrent_loaders() {
        let cache = StdArc::new(KeyCache::default());
        let calls = StdArc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_add("k1", None, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        Ok(Some(sample_key("k1")))
                    })
                    .await
            }));
        }
        for h in handles {
            assert!(h.await.unwrap().unwrap().is_some());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn null_loader_result_is_not_cached() {
        let cache = KeyCache::default();
        let result = cache.get_or_add("missing", None, || async { Ok(None) }).await.unwrap();
        assert!(result.is_none());
        assert!(cache.try_get("missing").unwrap().is_none());
    }
}
