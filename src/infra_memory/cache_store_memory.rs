use crate::domain_port::{CacheError, CacheStore};
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Single-process TTL cache. Expired entries are evicted lazily on read;
/// explicit deletes take effect before the call returns.
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        MemoryCacheStore {
            entries: DashMap::new(),
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        if let Some(guard) = self.entries.get(key) {
            let entry = guard.value();
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        }
        // read guard dropped above; safe to take the shard write lock
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let store = MemoryCacheStore::new();
        store
            .set("cart:42:items", b"[]".to_vec(), Duration::from_millis(30))
            .await
            .unwrap();
        assert!(store.get("cart:42:items").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.get("cart:42:items").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_takes_effect_before_returning() {
        let store = MemoryCacheStore::new();
        store
            .set("cart:42:items", b"[]".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        store.delete("cart:42:items").await.unwrap();
        assert!(store.get("cart:42:items").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn prefix_delete_does_not_cross_user_boundaries() {
        let store = MemoryCacheStore::new();
        let ttl = Duration::from_secs(60);
        store.set("cart:42:items", b"a".to_vec(), ttl).await.unwrap();
        store.set("cart:42:count", b"b".to_vec(), ttl).await.unwrap();
        store.set("cart:421:items", b"c".to_vec(), ttl).await.unwrap();

        store.delete_prefix("cart:42:").await.unwrap();

        assert!(store.get("cart:42:items").await.unwrap().is_none());
        assert!(store.get("cart:42:count").await.unwrap().is_none());
        assert!(store.get("cart:421:items").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn class_prefix_delete_clears_every_user() {
        let store = MemoryCacheStore::new();
        let ttl = Duration::from_secs(60);
        store.set("promo:42:items", b"a".to_vec(), ttl).await.unwrap();
        store.set("promo:7:items", b"b".to_vec(), ttl).await.unwrap();
        store.set("cart:42:items", b"c".to_vec(), ttl).await.unwrap();

        store.delete_prefix("promo:").await.unwrap();

        assert!(store.get("promo:42:items").await.unwrap().is_none());
        assert!(store.get("promo:7:items").await.unwrap().is_none());
        assert!(store.get("cart:42:items").await.unwrap().is_some());
    }
}
