use crate::application_port::DomainError;
use crate::domain_model::UserId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache store error: {0}")]
    Store(String),
}

/// Key/value store with per-entry TTL and prefix-scoped deletion. Once
/// `delete`/`delete_prefix` returns, no subsequent `get` may observe the
/// removed value.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    async fn delete_prefix(&self, prefix: &str) -> Result<(), CacheError>;
}

/// Cache-aside helper for one resource class. Keys follow
/// `{class}:{user}:{facet}`; the trailing separator keeps the per-user
/// prefix unambiguous (user 42 vs user 421). Values are JSON bytes.
///
/// Read-side cache trouble (store error, undecodable entry) degrades to a
/// miss; write-side trouble keeps the computed value flowing to the
/// caller. Invalidation trouble is never swallowed: it is retried once and
/// then surfaced, since a stale entry would otherwise live until TTL.
pub struct ResourceCache {
    store: Arc<dyn CacheStore>,
    class: &'static str,
    ttl: Duration,
}

impl ResourceCache {
    pub fn new(store: Arc<dyn CacheStore>, class: &'static str, ttl: Duration) -> Self {
        ResourceCache { store, class, ttl }
    }

    pub fn items_key(&self, user: UserId) -> String {
        format!("{}:{}:items", self.class, user)
    }

    pub fn count_key(&self, user: UserId) -> String {
        format!("{}:{}:count", self.class, user)
    }

    fn user_prefix(&self, user: UserId) -> String {
        format!("{}:{}:", self.class, user)
    }

    fn class_prefix(&self) -> String {
        format!("{}:", self.class)
    }

    pub async fn get_or_set<T, F, Fut>(&self, key: &str, compute: F) -> Result<T, DomainError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DomainError>> + Send,
    {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_slice(&raw) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(key, "dropping undecodable cache entry: {e}");
                    let _ = self.store.delete(key).await;
                }
            },
            Ok(None) => {}
            Err(e) => warn!(key, "cache read failed, computing: {e}"),
        }

        let value = compute().await?;

        match serde_json::to_vec(&value) {
            Ok(raw) => {
                if let Err(e) = self.store.set(key, raw, self.ttl).await {
                    warn!(key, "cache write failed: {e}");
                }
            }
            Err(e) => warn!(key, "cache encode failed: {e}"),
        }

        Ok(value)
    }

    /// Drop every cached facet of one user's collection. Runs after the
    /// durable write, never before it.
    pub async fn invalidate_user(&self, user: UserId) -> Result<(), DomainError> {
        self.invalidate(&self.user_prefix(user)).await
    }

    /// Drop the whole resource class, e.g. after a global admin mutation.
    pub async fn invalidate_class(&self) -> Result<(), DomainError> {
        self.invalidate(&self.class_prefix()).await
    }

    async fn invalidate(&self, prefix: &str) -> Result<(), DomainError> {
        if let Err(e) = self.store.delete_prefix(prefix).await {
            warn!(prefix, "cache invalidation failed, retrying: {e}");
            self.store
                .delete_prefix(prefix)
                .await
                .map_err(|e| DomainError::Store(format!("cache invalidation: {e}")))?;
        }
        Ok(())
    }
}
