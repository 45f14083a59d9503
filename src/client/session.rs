use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// The client's credential pair. Replaced as a whole, never field by field.
#[derive(Debug, Clone)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Owns the only state shared across gateway callers: the credential pair
/// and the process-wide refresh gate. The generation counter lets a caller
/// detect that the credentials it attached have already been rotated by
/// someone else, so it must not refresh again.
pub struct SessionCoordinator {
    credentials: RwLock<Option<CredentialPair>>,
    generation: AtomicU64,
    refresh_gate: Arc<Mutex<()>>,
}

impl SessionCoordinator {
    pub fn new() -> Self {
        SessionCoordinator {
            credentials: RwLock::new(None),
            generation: AtomicU64::new(0),
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }

    pub async fn current(&self) -> Option<CredentialPair> {
        self.credentials.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Install a new pair in a single assignment visible to all waiters.
    pub async fn replace(&self, pair: CredentialPair) {
        let mut guard = self.credentials.write().await;
        *guard = Some(pair);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Log out: drop the pair. Also bumps the generation so stalled
    /// callers know their credential is gone for good.
    pub async fn clear(&self) {
        let mut guard = self.credentials.write().await;
        *guard = None;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Claim the refresh gate without waiting. The owned guard can be
    /// moved into a detached task, so an abandoned caller does not cancel
    /// a refresh other callers are waiting on.
    pub(crate) fn try_acquire_refresh(&self) -> Option<OwnedMutexGuard<()>> {
        self.refresh_gate.clone().try_lock_owned().ok()
    }

    /// Block until the in-flight refresh releases the gate.
    pub(crate) async fn wait_for_refresh(&self) {
        let _guard = self.refresh_gate.lock().await;
    }
}

impl Default for SessionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
