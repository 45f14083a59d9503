use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::AuthSessionStore;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

struct SessionEntry {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

/// In-process refresh-credential rotation store for the `memory` backend.
pub struct MemoryAuthSessionStore {
    sessions: DashMap<String, SessionEntry>,
}

impl MemoryAuthSessionStore {
    pub fn new() -> Self {
        MemoryAuthSessionStore {
            sessions: DashMap::new(),
        }
    }
}

impl Default for MemoryAuthSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AuthSessionStore for MemoryAuthSessionStore {
    async fn save_refresh_jti(
        &self,
        user_id: UserId,
        jti: &str,
        ttl_secs: u64,
    ) -> Result<(), AuthError> {
        self.sessions.insert(
            jti.to_string(),
            SessionEntry {
                user_id,
                expires_at: Utc::now() + Duration::seconds(ttl_secs as i64),
            },
        );
        Ok(())
    }

    async fn check_refresh_jti(
        &self,
        _user_id: UserId,
        jti: &str,
        consume: bool,
    ) -> Result<Option<UserId>, AuthError> {
        let now = Utc::now();
        let found = match self.sessions.get(jti) {
            Some(entry) if entry.expires_at > now => Some(entry.user_id),
            _ => None,
        };
        if found.is_none() || consume {
            self.sessions.remove(jti);
        }
        Ok(found)
    }

    async fn revoke_refresh_jti(&self, jti: &str) -> Result<(), AuthError> {
        self.sessions.remove(jti);
        Ok(())
    }
}
