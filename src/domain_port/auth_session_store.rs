use crate::application_port::AuthError;
use crate::domain_model::UserId;

#[async_trait::async_trait]
pub trait AuthSessionStore: Send + Sync {
    /// Save a refresh token jti for a user with TTL.
    async fn save_refresh_jti(
        &self,
        user_id: UserId,
        jti: &str,
        ttl_secs: u64,
    ) -> Result<(), AuthError>;
    /// Check if JTI is present (valid). If valid and consume=true, delete it (rotation).
    async fn check_refresh_jti(
        &self,
        user_id: UserId,
        jti: &str,
        consume: bool,
    ) -> Result<Option<UserId>, AuthError>;
    /// Drop a JTI unconditionally (logout).
    async fn revoke_refresh_jti(&self, jti: &str) -> Result<(), AuthError>;
}
