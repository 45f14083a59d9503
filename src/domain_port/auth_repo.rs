use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::repo_tx::StorageTx;

#[derive(Debug, Clone)]
pub struct AuthRecord {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
    pub is_active: bool,
}

#[async_trait::async_trait]
pub trait AuthRepo: Send + Sync {
    async fn create_credentials_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        username: &str,
        password_hash: &str,
    ) -> Result<(), AuthError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<AuthRecord>, AuthError>;
}
