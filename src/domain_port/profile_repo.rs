use crate::application_port::DomainError;
use crate::domain_model::{ProfileField, ProfileFieldKey, UserId};
use crate::domain_port::repo_tx::StorageTx;

#[async_trait::async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn list_fields(&self, user: UserId) -> Result<Vec<ProfileField>, DomainError>;

    async fn set_field_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        key: ProfileFieldKey,
        value: &str,
    ) -> Result<(), DomainError>;

    /// Returns false when the field was not set.
    async fn unset_field_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        key: ProfileFieldKey,
    ) -> Result<bool, DomainError>;
}
