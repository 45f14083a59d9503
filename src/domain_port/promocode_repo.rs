use crate::application_port::DomainError;
use crate::domain_model::{AppliedPromocode, Promocode, PromocodeCode, UserId};
use crate::domain_port::repo_tx::StorageTx;

#[async_trait::async_trait]
pub trait PromocodeRepo: Send + Sync {
    // global, admin-owned table

    async fn find_code(&self, code: &PromocodeCode) -> Result<Option<Promocode>, DomainError>;

    async fn list_codes(&self) -> Result<Vec<Promocode>, DomainError>;

    /// Returns false when the code already exists.
    async fn insert_code_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        code: &Promocode,
    ) -> Result<bool, DomainError>;

    /// Returns false when the code was already inactive.
    async fn retire_code_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        code: &PromocodeCode,
    ) -> Result<bool, DomainError>;

    // per-user applied set

    async fn list_applied(&self, user: UserId) -> Result<Vec<AppliedPromocode>, DomainError>;

    /// Returns false when the user already applied the code.
    async fn apply_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        applied: &AppliedPromocode,
    ) -> Result<bool, DomainError>;

    /// Returns false when the user had not applied the code.
    async fn release_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        code: &PromocodeCode,
    ) -> Result<bool, DomainError>;
}
