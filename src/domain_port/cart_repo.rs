use crate::application_port::DomainError;
use crate::domain_model::{CartEntry, ProductId, UserId};
use crate::domain_port::repo_tx::StorageTx;

#[async_trait::async_trait]
pub trait CartRepo: Send + Sync {
    async fn list_with_details(&self, user: UserId) -> Result<Vec<CartEntry>, DomainError>;

    async fn count(&self, user: UserId) -> Result<u64, DomainError>;

    /// Returns false when the product was already in the cart.
    async fn add_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<bool, DomainError>;

    /// Returns false when the product is not in the cart.
    async fn set_quantity_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<bool, DomainError>;

    /// Returns false when the product was not in the cart.
    async fn remove_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, DomainError>;
}
