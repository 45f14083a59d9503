use crate::application_port::DomainError;
use crate::domain_model::{FavoriteEntry, ProductId, UserId};
use crate::domain_port::repo_tx::StorageTx;

#[async_trait::async_trait]
pub trait FavoritesRepo: Send + Sync {
    async fn list_with_details(&self, user: UserId) -> Result<Vec<FavoriteEntry>, DomainError>;

    async fn count(&self, user: UserId) -> Result<u64, DomainError>;

    /// Returns false when the product was already a favorite.
    async fn add_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, DomainError>;

    /// Returns false when the product was not a favorite.
    async fn remove_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, DomainError>;
}
