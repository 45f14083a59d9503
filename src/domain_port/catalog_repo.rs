use crate::application_port::DomainError;
use crate::domain_model::{ProductId, ProductRecord};

/// Read-only catalog lookup. The catalog tree is owned elsewhere; the
/// per-user services only need existence checks and detail joins.
#[async_trait::async_trait]
pub trait CatalogRepo: Send + Sync {
    async fn find(&self, product: ProductId) -> Result<Option<ProductRecord>, DomainError>;

    async fn product_exists(&self, product: ProductId) -> Result<bool, DomainError>;
}
