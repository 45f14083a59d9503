use crate::application_port::DomainError;
use crate::domain_model::{CartEntry, ProductId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One cart mutation. `Add` of a product already in the cart and `Remove`
/// of one that is not are idempotent no-ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CartChange {
    Add { product_id: ProductId, quantity: u32 },
    SetQuantity { product_id: ProductId, quantity: u32 },
    Remove { product_id: ProductId },
}

#[async_trait::async_trait]
pub trait CartService: Send + Sync {
    async fn read(&self, user: UserId) -> Result<Vec<CartEntry>, DomainError>;
    async fn mutate(&self, user: UserId, change: CartChange) -> Result<(), DomainError>;
    async fn batch_mutate(&self, user: UserId, changes: Vec<CartChange>)
        -> Result<(), DomainError>;
    async fn status(
        &self,
        user: UserId,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, bool>, DomainError>;
    async fn count(&self, user: UserId) -> Result<u64, DomainError>;
}
