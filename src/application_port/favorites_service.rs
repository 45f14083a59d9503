use crate::application_port::DomainError;
use crate::domain_model::{FavoriteEntry, ProductId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FavoriteChange {
    Add { product_id: ProductId },
    Remove { product_id: ProductId },
}

#[async_trait::async_trait]
pub trait FavoritesService: Send + Sync {
    async fn read(&self, user: UserId) -> Result<Vec<FavoriteEntry>, DomainError>;
    async fn mutate(&self, user: UserId, change: FavoriteChange) -> Result<(), DomainError>;
    async fn batch_mutate(
        &self,
        user: UserId,
        changes: Vec<FavoriteChange>,
    ) -> Result<(), DomainError>;
    async fn status(
        &self,
        user: UserId,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, bool>, DomainError>;
    async fn count(&self, user: UserId) -> Result<u64, DomainError>;
}
