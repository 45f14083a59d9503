use crate::application_port::{DomainError, FavoriteChange, FavoritesService};
use crate::domain_model::{FavoriteEntry, ProductId, UserId};
use crate::domain_port::{CatalogRepo, FavoritesRepo, ResourceCache, TxManager, UserRepo};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct CachedFavoritesService {
    user_repo: Arc<dyn UserRepo>,
    catalog_repo: Arc<dyn CatalogRepo>,
    favorites_repo: Arc<dyn FavoritesRepo>,
    tx_manager: Arc<dyn TxManager>,
    cache: ResourceCache,
}

impl CachedFavoritesService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        catalog_repo: Arc<dyn CatalogRepo>,
        favorites_repo: Arc<dyn FavoritesRepo>,
        tx_manager: Arc<dyn TxManager>,
        cache: ResourceCache,
    ) -> Self {
        Self {
            user_repo,
            catalog_repo,
            favorites_repo,
            tx_manager,
            cache,
        }
    }

    fn validate(change: &FavoriteChange) -> Result<(), DomainError> {
        let (FavoriteChange::Add { product_id } | FavoriteChange::Remove { product_id }) = change;
        if product_id.0.is_nil() {
            return Err(DomainError::InvalidArgument("product id must not be nil"));
        }
        Ok(())
    }

    async fn ensure_user(&self, user: UserId) -> Result<(), DomainError> {
        if self.user_repo.id_exists(user).await? {
            Ok(())
        } else {
            Err(DomainError::UserNotFound)
        }
    }

    async fn apply(&self, user: UserId, changes: &[FavoriteChange]) -> Result<(), DomainError> {
        if changes.is_empty() {
            return Err(DomainError::InvalidArgument("no changes"));
        }
        for change in changes {
            Self::validate(change)?;
        }
        self.ensure_user(user).await?;
        for change in changes {
            if let FavoriteChange::Add { product_id } = change {
                if !self.catalog_repo.product_exists(*product_id).await? {
                    return Err(DomainError::NotFound);
                }
            }
        }

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| DomainError::Store(e.to_string()))?;

        for change in changes {
            match change {
                FavoriteChange::Add { product_id } => {
                    self.favorites_repo
                        .add_in_tx(tx.as_mut(), user, *product_id)
                        .await?;
                }
                FavoriteChange::Remove { product_id } => {
                    self.favorites_repo
                        .remove_in_tx(tx.as_mut(), user, *product_id)
                        .await?;
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::Store(e.to_string()))?;

        self.cache.invalidate_user(user).await
    }
}

#[async_trait::async_trait]
impl FavoritesService for CachedFavoritesService {
    async fn read(&self, user: UserId) -> Result<Vec<FavoriteEntry>, DomainError> {
        let key = self.cache.items_key(user);
        let repo = self.favorites_repo.clone();
        self.cache
            .get_or_set(&key, move || async move { repo.list_with_details(user).await })
            .await
    }

    async fn mutate(&self, user: UserId, change: FavoriteChange) -> Result<(), DomainError> {
        self.apply(user, std::slice::from_ref(&change)).await
    }

    async fn batch_mutate(
        &self,
        user: UserId,
        changes: Vec<FavoriteChange>,
    ) -> Result<(), DomainError> {
        self.apply(user, &changes).await
    }

    async fn status(
        &self,
        user: UserId,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, bool>, DomainError> {
        let entries = self.read(user).await?;
        let present: HashSet<ProductId> = entries.iter().map(|e| e.product_id).collect();
        Ok(ids.iter().map(|id| (*id, present.contains(id))).collect())
    }

    async fn count(&self, user: UserId) -> Result<u64, DomainError> {
        let key = self.cache.count_key(user);
        let repo = self.favorites_repo.clone();
        self.cache
            .get_or_set(&key, move || async move { repo.count(user).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::ProductRecord;
    use crate::infra_memory::{
        MemoryCacheStore, MemoryCatalogRepo, MemoryFavoritesRepo, MemoryUserRepo, NoopTxManager,
    };
    use std::time::Duration;
    use uuid::Uuid;

    async fn fixture() -> (CachedFavoritesService, UserId, ProductId) {
        let catalog = Arc::new(MemoryCatalogRepo::new());
        let product = ProductId(Uuid::new_v4());
        catalog.insert(ProductRecord {
            product_id: product,
            title: "Ceramic mug".to_string(),
            unit_price_cents: 1450,
            is_active: true,
        });

        let users = Arc::new(MemoryUserRepo::new());
        let tx_manager = Arc::new(NoopTxManager);
        let user = UserId(Uuid::new_v4());
        let mut tx = tx_manager.begin().await.unwrap();
        users
            .create_in_tx(tx.as_mut(), user, "favorites-tester")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let cache = ResourceCache::new(
            Arc::new(MemoryCacheStore::new()),
            "favorites",
            Duration::from_secs(60),
        );
        let favorites_repo = Arc::new(MemoryFavoritesRepo::new(catalog.clone()));

        (
            CachedFavoritesService::new(users, catalog, favorites_repo, tx_manager, cache),
            user,
            product,
        )
    }

    #[tokio::test]
    async fn add_twice_keeps_a_single_favorite() {
        let (service, user, product) = fixture().await;

        let add = FavoriteChange::Add { product_id: product };
        service.mutate(user, add.clone()).await.unwrap();
        service.mutate(user, add).await.unwrap();

        let entries = service.read(user).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].product_id, product);
        assert_eq!(service.count(user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn remove_of_absent_favorite_is_a_no_op() {
        let (service, user, product) = fixture().await;

        service
            .mutate(user, FavoriteChange::Remove { product_id: product })
            .await
            .unwrap();
        assert!(service.read(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cached_read_is_refreshed_after_batch() {
        let (service, user, product) = fixture().await;

        // prime both facets
        assert!(service.read(user).await.unwrap().is_empty());
        assert_eq!(service.count(user).await.unwrap(), 0);

        service
            .batch_mutate(user, vec![FavoriteChange::Add { product_id: product }])
            .await
            .unwrap();

        assert_eq!(service.read(user).await.unwrap().len(), 1);
        assert_eq!(service.count(user).await.unwrap(), 1);

        let status = service.status(user, &[product]).await.unwrap();
        assert_eq!(status.get(&product), Some(&true));
    }
}
