use crate::application_port::{CartChange, CartService, DomainError};
use crate::domain_model::{CartEntry, ProductId, UserId};
use crate::domain_port::{CartRepo, CatalogRepo, ResourceCache, TxManager, UserRepo};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Cache-aside cart service. Reads go through the per-user cache; every
/// mutation validates, writes through the repository, then invalidates the
/// user's cache prefix as the final step before returning.
pub struct CachedCartService {
    user_repo: Arc<dyn UserRepo>,
    catalog_repo: Arc<dyn CatalogRepo>,
    cart_repo: Arc<dyn CartRepo>,
    tx_manager: Arc<dyn TxManager>,
    cache: ResourceCache,
}

impl CachedCartService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        catalog_repo: Arc<dyn CatalogRepo>,
        cart_repo: Arc<dyn CartRepo>,
        tx_manager: Arc<dyn TxManager>,
        cache: ResourceCache,
    ) -> Self {
        Self {
            user_repo,
            catalog_repo,
            cart_repo,
            tx_manager,
            cache,
        }
    }

    fn validate(change: &CartChange) -> Result<(), DomainError> {
        let (product_id, quantity) = match change {
            CartChange::Add {
                product_id,
                quantity,
            }
            | CartChange::SetQuantity {
                product_id,
                quantity,
            } => (product_id, Some(*quantity)),
            CartChange::Remove { product_id } => (product_id, None),
        };
        if product_id.0.is_nil() {
            return Err(DomainError::InvalidArgument("product id must not be nil"));
        }
        if quantity == Some(0) {
            return Err(DomainError::InvalidArgument("quantity must be positive"));
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

    /// All writes in one tx, then exactly one invalidation of the user's
    /// cache prefix. Write-then-invalidate, never the reverse.
    async fn apply(&self, user: UserId, changes: &[CartChange]) -> Result<(), DomainError> {
        if changes.is_empty() {
            return Err(DomainError::InvalidArgument("no changes"));
        }
        for change in changes {
            Self::validate(change)?;
        }
        self.ensure_user(user).await?;
        for change in changes {
            if let CartChange::Add { product_id, .. } = change {
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
                CartChange::Add {
                    product_id,
                    quantity,
                } => {
                    // false means already present: idempotent no-op
                    self.cart_repo
                        .add_in_tx(tx.as_mut(), user, *product_id, *quantity)
                        .await?;
                }
                CartChange::SetQuantity {
                    product_id,
                    quantity,
                } => {
                    if !self
                        .cart_repo
                        .set_quantity_in_tx(tx.as_mut(), user, *product_id, *quantity)
                        .await?
                    {
                        return Err(DomainError::NotFound);
                    }
                }
                CartChange::Remove { product_id } => {
                    // false means already absent: idempotent no-op
                    self.cart_repo
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
impl CartService for CachedCartService {
    async fn read(&self, user: UserId) -> Result<Vec<CartEntry>, DomainError> {
        let key = self.cache.items_key(user);
        let repo = self.cart_repo.clone();
        self.cache
            .get_or_set(&key, move || async move { repo.list_with_details(user).await })
            .await
    }

    async fn mutate(&self, user: UserId, change: CartChange) -> Result<(), DomainError> {
        self.apply(user, std::slice::from_ref(&change)).await
    }

    async fn batch_mutate(
        &self,
        user: UserId,
        changes: Vec<CartChange>,
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
        let repo = self.cart_repo.clone();
        self.cache
            .get_or_set(&key, move || async move { repo.count(user).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::ProductRecord;
    use crate::domain_port::{CacheError, CacheStore};
    use crate::infra_memory::{
        MemoryCacheStore, MemoryCartRepo, MemoryCatalogRepo, MemoryUserRepo, NoopTxManager,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    struct CountingCacheStore {
        inner: MemoryCacheStore,
        prefix_deletes: AtomicUsize,
    }

    impl CountingCacheStore {
        fn new() -> Self {
            CountingCacheStore {
                inner: MemoryCacheStore::new(),
                prefix_deletes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl CacheStore for CountingCacheStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
            self.inner.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.inner.delete(key).await
        }

        async fn delete_prefix(&self, prefix: &str) -> Result<(), CacheError> {
            self.prefix_deletes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete_prefix(prefix).await
        }
    }

    struct Fixture {
        service: CachedCartService,
        user: UserId,
        product: ProductId,
        counting: Arc<CountingCacheStore>,
    }

    async fn fixture() -> Fixture {
        let catalog = Arc::new(MemoryCatalogRepo::new());
        let product = ProductId(Uuid::new_v4());
        catalog.insert(ProductRecord {
            product_id: product,
            title: "Wireless headphones".to_string(),
            unit_price_cents: 19900,
            is_active: true,
        });

        let users = Arc::new(MemoryUserRepo::new());
        let tx_manager = Arc::new(NoopTxManager);
        let user = UserId(Uuid::new_v4());
        let mut tx = tx_manager.begin().await.unwrap();
        users
            .create_in_tx(tx.as_mut(), user, "cart-tester")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let counting = Arc::new(CountingCacheStore::new());
        let cache = ResourceCache::new(counting.clone(), "cart", Duration::from_secs(60));
        let cart_repo = Arc::new(MemoryCartRepo::new(catalog.clone()));

        Fixture {
            service: CachedCartService::new(users, catalog, cart_repo, tx_manager, cache),
            user,
            product,
            counting,
        }
    }

    #[tokio::test]
    async fn add_is_idempotent_and_remove_clears() {
        let f = fixture().await;

        assert!(f.service.read(f.user).await.unwrap().is_empty());

        let add = CartChange::Add {
            product_id: f.product,
            quantity: 1,
        };
        f.service.mutate(f.user, add.clone()).await.unwrap();

        let entries = f.service.read(f.user).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].product_id, f.product);
        assert_eq!(entries[0].quantity, 1);

        // second add of the same product succeeds without duplicating
        f.service.mutate(f.user, add).await.unwrap();
        assert_eq!(f.service.read(f.user).await.unwrap().len(), 1);

        f.service
            .mutate(
                f.user,
                CartChange::Remove {
                    product_id: f.product,
                },
            )
            .await
            .unwrap();
        assert!(f.service.read(f.user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_after_mutate_reflects_the_write() {
        let f = fixture().await;

        // prime the cache with the empty collection
        assert!(f.service.read(f.user).await.unwrap().is_empty());

        f.service
            .mutate(
                f.user,
                CartChange::Add {
                    product_id: f.product,
                    quantity: 2,
                },
            )
            .await
            .unwrap();

        // no TTL-bound staleness after a local write
        let entries = f.service.read(f.user).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].quantity, 2);
    }

    #[tokio::test]
    async fn set_quantity_requires_an_existing_line() {
        let f = fixture().await;

        let missing = f
            .service
            .mutate(
                f.user,
                CartChange::SetQuantity {
                    product_id: f.product,
                    quantity: 3,
                },
            )
            .await;
        assert!(matches!(missing, Err(DomainError::NotFound)));

        f.service
            .mutate(
                f.user,
                CartChange::Add {
                    product_id: f.product,
                    quantity: 1,
                },
            )
            .await
            .unwrap();
        f.service
            .mutate(
                f.user,
                CartChange::SetQuantity {
                    product_id: f.product,
                    quantity: 3,
                },
            )
            .await
            .unwrap();

        assert_eq!(f.service.read(f.user).await.unwrap()[0].quantity, 3);
    }

    #[tokio::test]
    async fn rejects_bad_input_before_writing() {
        let f = fixture().await;

        let zero = f
            .service
            .mutate(
                f.user,
                CartChange::Add {
                    product_id: f.product,
                    quantity: 0,
                },
            )
            .await;
        assert!(matches!(zero, Err(DomainError::InvalidArgument(_))));

        let unknown_product = f
            .service
            .mutate(
                f.user,
                CartChange::Add {
                    product_id: ProductId(Uuid::new_v4()),
                    quantity: 1,
                },
            )
            .await;
        assert!(matches!(unknown_product, Err(DomainError::NotFound)));

        let unknown_user = f
            .service
            .mutate(
                UserId(Uuid::new_v4()),
                CartChange::Add {
                    product_id: f.product,
                    quantity: 1,
                },
            )
            .await;
        assert!(matches!(unknown_user, Err(DomainError::UserNotFound)));
    }

    #[tokio::test]
    async fn batch_mutate_invalidates_exactly_once() {
        let f = fixture().await;

        // removing a product that was never added stays a no-op inside
        // the batch, so only Add targets need to exist in the catalog
        let second = ProductId(Uuid::new_v4());
        f.service
            .mutate(
                f.user,
                CartChange::Add {
                    product_id: f.product,
                    quantity: 1,
                },
            )
            .await
            .unwrap();
        let before = f.counting.prefix_deletes.load(Ordering::SeqCst);

        f.service
            .batch_mutate(
                f.user,
                vec![
                    CartChange::SetQuantity {
                        product_id: f.product,
                        quantity: 5,
                    },
                    CartChange::Remove {
                        product_id: second,
                    },
                ],
            )
            .await
            .unwrap();

        let after = f.counting.prefix_deletes.load(Ordering::SeqCst);
        assert_eq!(after - before, 1);
        assert_eq!(f.service.read(f.user).await.unwrap()[0].quantity, 5);
    }

    #[tokio::test]
    async fn count_is_cached_under_the_derived_key_and_invalidated() {
        let f = fixture().await;

        assert_eq!(f.service.count(f.user).await.unwrap(), 0);

        f.service
            .mutate(
                f.user,
                CartChange::Add {
                    product_id: f.product,
                    quantity: 1,
                },
            )
            .await
            .unwrap();

        assert_eq!(f.service.count(f.user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn status_reports_membership() {
        let f = fixture().await;
        let absent = ProductId(Uuid::new_v4());

        f.service
            .mutate(
                f.user,
                CartChange::Add {
                    product_id: f.product,
                    quantity: 1,
                },
            )
            .await
            .unwrap();

        let status = f.service.status(f.user, &[f.product, absent]).await.unwrap();
        assert_eq!(status.get(&f.product), Some(&true));
        assert_eq!(status.get(&absent), Some(&false));
    }
}
