use crate::application_port::{DomainError, NewPromocode, PromocodeChange, PromocodeService};
use crate::domain_model::{AppliedPromocode, Promocode, PromocodeCode, UserId};
use crate::domain_port::{PromocodeRepo, ResourceCache, TxManager, UserRepo};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Promocodes are global and admin-owned; per-user state is the applied
/// set. User mutations invalidate that user's prefix; admin mutations of
/// the code table invalidate the whole class, since any user's cached view
/// may embed the changed code.
pub struct CachedPromocodeService {
    user_repo: Arc<dyn UserRepo>,
    promocode_repo: Arc<dyn PromocodeRepo>,
    tx_manager: Arc<dyn TxManager>,
    cache: ResourceCache,
}

impl CachedPromocodeService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        promocode_repo: Arc<dyn PromocodeRepo>,
        tx_manager: Arc<dyn TxManager>,
        cache: ResourceCache,
    ) -> Self {
        Self {
            user_repo,
            promocode_repo,
            tx_manager,
            cache,
        }
    }

    fn validate(change: &PromocodeChange) -> Result<(), DomainError> {
        let (PromocodeChange::Apply { code } | PromocodeChange::Release { code }) = change;
        if code.is_empty() {
            return Err(DomainError::InvalidArgument("code must not be empty"));
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

    /// Resolve a code to its redeemable definition, or not-found.
    async fn redeemable(&self, code: &PromocodeCode) -> Result<Promocode, DomainError> {
        let promocode = self
            .promocode_repo
            .find_code(code)
            .await?
            .ok_or(DomainError::NotFound)?;
        if !promocode.is_redeemable(Utc::now()) {
            debug!(code = %code, "promocode exists but is not redeemable");
            return Err(DomainError::NotFound);
        }
        Ok(promocode)
    }

    async fn apply_changes(
        &self,
        user: UserId,
        changes: &[PromocodeChange],
    ) -> Result<(), DomainError> {
        if changes.is_empty() {
            return Err(DomainError::InvalidArgument("no changes"));
        }
        for change in changes {
            Self::validate(change)?;
        }
        self.ensure_user(user).await?;

        // resolve before writing so a bad code rejects the whole batch
        let mut resolved: HashMap<PromocodeCode, Promocode> = HashMap::new();
        for change in changes {
            if let PromocodeChange::Apply { code } = change {
                let promocode = self.redeemable(code).await?;
                resolved.insert(code.clone(), promocode);
            }
        }

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| DomainError::Store(e.to_string()))?;

        for change in changes {
            match change {
                PromocodeChange::Apply { code } => {
                    let promocode = &resolved[code];
                    let applied = AppliedPromocode {
                        code: code.clone(),
                        discount_percent: promocode.discount_percent,
                        applied_at: Utc::now(),
                    };
                    // false means already applied: idempotent no-op
                    self.promocode_repo
                        .apply_in_tx(tx.as_mut(), user, &applied)
                        .await?;
                }
                PromocodeChange::Release { code } => {
                    self.promocode_repo
                        .release_in_tx(tx.as_mut(), user, code)
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
impl PromocodeService for CachedPromocodeService {
    async fn read(&self, user: UserId) -> Result<Vec<AppliedPromocode>, DomainError> {
        let key = self.cache.items_key(user);
        let repo = self.promocode_repo.clone();
        self.cache
            .get_or_set(&key, move || async move { repo.list_applied(user).await })
            .await
    }

    async fn mutate(&self, user: UserId, change: PromocodeChange) -> Result<(), DomainError> {
        self.apply_changes(user, std::slice::from_ref(&change)).await
    }

    async fn batch_mutate(
        &self,
        user: UserId,
        changes: Vec<PromocodeChange>,
    ) -> Result<(), DomainError> {
        self.apply_changes(user, &changes).await
    }

    async fn status(
        &self,
        user: UserId,
        codes: &[PromocodeCode],
    ) -> Result<HashMap<PromocodeCode, bool>, DomainError> {
        let applied = self.read(user).await?;
        let present: HashSet<&PromocodeCode> = applied.iter().map(|a| &a.code).collect();
        Ok(codes
            .iter()
            .map(|code| (code.clone(), present.contains(code)))
            .collect())
    }

    async fn create_code(&self, code: NewPromocode) -> Result<(), DomainError> {
        if code.code.is_empty() {
            return Err(DomainError::InvalidArgument("code must not be empty"));
        }
        if code.discount_percent == 0 || code.discount_percent > 100 {
            return Err(DomainError::InvalidArgument(
                "discount must be between 1 and 100 percent",
            ));
        }

        let promocode = Promocode {
            code: code.code,
            discount_percent: code.discount_percent,
            is_active: true,
            expires_at: code.expires_at,
        };

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| DomainError::Store(e.to_string()))?;
        // false means the code already exists: idempotent no-op
        self.promocode_repo
            .insert_code_in_tx(tx.as_mut(), &promocode)
            .await?;
        tx.commit()
            .await
            .map_err(|e| DomainError::Store(e.to_string()))?;

        self.cache.invalidate_class().await
    }

    async fn retire_code(&self, code: &PromocodeCode) -> Result<(), DomainError> {
        if self.promocode_repo.find_code(code).await?.is_none() {
            return Err(DomainError::NotFound);
        }

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| DomainError::Store(e.to_string()))?;
        // false means already retired: idempotent no-op
        self.promocode_repo
            .retire_code_in_tx(tx.as_mut(), code)
            .await?;
        tx.commit()
            .await
            .map_err(|e| DomainError::Store(e.to_string()))?;

        self.cache.invalidate_class().await
    }

    async fn list_codes(&self) -> Result<Vec<Promocode>, DomainError> {
        self.promocode_repo.list_codes().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_port::CacheStore;
    use crate::infra_memory::{
        MemoryCacheStore, MemoryPromocodeRepo, MemoryUserRepo, NoopTxManager,
    };
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;
    use uuid::Uuid;

    struct Fixture {
        service: CachedPromocodeService,
        user: UserId,
        other_user: UserId,
        store: Arc<MemoryCacheStore>,
    }

    async fn fixture() -> Fixture {
        let users = Arc::new(MemoryUserRepo::new());
        let tx_manager = Arc::new(NoopTxManager);
        let user = UserId(Uuid::new_v4());
        let other_user = UserId(Uuid::new_v4());
        let mut tx = tx_manager.begin().await.unwrap();
        users.create_in_tx(tx.as_mut(), user, "promo-tester").await.unwrap();
        users
            .create_in_tx(tx.as_mut(), other_user, "promo-tester-2")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let store = Arc::new(MemoryCacheStore::new());
        let cache = ResourceCache::new(store.clone(), "promo", Duration::from_secs(60));

        Fixture {
            service: CachedPromocodeService::new(
                users,
                Arc::new(MemoryPromocodeRepo::new()),
                tx_manager,
                cache,
            ),
            user,
            other_user,
            store,
        }
    }

    fn new_code(raw: &str, percent: u8) -> NewPromocode {
        NewPromocode {
            code: PromocodeCode::new(raw),
            discount_percent: percent,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn apply_records_the_code_once() {
        let f = fixture().await;
        f.service.create_code(new_code("welcome10", 10)).await.unwrap();

        let apply = PromocodeChange::Apply {
            code: PromocodeCode::new("welcome10"),
        };
        f.service.mutate(f.user, apply.clone()).await.unwrap();
        f.service.mutate(f.user, apply).await.unwrap();

        let applied = f.service.read(f.user).await.unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].code, PromocodeCode::new("WELCOME10"));
        assert_eq!(applied[0].discount_percent, 10);
    }

    #[tokio::test]
    async fn unknown_and_expired_codes_are_rejected() {
        let f = fixture().await;

        let unknown = f
            .service
            .mutate(
                f.user,
                PromocodeChange::Apply {
                    code: PromocodeCode::new("nope"),
                },
            )
            .await;
        assert!(matches!(unknown, Err(DomainError::NotFound)));

        f.service
            .create_code(NewPromocode {
                code: PromocodeCode::new("bygone"),
                discount_percent: 25,
                expires_at: Some(Utc::now() - ChronoDuration::hours(1)),
            })
            .await
            .unwrap();
        let expired = f
            .service
            .mutate(
                f.user,
                PromocodeChange::Apply {
                    code: PromocodeCode::new("bygone"),
                },
            )
            .await;
        assert!(matches!(expired, Err(DomainError::NotFound)));
    }

    #[tokio::test]
    async fn retiring_a_code_invalidates_every_users_view() {
        let f = fixture().await;
        f.service.create_code(new_code("spring", 15)).await.unwrap();

        for user in [f.user, f.other_user] {
            f.service
                .mutate(
                    user,
                    PromocodeChange::Apply {
                        code: PromocodeCode::new("spring"),
                    },
                )
                .await
                .unwrap();
            // prime the per-user cache
            assert_eq!(f.service.read(user).await.unwrap().len(), 1);
        }

        f.service
            .retire_code(&PromocodeCode::new("spring"))
            .await
            .unwrap();

        // the whole class prefix is gone, both users recompute
        for user in [f.user, f.other_user] {
            let key = format!("promo:{}:items", user);
            assert!(f.store.get(&key).await.unwrap().is_none());
        }
        let retired = f
            .service
            .list_codes()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.code == PromocodeCode::new("spring"))
            .unwrap();
        assert!(!retired.is_active);
    }

    #[tokio::test]
    async fn admin_validation_and_idempotent_create() {
        let f = fixture().await;

        let zero = f.service.create_code(new_code("free", 0)).await;
        assert!(matches!(zero, Err(DomainError::InvalidArgument(_))));

        f.service.create_code(new_code("twice", 20)).await.unwrap();
        // creating the same code again is a no-op, not a conflict
        f.service.create_code(new_code("twice", 20)).await.unwrap();
        assert_eq!(f.service.list_codes().await.unwrap().len(), 1);

        let missing = f.service.retire_code(&PromocodeCode::new("ghost")).await;
        assert!(matches!(missing, Err(DomainError::NotFound)));
    }

    #[tokio::test]
    async fn release_returns_the_user_to_a_clean_state() {
        let f = fixture().await;
        f.service.create_code(new_code("undo", 5)).await.unwrap();

        f.service
            .mutate(
                f.user,
                PromocodeChange::Apply {
                    code: PromocodeCode::new("undo"),
                },
            )
            .await
            .unwrap();
        f.service
            .mutate(
                f.user,
                PromocodeChange::Release {
                    code: PromocodeCode::new("undo"),
                },
            )
            .await
            .unwrap();

        assert!(f.service.read(f.user).await.unwrap().is_empty());

        let status = f
            .service
            .status(f.user, &[PromocodeCode::new("undo")])
            .await
            .unwrap();
        assert_eq!(status.get(&PromocodeCode::new("undo")), Some(&false));
    }
}
