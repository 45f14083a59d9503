use crate::application_port::{DomainError, ProfileChange, ProfileService};
use crate::domain_model::{ProfileField, ProfileFieldKey, UserId};
use crate::domain_port::{ProfileRepo, ResourceCache, TxManager, UserRepo};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct CachedProfileService {
    user_repo: Arc<dyn UserRepo>,
    profile_repo: Arc<dyn ProfileRepo>,
    tx_manager: Arc<dyn TxManager>,
    cache: ResourceCache,
}

impl CachedProfileService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        profile_repo: Arc<dyn ProfileRepo>,
        tx_manager: Arc<dyn TxManager>,
        cache: ResourceCache,
    ) -> Self {
        Self {
            user_repo,
            profile_repo,
            tx_manager,
            cache,
        }
    }

    fn validate(change: &ProfileChange) -> Result<(), DomainError> {
        if let ProfileChange::Set { value, .. } = change {
            if value.trim().is_empty() {
                return Err(DomainError::InvalidArgument("value must not be empty"));
            }
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

    async fn apply(&self, user: UserId, changes: &[ProfileChange]) -> Result<(), DomainError> {
        if changes.is_empty() {
            return Err(DomainError::InvalidArgument("no changes"));
        }
        for change in changes {
            Self::validate(change)?;
        }
        self.ensure_user(user).await?;

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| DomainError::Store(e.to_string()))?;

        for change in changes {
            match change {
                ProfileChange::Set { key, value } => {
                    self.profile_repo
                        .set_field_in_tx(tx.as_mut(), user, *key, value)
                        .await?;
                }
                ProfileChange::Unset { key } => {
                    // false means the field was not set: idempotent no-op
                    self.profile_repo
                        .unset_field_in_tx(tx.as_mut(), user, *key)
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
impl ProfileService for CachedProfileService {
    async fn read(&self, user: UserId) -> Result<Vec<ProfileField>, DomainError> {
        let key = self.cache.items_key(user);
        let repo = self.profile_repo.clone();
        self.cache
            .get_or_set(&key, move || async move { repo.list_fields(user).await })
            .await
    }

    async fn mutate(&self, user: UserId, change: ProfileChange) -> Result<(), DomainError> {
        self.apply(user, std::slice::from_ref(&change)).await
    }

    async fn batch_mutate(
        &self,
        user: UserId,
        changes: Vec<ProfileChange>,
    ) -> Result<(), DomainError> {
        self.apply(user, &changes).await
    }

    async fn status(
        &self,
        user: UserId,
        keys: &[ProfileFieldKey],
    ) -> Result<HashMap<ProfileFieldKey, bool>, DomainError> {
        let fields = self.read(user).await?;
        let present: HashSet<ProfileFieldKey> = fields.iter().map(|f| f.key).collect();
        Ok(keys.iter().map(|key| (*key, present.contains(key))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::{
        MemoryCacheStore, MemoryProfileRepo, MemoryUserRepo, NoopTxManager,
    };
    use std::time::Duration;
    use uuid::Uuid;

    async fn fixture() -> (CachedProfileService, UserId) {
        let users = Arc::new(MemoryUserRepo::new());
        let tx_manager = Arc::new(NoopTxManager);
        let user = UserId(Uuid::new_v4());
        let mut tx = tx_manager.begin().await.unwrap();
        users
            .create_in_tx(tx.as_mut(), user, "profile-tester")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let cache = ResourceCache::new(
            Arc::new(MemoryCacheStore::new()),
            "profile",
            Duration::from_secs(60),
        );

        (
            CachedProfileService::new(
                users,
                Arc::new(MemoryProfileRepo::new()),
                tx_manager,
                cache,
            ),
            user,
        )
    }

    #[tokio::test]
    async fn set_then_read_returns_the_field() {
        let (service, user) = fixture().await;

        // prime the cache before mutating
        assert!(service.read(user).await.unwrap().is_empty());

        service
            .mutate(
                user,
                ProfileChange::Set {
                    key: ProfileFieldKey::Email,
                    value: "buyer@example.com".to_string(),
                },
            )
            .await
            .unwrap();

        let fields = service.read(user).await.unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].key, ProfileFieldKey::Email);
        assert_eq!(fields[0].value, "buyer@example.com");
    }

    #[tokio::test]
    async fn unset_of_absent_field_is_a_no_op() {
        let (service, user) = fixture().await;

        service
            .mutate(user, ProfileChange::Unset {
                key: ProfileFieldKey::Phone,
            })
            .await
            .unwrap();
        assert!(service.read(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_reflects_set_fields_only() {
        let (service, user) = fixture().await;

        service
            .batch_mutate(
                user,
                vec![
                    ProfileChange::Set {
                        key: ProfileFieldKey::DisplayName,
                        value: "Sam".to_string(),
                    },
                    ProfileChange::Set {
                        key: ProfileFieldKey::Phone,
                        value: "+1 555 0100".to_string(),
                    },
                ],
            )
            .await
            .unwrap();

        let status = service
            .status(user, &[ProfileFieldKey::DisplayName, ProfileFieldKey::Email])
            .await
            .unwrap();
        assert_eq!(status.get(&ProfileFieldKey::DisplayName), Some(&true));
        assert_eq!(status.get(&ProfileFieldKey::Email), Some(&false));
    }

    #[tokio::test]
    async fn rejects_empty_values_and_unknown_users() {
        let (service, user) = fixture().await;

        let empty = service
            .mutate(
                user,
                ProfileChange::Set {
                    key: ProfileFieldKey::Email,
                    value: "  ".to_string(),
                },
            )
            .await;
        assert!(matches!(empty, Err(DomainError::InvalidArgument(_))));

        let unknown = service
            .mutate(
                UserId(Uuid::new_v4()),
                ProfileChange::Set {
                    key: ProfileFieldKey::Email,
                    value: "buyer@example.com".to_string(),
                },
            )
            .await;
        assert!(matches!(unknown, Err(DomainError::UserNotFound)));
    }
}
