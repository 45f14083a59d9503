use crate::application_port::DomainError;
use crate::domain_model::{ProfileField, ProfileFieldKey, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Profile mutations operate on single typed fields; `Set` of the current
/// value and `Unset` of an absent field succeed as no-ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ProfileChange {
    Set { key: ProfileFieldKey, value: String },
    Unset { key: ProfileFieldKey },
}

#[async_trait::async_trait]
pub trait ProfileService: Send + Sync {
    async fn read(&self, user: UserId) -> Result<Vec<ProfileField>, DomainError>;
    async fn mutate(&self, user: UserId, change: ProfileChange) -> Result<(), DomainError>;
    async fn batch_mutate(
        &self,
        user: UserId,
        changes: Vec<ProfileChange>,
    ) -> Result<(), DomainError>;
    async fn status(
        &self,
        user: UserId,
        keys: &[ProfileFieldKey],
    ) -> Result<HashMap<ProfileFieldKey, bool>, DomainError>;
}
