use crate::application_port::DomainError;
use crate::domain_model::{AppliedPromocode, Promocode, PromocodeCode, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PromocodeChange {
    Apply { code: PromocodeCode },
    Release { code: PromocodeCode },
}

/// Admin-side definition of a new code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPromocode {
    pub code: PromocodeCode,
    pub discount_percent: u8,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Promocodes are global and admin-owned; the per-user view is the set a
/// user has applied. Admin mutations invalidate every user's view.
#[async_trait::async_trait]
pub trait PromocodeService: Send + Sync {
    async fn read(&self, user: UserId) -> Result<Vec<AppliedPromocode>, DomainError>;
    async fn mutate(&self, user: UserId, change: PromocodeChange) -> Result<(), DomainError>;
    async fn batch_mutate(
        &self,
        user: UserId,
        changes: Vec<PromocodeChange>,
    ) -> Result<(), DomainError>;
    async fn status(
        &self,
        user: UserId,
        codes: &[PromocodeCode],
    ) -> Result<HashMap<PromocodeCode, bool>, DomainError>;

    async fn create_code(&self, code: NewPromocode) -> Result<(), DomainError>;
    async fn retire_code(&self, code: &PromocodeCode) -> Result<(), DomainError>;
    async fn list_codes(&self) -> Result<Vec<Promocode>, DomainError>;
}
