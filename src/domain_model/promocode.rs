use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable promocode, unique across the store. Stored uppercase.
#[derive(
    Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct PromocodeCode(pub String);

impl PromocodeCode {
    pub fn new(raw: &str) -> Self {
        PromocodeCode(raw.trim().to_ascii_uppercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PromocodeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Global, admin-owned promocode definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promocode {
    pub code: PromocodeCode,
    pub discount_percent: u8,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Promocode {
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|at| at > now)
    }
}

/// A promocode a user has applied, with the details frozen at apply time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedPromocode {
    pub code: PromocodeCode,
    pub discount_percent: u8,
    pub applied_at: DateTime<Utc>,
}
