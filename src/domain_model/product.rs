use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct ProductId(pub uuid::Uuid);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProductId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(ProductId)
    }
}

/// Catalog row as the per-user services see it. The catalog tree itself is
/// read-mostly and owned elsewhere; this is the lookup surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: ProductId,
    pub title: String,
    pub unit_price_cents: u64,
    pub is_active: bool,
}

/// A cart line joined with catalog details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartEntry {
    pub product_id: ProductId,
    pub title: String,
    pub unit_price_cents: u64,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

/// A favorite joined with catalog details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub product_id: ProductId,
    pub title: String,
    pub unit_price_cents: u64,
    pub added_at: DateTime<Utc>,
}
