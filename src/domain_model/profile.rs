use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of per-user profile fields. Adding a field is a schema
/// decision, not request data, so this is an enum rather than free strings.
#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProfileFieldKey {
    DisplayName,
    Email,
    Phone,
    ShippingAddress,
}

impl ProfileFieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileFieldKey::DisplayName => "display_name",
            ProfileFieldKey::Email => "email",
            ProfileFieldKey::Phone => "phone",
            ProfileFieldKey::ShippingAddress => "shipping_address",
        }
    }
}

impl fmt::Display for ProfileFieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProfileFieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "display_name" => Ok(ProfileFieldKey::DisplayName),
            "email" => Ok(ProfileFieldKey::Email),
            "phone" => Ok(ProfileFieldKey::Phone),
            "shipping_address" => Ok(ProfileFieldKey::ShippingAddress),
            other => Err(format!("unknown profile field: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileField {
    pub key: ProfileFieldKey,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
