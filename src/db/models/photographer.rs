use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Photographer profile. `owner_id` links the profile to a caller identity;
/// callers without a linked profile cannot list received bookings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Photographer {
    pub id: String,
    pub owner_id: Option<String>,
    pub name: String,
    pub title: String,
    pub location: String,
    pub bio: String,
    pub avatar: String,
    pub wechat_id: String,
    pub phone: String,
    pub styles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
