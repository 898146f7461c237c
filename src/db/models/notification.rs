use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record appended for a photographer when something happens to their bookings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub photographer_id: String,
    pub kind: String,
    pub title: String,
    pub content: String,
    pub booking_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
