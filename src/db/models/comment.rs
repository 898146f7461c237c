use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub work_id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
