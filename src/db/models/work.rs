//! Portfolio works. Read-only to the booking and favorite logic apart from
//! upload and the delete cascade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkPhoto {
    pub id: String,
    pub url: String,
    pub size: String,
    pub desc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    pub id: String,
    pub photographer_id: String,
    /// Identity that created the work; may differ from the photographer of record.
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub style: String,
    pub photos: Vec<WorkPhoto>,
    pub camera: String,
    pub lens: String,
    pub likes: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Work {
    pub fn cover_url(&self) -> Option<&str> {
        self.photos.first().map(|photo| photo.url.as_str())
    }
}

/// A work as returned by `listWorks`, flagged against the caller's remote favorites.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkListing {
    #[serde(flatten)]
    pub work: Work,
    pub is_favorited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkPage {
    pub items: Vec<WorkListing>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeletedWork {
    pub work_id: String,
    pub deleted_at: DateTime<Utc>,
    pub favorites_removed: usize,
    pub comments_removed: usize,
}
