//! Favorite records.
//!
//! - `Favorite`: remote presence row keyed by (owner, work)
//! - `LocalFavorite`: device-side entry carrying the work's style tag for stats

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub owner_id: String,
    pub work_id: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalFavorite {
    pub work_id: String,
    pub style: String,
    pub cover_url: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStats {
    pub total: usize,
    pub by_style: BTreeMap<String, usize>,
}

impl FavoriteStats {
    pub fn from_favorites<'a>(favorites: impl IntoIterator<Item = &'a LocalFavorite>) -> Self {
        let mut stats = Self::default();
        for favorite in favorites {
            stats.total += 1;
            *stats.by_style.entry(favorite.style.clone()).or_insert(0) += 1;
        }
        stats
    }
}
