use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::db::{connection::Database, helpers::format_datetime};

impl Database {
    /// Idempotent: a second add for the same (owner, work) pair is a no-op.
    pub async fn add_favorite(
        &self,
        owner_id: &str,
        work_id: &str,
        added_at: DateTime<Utc>,
    ) -> Result<bool> {
        let owner_id = owner_id.to_string();
        let work_id = work_id.to_string();
        self.execute(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO favorites (owner_id, work_id, added_at)
                 VALUES (?1, ?2, ?3)",
                params![owner_id, work_id, format_datetime(&added_at)],
            )?;
            Ok(inserted > 0)
        })
        .await
    }

    pub async fn remove_favorite(&self, owner_id: &str, work_id: &str) -> Result<bool> {
        let owner_id = owner_id.to_string();
        let work_id = work_id.to_string();
        self.execute(move |conn| {
            let removed = conn.execute(
                "DELETE FROM favorites WHERE owner_id = ?1 AND work_id = ?2",
                params![owner_id, work_id],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    pub async fn favorite_work_ids(&self, owner_id: &str) -> Result<HashSet<String>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare("SELECT work_id FROM favorites WHERE owner_id = ?1")?;
            let ids = stmt
                .query_map(params![owner_id], |row| row.get::<_, String>(0))?
                .collect::<Result<HashSet<_>, _>>()?;
            Ok(ids)
        })
        .await
    }

    pub async fn count_favorites_for_work(&self, work_id: &str) -> Result<i64> {
        let work_id = work_id.to_string();
        self.execute(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM favorites WHERE work_id = ?1",
                params![work_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
    }
}
