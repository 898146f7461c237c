use anyhow::Result;
use rusqlite::{params, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

use crate::db::helpers::{format_datetime, from_json, now, to_json};

use super::LocalCache;

impl LocalCache {
    pub async fn save_draft<T: Serialize>(&self, key: &str, draft: &T) -> Result<()> {
        let key = key.to_string();
        let payload = to_json(draft, "draft")?;
        let updated_at = format_datetime(&now());
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO drafts (key, payload, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET payload = excluded.payload,
                                                    updated_at = excluded.updated_at",
                    params![key, payload, updated_at],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn load_draft<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let key = key.to_string();
        let payload: Option<String> = self
            .db
            .execute(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT payload FROM drafts WHERE key = ?1",
                        params![key],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;

        payload.map(|raw| from_json(&raw, "draft")).transpose()
    }

    pub async fn clear_draft(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.db
            .execute(move |conn| {
                let removed = conn.execute("DELETE FROM drafts WHERE key = ?1", params![key])?;
                Ok(removed > 0)
            })
            .await
    }
}
