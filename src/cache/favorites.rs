use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    helpers::{format_datetime, parse_datetime},
    LocalFavorite,
};

use super::LocalCache;

fn row_to_favorite(row: &Row) -> Result<LocalFavorite> {
    let added_at: String = row.get("added_at")?;
    Ok(LocalFavorite {
        work_id: row.get("work_id")?,
        style: row.get("style")?,
        cover_url: row.get("cover_url")?,
        added_at: parse_datetime(&added_at, "added_at")?,
    })
}

impl LocalCache {
    /// Newest first.
    pub async fn favorites(&self) -> Result<Vec<LocalFavorite>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT work_id, style, cover_url, added_at
                     FROM local_favorites
                     ORDER BY added_at DESC, work_id",
                )?;
                let mut rows = stmt.query([])?;
                let mut favorites = Vec::new();
                while let Some(row) = rows.next()? {
                    favorites.push(row_to_favorite(row)?);
                }
                Ok(favorites)
            })
            .await
    }

    /// Returns false when the work was already favorited; the stored entry is kept.
    pub async fn put_favorite(&self, favorite: &LocalFavorite) -> Result<bool> {
        let favorite = favorite.clone();
        self.db
            .execute(move |conn| {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO local_favorites (work_id, style, cover_url, added_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        favorite.work_id,
                        favorite.style,
                        favorite.cover_url,
                        format_datetime(&favorite.added_at),
                    ],
                )?;
                Ok(inserted > 0)
            })
            .await
    }

    pub async fn remove_favorite(&self, work_id: &str) -> Result<bool> {
        let work_id = work_id.to_string();
        self.db
            .execute(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM local_favorites WHERE work_id = ?1",
                    params![work_id],
                )?;
                Ok(removed > 0)
            })
            .await
    }

    pub async fn clear_favorites(&self) -> Result<usize> {
        self.db
            .execute(|conn| Ok(conn.execute("DELETE FROM local_favorites", [])?))
            .await
    }
}
