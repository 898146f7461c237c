use anyhow::{anyhow, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, from_json, now, parse_datetime, to_json},
    models::Photographer,
};

const PHOTOGRAPHER_COLUMNS: &str =
    "id, owner_id, name, title, location, bio, avatar, wechat_id, phone, styles, created_at, updated_at";

fn row_to_photographer(row: &Row) -> Result<Photographer> {
    let styles: String = row.get("styles")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Photographer {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        title: row.get("title")?,
        location: row.get("location")?,
        bio: row.get("bio")?,
        avatar: row.get("avatar")?,
        wechat_id: row.get("wechat_id")?,
        phone: row.get("phone")?,
        styles: from_json(&styles, "styles")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Insert or fully replace a photographer profile.
    pub async fn upsert_photographer(&self, photographer: &Photographer) -> Result<()> {
        let record = photographer.clone();
        let styles = to_json(&record.styles, "styles")?;
        self.execute(move |conn| {
            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO photographers ({PHOTOGRAPHER_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    record.id,
                    record.owner_id,
                    record.name,
                    record.title,
                    record.location,
                    record.bio,
                    record.avatar,
                    record.wechat_id,
                    record.phone,
                    styles,
                    format_datetime(&record.created_at),
                    format_datetime(&record.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_photographer(&self, photographer_id: &str) -> Result<Option<Photographer>> {
        let photographer_id = photographer_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PHOTOGRAPHER_COLUMNS} FROM photographers WHERE id = ?1"
            ))?;
            let mut rows = stmt.query(params![photographer_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_photographer(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Resolve the photographer profile linked to a caller identity.
    pub async fn find_photographer_by_owner(&self, owner_id: &str) -> Result<Option<Photographer>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PHOTOGRAPHER_COLUMNS}
                 FROM photographers
                 WHERE owner_id = ?1
                 ORDER BY created_at ASC
                 LIMIT 1"
            ))?;
            let mut rows = stmt.query(params![owner_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_photographer(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Change the public-facing name and avatar of a profile.
    pub async fn update_photographer_profile(
        &self,
        photographer_id: &str,
        name: String,
        avatar: String,
    ) -> Result<()> {
        let photographer_id = photographer_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE photographers
                 SET name = ?1, avatar = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![name, avatar, format_datetime(&now()), photographer_id],
            )?;
            if rows_affected == 0 {
                return Err(anyhow!("Photographer not found"));
            }
            Ok(())
        })
        .await
    }

    pub async fn delete_photographer(&self, photographer_id: &str) -> Result<bool> {
        let photographer_id = photographer_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM photographers WHERE id = ?1",
                params![photographer_id],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }
}
