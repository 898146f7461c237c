use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, from_json, parse_datetime, to_i64, to_json, to_u64},
    models::Work,
};

const WORK_COLUMNS: &str = "id, photographer_id, owner_id, title, description, style, photos,
     camera, lens, likes, views, created_at, updated_at";

fn row_to_work(row: &Row) -> Result<Work> {
    let photos: String = row.get("photos")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Work {
        id: row.get("id")?,
        photographer_id: row.get("photographer_id")?,
        owner_id: row.get("owner_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        style: row.get("style")?,
        photos: from_json(&photos, "photos")?,
        camera: row.get("camera")?,
        lens: row.get("lens")?,
        likes: row.get("likes")?,
        views: row.get("views")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

/// Rows removed alongside a work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkCascade {
    pub favorites_removed: usize,
    pub comments_removed: usize,
}

impl Database {
    pub async fn insert_work(&self, work: &Work) -> Result<()> {
        let record = work.clone();
        let photos = to_json(&record.photos, "photos")?;
        self.execute(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO works ({WORK_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
                ),
                params![
                    record.id,
                    record.photographer_id,
                    record.owner_id,
                    record.title,
                    record.description,
                    record.style,
                    photos,
                    record.camera,
                    record.lens,
                    record.likes,
                    record.views,
                    format_datetime(&record.created_at),
                    format_datetime(&record.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_work(&self, work_id: &str) -> Result<Option<Work>> {
        let work_id = work_id.to_string();
        self.execute(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {WORK_COLUMNS} FROM works WHERE id = ?1"))?;
            let mut rows = stmt.query(params![work_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_work(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// One page of a photographer's works, newest first, with the unpaged total.
    pub async fn list_works(
        &self,
        photographer_id: &str,
        style: Option<String>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Work>, u64)> {
        let photographer_id = photographer_id.to_string();
        self.execute(move |conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM works
                 WHERE photographer_id = ?1 AND (?2 IS NULL OR style = ?2)",
                params![photographer_id, style],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {WORK_COLUMNS}
                 FROM works
                 WHERE photographer_id = ?1 AND (?2 IS NULL OR style = ?2)
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?3 OFFSET ?4"
            ))?;
            let mut rows = stmt.query(params![
                photographer_id,
                style,
                to_i64(limit)?,
                to_i64(offset)?
            ])?;

            let mut works = Vec::new();
            while let Some(row) = rows.next()? {
                works.push(row_to_work(row)?);
            }

            Ok((works, to_u64(total, "total")?))
        })
        .await
    }

    /// Remove a work together with every favorite and comment referencing it.
    pub async fn delete_work_cascade(&self, work_id: &str) -> Result<WorkCascade> {
        let work_id = work_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM works WHERE id = ?1", params![work_id])?;
            let favorites_removed =
                tx.execute("DELETE FROM favorites WHERE work_id = ?1", params![work_id])?;
            let comments_removed =
                tx.execute("DELETE FROM comments WHERE work_id = ?1", params![work_id])?;
            tx.commit()?;

            Ok(WorkCascade {
                favorites_removed,
                comments_removed,
            })
        })
        .await
    }

    pub async fn delete_all_works(&self) -> Result<usize> {
        self.execute(|conn| Ok(conn.execute("DELETE FROM works", [])?))
            .await
    }
}
