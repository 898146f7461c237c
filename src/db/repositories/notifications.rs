use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime},
    models::Notification,
};

fn row_to_notification(row: &Row) -> Result<Notification> {
    let created_at: String = row.get("created_at")?;
    let is_read: i64 = row.get("is_read")?;
    Ok(Notification {
        id: row.get("id")?,
        photographer_id: row.get("photographer_id")?,
        kind: row.get("kind")?,
        title: row.get("title")?,
        content: row.get("content")?,
        booking_id: row.get("booking_id")?,
        is_read: is_read != 0,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let record = notification.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO notifications
                     (id, photographer_id, kind, title, content, booking_id, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.photographer_id,
                    record.kind,
                    record.title,
                    record.content,
                    record.booking_id,
                    record.is_read as i64,
                    format_datetime(&record.created_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Newest first.
    pub async fn notifications_for_photographer(
        &self,
        photographer_id: &str,
    ) -> Result<Vec<Notification>> {
        let photographer_id = photographer_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, photographer_id, kind, title, content, booking_id, is_read, created_at
                 FROM notifications
                 WHERE photographer_id = ?1
                 ORDER BY created_at DESC",
            )?;
            let mut rows = stmt.query(params![photographer_id])?;
            let mut notifications = Vec::new();
            while let Some(row) = rows.next()? {
                notifications.push(row_to_notification(row)?);
            }
            Ok(notifications)
        })
        .await
    }
}
