use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime},
    models::Comment,
};

fn row_to_comment(row: &Row) -> Result<Comment> {
    let created_at: String = row.get("created_at")?;
    Ok(Comment {
        id: row.get("id")?,
        work_id: row.get("work_id")?,
        author_id: row.get("author_id")?,
        content: row.get("content")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_comment(&self, comment: &Comment) -> Result<()> {
        let record = comment.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO comments (id, work_id, author_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.work_id,
                    record.author_id,
                    record.content,
                    format_datetime(&record.created_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn comments_for_work(&self, work_id: &str) -> Result<Vec<Comment>> {
        let work_id = work_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, work_id, author_id, content, created_at
                 FROM comments
                 WHERE work_id = ?1
                 ORDER BY created_at ASC",
            )?;
            let mut rows = stmt.query(params![work_id])?;
            let mut comments = Vec::new();
            while let Some(row) = rows.next()? {
                comments.push(row_to_comment(row)?);
            }
            Ok(comments)
        })
        .await
    }
}
