use anyhow::{anyhow, Result};
use rusqlite::{params, Row, Transaction};

use crate::{
    db::{
        helpers::{
            format_datetime, from_json, now, parse_optional_datetime, to_i64, to_json,
        },
        Booking, Work,
    },
    sync::{SyncState, Tracked},
};

use super::LocalCache;

fn row_to_tracked_booking(row: &Row) -> Result<Tracked<Booking>> {
    let payload: String = row.get("payload")?;
    let sync: String = row.get("sync_state")?;
    let pending_since: Option<String> = row.get("pending_since")?;

    Ok(Tracked {
        value: from_json(&payload, "booking payload")?,
        sync: SyncState::parse(&sync).ok_or_else(|| anyhow!("unknown sync state {sync}"))?,
        pending_since: parse_optional_datetime(pending_since, "pending_since")?,
    })
}

fn write_booking(tx: &Transaction, tracked: &Tracked<Booking>) -> Result<()> {
    tx.execute(
        "INSERT OR REPLACE INTO cached_bookings (id, payload, sync_state, pending_since, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            tracked.value.id,
            to_json(&tracked.value, "booking payload")?,
            tracked.sync.as_str(),
            tracked.pending_since.as_ref().map(format_datetime),
            format_datetime(&tracked.value.created_at),
        ],
    )?;
    Ok(())
}

impl LocalCache {
    /// Last-known bookings, newest first, each with its confirmation state.
    pub async fn bookings(&self) -> Result<Vec<Tracked<Booking>>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT payload, sync_state, pending_since
                     FROM cached_bookings
                     ORDER BY created_at DESC, id DESC",
                )?;
                let mut rows = stmt.query([])?;
                let mut bookings = Vec::new();
                while let Some(row) = rows.next()? {
                    bookings.push(row_to_tracked_booking(row)?);
                }
                Ok(bookings)
            })
            .await
    }

    pub async fn put_booking(&self, tracked: &Tracked<Booking>) -> Result<()> {
        let tracked = tracked.clone();
        self.db
            .execute(move |conn| {
                let tx = conn.transaction()?;
                write_booking(&tx, &tracked)?;
                tx.commit()?;
                Ok(())
            })
            .await
    }

    pub async fn remove_booking(&self, booking_id: &str) -> Result<bool> {
        let booking_id = booking_id.to_string();
        self.db
            .execute(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM cached_bookings WHERE id = ?1",
                    params![booking_id],
                )?;
                Ok(removed > 0)
            })
            .await
    }

    pub async fn replace_bookings(&self, bookings: &[Tracked<Booking>]) -> Result<()> {
        let bookings = bookings.to_vec();
        self.db
            .execute(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cached_bookings", [])?;
                for tracked in &bookings {
                    write_booking(&tx, tracked)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
    }

    /// Works in the order they were last listed.
    pub async fn works(&self) -> Result<Vec<Work>> {
        self.db
            .execute(|conn| {
                let mut stmt =
                    conn.prepare("SELECT payload FROM cached_works ORDER BY position")?;
                let mut rows = stmt.query([])?;
                let mut works = Vec::new();
                while let Some(row) = rows.next()? {
                    let payload: String = row.get("payload")?;
                    works.push(from_json(&payload, "work payload")?);
                }
                Ok(works)
            })
            .await
    }

    pub async fn replace_works(&self, works: &[Work]) -> Result<()> {
        let works = works.to_vec();
        let cached_at = format_datetime(&now());
        self.db
            .execute(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cached_works", [])?;
                for (position, work) in works.iter().enumerate() {
                    tx.execute(
                        "INSERT INTO cached_works (id, payload, position, cached_at)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            work.id,
                            to_json(work, "work payload")?,
                            to_i64(position as u64)?,
                            cached_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
    }

    pub async fn remove_work(&self, work_id: &str) -> Result<bool> {
        let work_id = work_id.to_string();
        self.db
            .execute(move |conn| {
                let removed =
                    conn.execute("DELETE FROM cached_works WHERE id = ?1", params![work_id])?;
                Ok(removed > 0)
            })
            .await
    }
}
