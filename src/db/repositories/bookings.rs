use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, parse_status},
    models::{ActorRole, Booking, BookingStatus, TransitionRecord},
};

const BOOKING_COLUMNS: &str = "id, requester_id, photographer_id, photographer_name, photographer_avatar,
     client_name, client_phone, shoot_type, date, time_slot, location, style, notes,
     status, note, created_at, updated_at";

/// Which side of a booking a listing is taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingScope {
    Requester(String),
    Photographer(String),
}

fn row_to_booking(row: &Row) -> Result<Booking> {
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Booking {
        id: row.get("id")?,
        requester_id: row.get("requester_id")?,
        photographer_id: row.get("photographer_id")?,
        photographer_name: row.get("photographer_name")?,
        photographer_avatar: row.get("photographer_avatar")?,
        client_name: row.get("client_name")?,
        client_phone: row.get("client_phone")?,
        shoot_type: row.get("shoot_type")?,
        date: row.get("date")?,
        time_slot: row.get("time_slot")?,
        location: row.get("location")?,
        style: row.get("style")?,
        notes: row.get("notes")?,
        status: parse_status(&status)?,
        note: row.get("note")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn row_to_transition(row: &Row) -> Result<TransitionRecord> {
    let from: String = row.get("from_status")?;
    let to: String = row.get("to_status")?;
    let role: String = row.get("actor_role")?;
    let at: String = row.get("at")?;

    Ok(TransitionRecord {
        id: row.get("id")?,
        booking_id: row.get("booking_id")?,
        from: parse_status(&from)?,
        to: parse_status(&to)?,
        actor_id: row.get("actor_id")?,
        actor_role: ActorRole::parse(&role).ok_or_else(|| anyhow!("unknown actor role {role}"))?,
        note: row.get("note")?,
        at: parse_datetime(&at, "at")?,
    })
}

fn load_booking(conn: &rusqlite::Connection, booking_id: &str) -> Result<Option<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"
    ))?;
    let mut rows = stmt.query(params![booking_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_booking(row)?)),
        None => Ok(None),
    }
}

/// A validated status change, applied only if the stored status still
/// equals `expected`.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub booking_id: String,
    pub expected: BookingStatus,
    pub next: BookingStatus,
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub actor_id: String,
    pub actor_role: ActorRole,
}

impl Database {
    pub async fn insert_booking(&self, booking: &Booking) -> Result<()> {
        let record = booking.clone();
        self.execute(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO bookings ({BOOKING_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
                ),
                params![
                    record.id,
                    record.requester_id,
                    record.photographer_id,
                    record.photographer_name,
                    record.photographer_avatar,
                    record.client_name,
                    record.client_phone,
                    record.shoot_type,
                    record.date,
                    record.time_slot,
                    record.location,
                    record.style,
                    record.notes,
                    record.status.as_str(),
                    record.note,
                    format_datetime(&record.created_at),
                    format_datetime(&record.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>> {
        let booking_id = booking_id.to_string();
        self.execute(move |conn| load_booking(conn, &booking_id)).await
    }

    /// Compare-and-set on `status`, plus the audit row, in one transaction.
    ///
    /// Returns `None` when the booking is missing or its status moved away from
    /// `change.expected` since the caller read it.
    pub async fn apply_status_change(&self, change: StatusChange) -> Result<Option<Booking>> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let updated_at = format_datetime(&change.updated_at);

            let rows_affected = tx.execute(
                "UPDATE bookings
                 SET status = ?1,
                     note = COALESCE(?2, note),
                     updated_at = ?3
                 WHERE id = ?4 AND status = ?5",
                params![
                    change.next.as_str(),
                    change.note,
                    updated_at,
                    change.booking_id,
                    change.expected.as_str(),
                ],
            )?;

            if rows_affected == 0 {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO booking_transitions
                     (booking_id, from_status, to_status, actor_id, actor_role, note, at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    change.booking_id,
                    change.expected.as_str(),
                    change.next.as_str(),
                    change.actor_id,
                    change.actor_role.as_str(),
                    change.note,
                    updated_at,
                ],
            )?;

            let booking = load_booking(&tx, &change.booking_id)?
                .ok_or_else(|| anyhow!("Booking not found after update"))?;
            tx.commit()?;

            Ok(Some(booking))
        })
        .await
    }

    /// Bookings for one side of the relation, newest first.
    pub async fn list_bookings(
        &self,
        scope: BookingScope,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>> {
        self.execute(move |conn| {
            let (column, owner) = match scope {
                BookingScope::Requester(id) => ("requester_id", id),
                BookingScope::Photographer(id) => ("photographer_id", id),
            };

            let mut stmt = conn.prepare(&format!(
                "SELECT {BOOKING_COLUMNS}
                 FROM bookings
                 WHERE {column} = ?1 AND (?2 IS NULL OR status = ?2)
                 ORDER BY created_at DESC, id DESC"
            ))?;

            let mut rows = stmt.query(params![owner, status.map(|s| s.as_str())])?;
            let mut bookings = Vec::new();
            while let Some(row) = rows.next()? {
                bookings.push(row_to_booking(row)?);
            }

            Ok(bookings)
        })
        .await
    }

    pub async fn transitions_for_booking(&self, booking_id: &str) -> Result<Vec<TransitionRecord>> {
        let booking_id = booking_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, booking_id, from_status, to_status, actor_id, actor_role, note, at
                 FROM booking_transitions
                 WHERE booking_id = ?1
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query(params![booking_id])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_transition(row)?);
            }
            Ok(records)
        })
        .await
    }

    pub async fn booking_status(&self, booking_id: &str) -> Result<Option<BookingStatus>> {
        let booking_id = booking_id.to_string();
        self.execute(move |conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT status FROM bookings WHERE id = ?1",
                    params![booking_id],
                    |row| row.get(0),
                )
                .optional()?;
            raw.map(|value| parse_status(&value)).transpose()
        })
        .await
    }
}
