//! The booking status table. Everything here is synchronous and pure; the
//! client and the remote handler both consult it.

use chrono::{DateTime, Duration, Utc};

use crate::{
    db::BookingStatus,
    error::{ServiceError, ServiceResult},
};

/// Outgoing edges of `from`. Terminal states have none.
pub fn allowed_targets(from: BookingStatus) -> &'static [BookingStatus] {
    match from {
        BookingStatus::Pending => &[BookingStatus::Confirmed, BookingStatus::Cancelled],
        BookingStatus::Confirmed => &[BookingStatus::Shooting, BookingStatus::Cancelled],
        BookingStatus::Shooting => &[BookingStatus::Review],
        BookingStatus::Review => &[BookingStatus::Completed],
        BookingStatus::Completed | BookingStatus::Cancelled => &[],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Source and target are the same state; nothing to write.
    Unchanged(BookingStatus),
    Advance {
        from: BookingStatus,
        to: BookingStatus,
    },
}

pub fn check_transition(from: BookingStatus, to: BookingStatus) -> ServiceResult<Transition> {
    if from == to {
        return Ok(Transition::Unchanged(from));
    }
    if allowed_targets(from).contains(&to) {
        Ok(Transition::Advance { from, to })
    } else {
        Err(ServiceError::IllegalTransition { from, to })
    }
}

pub fn parse_target(raw: &str) -> ServiceResult<BookingStatus> {
    BookingStatus::parse(raw.trim()).ok_or_else(|| ServiceError::InvalidStatus(raw.to_string()))
}

/// `updatedAt` for an accepted mutation: wall-clock time, bumped past the
/// previous value when the clock has not moved (or moved backwards).
pub fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::milliseconds(1);
    if now < floor {
        floor
    } else {
        now
    }
}
