//! Server-side half of the lifecycle: booking creation and validated status
//! transitions against the authoritative `bookings` collection.
//!
//! Store reads and writes are the only suspension points; every decision
//! in between goes through the pure table in [`super::transitions`].

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    caller::Caller,
    db::{
        helpers::now, repositories::bookings::StatusChange, ActorRole, Booking, BookingStatus,
        Database, Photographer,
    },
    error::{ServiceError, ServiceResult},
};

use super::transitions::{check_transition, next_updated_at, Transition};

/// Display name used when the client leaves theirs blank.
pub const ANONYMOUS_CLIENT: &str = "匿名用户";

/// A status write that loses its compare-and-set is re-validated this many times.
const MAX_STATUS_ATTEMPTS: usize = 3;

/// Raw `createBooking` arguments. Every field is optional on the wire;
/// [`CreateBookingRequest::validate`] decides what is actually required.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub photographer_id: Option<String>,
    #[serde(rename = "type")]
    pub shoot_type: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub style: Option<String>,
    pub notes: Option<String>,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidBookingRequest {
    pub photographer_id: String,
    pub shoot_type: String,
    pub date: String,
    pub time_slot: String,
    pub location: String,
    pub style: String,
    pub notes: String,
    pub client_name: String,
    pub client_phone: String,
}

pub(crate) fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl CreateBookingRequest {
    pub fn validate(&self) -> ServiceResult<ValidBookingRequest> {
        let photographer_id = present(&self.photographer_id);
        let shoot_type = present(&self.shoot_type);
        let date = present(&self.date);
        let client_phone = present(&self.client_phone);

        match (photographer_id, shoot_type, date, client_phone) {
            (Some(photographer_id), Some(shoot_type), Some(date), Some(client_phone)) => {
                Ok(ValidBookingRequest {
                    photographer_id,
                    shoot_type,
                    date,
                    client_phone,
                    time_slot: self.time.clone().unwrap_or_default(),
                    location: self.location.clone().unwrap_or_default(),
                    style: self.style.clone().unwrap_or_default(),
                    notes: self.notes.clone().unwrap_or_default(),
                    client_name: present(&self.client_name)
                        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string()),
                })
            }
            (photographer_id, shoot_type, date, client_phone) => {
                let missing = [
                    ("photographerId", photographer_id.is_none()),
                    ("type", shoot_type.is_none()),
                    ("date", date.is_none()),
                    ("clientPhone", client_phone.is_none()),
                ]
                .into_iter()
                .filter_map(|(field, absent)| absent.then_some(field))
                .collect();
                Err(ServiceError::MissingParameters(missing))
            }
        }
    }
}

/// Photographer fields frozen into a booking at creation time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotographerSnapshot {
    pub name: String,
    pub avatar: String,
}

impl From<&Photographer> for PhotographerSnapshot {
    fn from(photographer: &Photographer) -> Self {
        Self {
            name: photographer.name.clone(),
            avatar: photographer.avatar.clone(),
        }
    }
}

impl ValidBookingRequest {
    pub fn into_booking(
        self,
        id: String,
        requester: &Caller,
        snapshot: &PhotographerSnapshot,
        at: DateTime<Utc>,
    ) -> Booking {
        Booking {
            id,
            requester_id: requester.as_str().to_string(),
            photographer_id: self.photographer_id,
            photographer_name: snapshot.name.clone(),
            photographer_avatar: snapshot.avatar.clone(),
            client_name: self.client_name,
            client_phone: self.client_phone,
            shoot_type: self.shoot_type,
            date: self.date,
            time_slot: self.time_slot,
            location: self.location,
            style: self.style,
            notes: self.notes,
            status: BookingStatus::Pending,
            note: None,
            created_at: at,
            updated_at: at,
        }
    }
}

pub fn new_booking_id() -> String {
    format!("BK{}", Uuid::new_v4().simple())
}

#[derive(Clone)]
pub struct BookingEngine {
    db: Database,
}

impl BookingEngine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create_booking(
        &self,
        requester: &Caller,
        request: ValidBookingRequest,
    ) -> ServiceResult<Booking> {
        let photographer = self
            .db
            .get_photographer(&request.photographer_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("photographer", &request.photographer_id))?;

        let booking = request.into_booking(
            new_booking_id(),
            requester,
            &PhotographerSnapshot::from(&photographer),
            now(),
        );
        self.db.insert_booking(&booking).await?;

        info!(
            "Created booking {} for photographer {}",
            booking.id, booking.photographer_id
        );
        Ok(booking)
    }

    /// Move a booking to `target`, re-validating against the stored status.
    ///
    /// Requesting the status the booking already has is a no-op that returns
    /// the stored record unchanged.
    pub async fn request_transition(
        &self,
        booking_id: &str,
        target: BookingStatus,
        actor: &Caller,
        note: Option<String>,
    ) -> ServiceResult<Booking> {
        for attempt in 1..=MAX_STATUS_ATTEMPTS {
            let booking = self
                .db
                .get_booking(booking_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("booking", booking_id))?;

            let (from, to) = match check_transition(booking.status, target)? {
                Transition::Unchanged(_) => return Ok(booking),
                Transition::Advance { from, to } => (from, to),
            };

            let actor_role = self.actor_role(actor, &booking).await?;
            let change = StatusChange {
                booking_id: booking.id.clone(),
                expected: from,
                next: to,
                note: note.clone(),
                updated_at: next_updated_at(booking.updated_at, now()),
                actor_id: actor.as_str().to_string(),
                actor_role,
            };

            if let Some(updated) = self.db.apply_status_change(change).await? {
                info!(
                    "Booking {} moved {} -> {} by {} ({})",
                    booking_id,
                    from,
                    to,
                    actor,
                    actor_role.as_str()
                );
                return Ok(updated);
            }

            warn!(
                "Booking {booking_id} changed status during transition to {to} (attempt {attempt}); re-validating"
            );
        }

        Err(ServiceError::Internal(format!(
            "booking {booking_id} kept changing while moving to {target}"
        )))
    }

    async fn actor_role(&self, actor: &Caller, booking: &Booking) -> ServiceResult<ActorRole> {
        if let Some(photographer) = self.db.find_photographer_by_owner(actor.as_str()).await? {
            if photographer.id == booking.photographer_id {
                return Ok(ActorRole::Photographer);
            }
        }
        if booking.requester_id == actor.as_str() {
            return Ok(ActorRole::Requester);
        }
        Ok(ActorRole::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Schema;

    fn photographer(owner: &str) -> Photographer {
        let at = now();
        Photographer {
            id: "default".into(),
            owner_id: Some(owner.into()),
            name: "光影诗人".into(),
            title: "独立摄影师".into(),
            location: "上海".into(),
            bio: String::new(),
            avatar: "https://example.com/avatar.jpg".into(),
            wechat_id: String::new(),
            phone: "13800000000".into(),
            styles: vec![],
            created_at: at,
            updated_at: at,
        }
    }

    fn request() -> CreateBookingRequest {
        CreateBookingRequest {
            photographer_id: Some("default".into()),
            shoot_type: Some("个人写真".into()),
            date: Some("2024-02-15".into()),
            client_phone: Some("13800000000".into()),
            ..Default::default()
        }
    }

    async fn engine() -> (BookingEngine, Database) {
        let db = Database::in_memory(Schema::Remote).unwrap();
        db.upsert_photographer(&photographer("studio-owner"))
            .await
            .unwrap();
        (BookingEngine::new(db.clone()), db)
    }

    #[test]
    fn validation_lists_every_missing_field() {
        let err = CreateBookingRequest {
            shoot_type: Some("  ".into()),
            date: Some("2024-02-15".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            err,
            ServiceError::MissingParameters(vec!["photographerId", "type", "clientPhone"])
        );
    }

    #[test]
    fn validation_fills_defaults() {
        let valid = request().validate().unwrap();
        assert_eq!(valid.client_name, ANONYMOUS_CLIENT);
        assert_eq!(valid.time_slot, "");
    }

    #[tokio::test]
    async fn creates_pending_booking_with_snapshot() {
        let (engine, _db) = engine().await;
        let booking = engine
            .create_booking(&Caller::new("client-1"), request().validate().unwrap())
            .await
            .unwrap();

        assert!(booking.id.starts_with("BK"));
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.photographer_name, "光影诗人");
        assert_eq!(booking.photographer_avatar, "https://example.com/avatar.jpg");
        assert_eq!(booking.requester_id, "client-1");
    }

    #[tokio::test]
    async fn unknown_photographer_is_not_found() {
        let (engine, db) = engine().await;
        let mut req = request();
        req.photographer_id = Some("ghost".into());
        let err = engine
            .create_booking(&Caller::new("client-1"), req.validate().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::not_found("photographer", "ghost"));
        assert!(db
            .list_bookings(
                crate::db::BookingScope::Requester("client-1".into()),
                None
            )
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn same_status_is_a_no_op() {
        let (engine, db) = engine().await;
        let booking = engine
            .create_booking(&Caller::new("client-1"), request().validate().unwrap())
            .await
            .unwrap();

        let again = engine
            .request_transition(
                &booking.id,
                BookingStatus::Pending,
                &Caller::new("studio-owner"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(again, booking);
        assert!(db.transitions_for_booking(&booking.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn records_actor_role_in_audit_trail() {
        let (engine, db) = engine().await;
        let booking = engine
            .create_booking(&Caller::new("client-1"), request().validate().unwrap())
            .await
            .unwrap();

        engine
            .request_transition(
                &booking.id,
                BookingStatus::Confirmed,
                &Caller::new("studio-owner"),
                Some("周六下午见".into()),
            )
            .await
            .unwrap();
        engine
            .request_transition(
                &booking.id,
                BookingStatus::Cancelled,
                &Caller::new("client-1"),
                None,
            )
            .await
            .unwrap();

        let audit = db.transitions_for_booking(&booking.id).await.unwrap();
        let roles: Vec<_> = audit.iter().map(|r| r.actor_role).collect();
        assert_eq!(roles, vec![ActorRole::Photographer, ActorRole::Requester]);
        assert_eq!(audit[0].note.as_deref(), Some("周六下午见"));

        let stored = db.get_booking(&booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
        // The confirm note survives a later transition without one.
        assert_eq!(stored.note.as_deref(), Some("周六下午见"));
    }

    #[tokio::test]
    async fn racing_conflicting_transitions_apply_exactly_one() {
        let (engine, db) = engine().await;
        let booking = engine
            .create_booking(&Caller::new("client-1"), request().validate().unwrap())
            .await
            .unwrap();
        engine
            .request_transition(
                &booking.id,
                BookingStatus::Confirmed,
                &Caller::new("studio-owner"),
                None,
            )
            .await
            .unwrap();

        let photographer = Caller::new("studio-owner");
        let client = Caller::new("client-1");
        let (shoot, cancel) = tokio::join!(
            engine.request_transition(&booking.id, BookingStatus::Shooting, &photographer, None),
            engine.request_transition(&booking.id, BookingStatus::Cancelled, &client, None),
        );

        assert!(shoot.is_ok() ^ cancel.is_ok());
        let loser = shoot.err().or(cancel.err()).unwrap();
        assert!(matches!(loser, ServiceError::IllegalTransition { .. }));

        let audit = db.transitions_for_booking(&booking.id).await.unwrap();
        assert_eq!(audit.len(), 2);
    }
}
