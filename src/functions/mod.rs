//! Remote operation surface.
//!
//! [`Functions`] plays the part of the serverless handlers sitting in front of
//! the authoritative collections. Each handler validates its own input and
//! consults the lifecycle table independently of whatever the client checked.

pub mod bookings;
pub mod seed;
pub mod works;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

use crate::{
    caller::Caller,
    db::{Booking, Database, DeletedWork, WorkPage},
    error::{Envelope, ServiceError, ServiceResult},
    lifecycle::{BookingEngine, CreateBookingRequest},
    notify::NotificationDispatcher,
};

pub use bookings::{Direction, ListBookingsRequest, UpdateBookingRequest};
pub use seed::{InitDataRequest, SeedReport, DEFAULT_PHOTOGRAPHER_ID};
pub use works::{DeleteWorkRequest, ListWorksRequest, PhotoInput, UploadWorkRequest};

/// The operations a device can invoke remotely.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn create_booking(
        &self,
        caller: &Caller,
        request: CreateBookingRequest,
    ) -> ServiceResult<Booking>;

    async fn update_booking_status(
        &self,
        caller: &Caller,
        request: UpdateBookingRequest,
    ) -> ServiceResult<Booking>;

    async fn list_bookings(
        &self,
        caller: &Caller,
        request: ListBookingsRequest,
    ) -> ServiceResult<Vec<Booking>>;

    async fn list_works(&self, caller: &Caller, request: ListWorksRequest)
        -> ServiceResult<WorkPage>;

    async fn delete_work(
        &self,
        caller: &Caller,
        request: DeleteWorkRequest,
    ) -> ServiceResult<DeletedWork>;

    async fn set_favorite(&self, caller: &Caller, work_id: &str, favorited: bool)
        -> ServiceResult<()>;
}

#[derive(Clone)]
pub struct Functions {
    db: Database,
    engine: BookingEngine,
    notifier: NotificationDispatcher,
}

impl Functions {
    /// Handlers over `db`, delivering notifications into the same store.
    pub fn new(db: Database) -> Self {
        let notifier = NotificationDispatcher::new(Arc::new(db.clone()));
        Self::with_notifier(db, notifier)
    }

    pub fn with_notifier(db: Database, notifier: NotificationDispatcher) -> Self {
        Self {
            engine: BookingEngine::new(db.clone()),
            db,
            notifier,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Route a named call with a JSON payload and answer with a JSON envelope.
    pub async fn invoke(&self, caller: &Caller, name: &str, payload: Value) -> Value {
        match name {
            "createBooking" => match decode(payload) {
                Ok(request) => respond(self.create_booking(caller, request).await),
                Err(err) => respond::<()>(Err(err)),
            },
            "updateBooking" => match decode(payload) {
                Ok(request) => respond(self.update_booking_status(caller, request).await),
                Err(err) => respond::<()>(Err(err)),
            },
            "getBookings" => match decode(payload) {
                Ok(request) => respond(self.list_bookings(caller, request).await),
                Err(err) => respond::<()>(Err(err)),
            },
            "getWorks" => match decode(payload) {
                Ok(request) => respond(self.list_works(caller, request).await),
                Err(err) => respond::<()>(Err(err)),
            },
            "deleteWork" => match decode(payload) {
                Ok(request) => respond(self.delete_work(caller, request).await),
                Err(err) => respond::<()>(Err(err)),
            },
            "uploadWork" => match decode(payload) {
                Ok(request) => respond(self.upload_work(caller, request).await),
                Err(err) => respond::<()>(Err(err)),
            },
            "initData" => match decode::<InitDataRequest>(payload) {
                Ok(request) => respond(self.init_data(caller, request.force).await),
                Err(err) => respond::<()>(Err(err)),
            },
            other => respond::<()>(Err(ServiceError::not_found("function", other))),
        }
    }
}

fn decode<T: DeserializeOwned>(payload: Value) -> ServiceResult<T> {
    let payload = if payload.is_null() { json!({}) } else { payload };
    serde_json::from_value(payload).map_err(|err| {
        log::warn!("Rejecting malformed payload: {err}");
        ServiceError::InvalidParameter(format!("malformed payload: {err}"))
    })
}

fn respond<T: Serialize>(result: ServiceResult<T>) -> Value {
    let envelope = Envelope::from(result);
    serde_json::to_value(&envelope).unwrap_or_else(|err| {
        json!({
            "success": false,
            "error": format!("failed to encode response: {err}"),
            "code": "internal",
        })
    })
}

#[async_trait]
impl Backend for Functions {
    async fn create_booking(
        &self,
        caller: &Caller,
        request: CreateBookingRequest,
    ) -> ServiceResult<Booking> {
        Functions::create_booking(self, caller, request).await
    }

    async fn update_booking_status(
        &self,
        caller: &Caller,
        request: UpdateBookingRequest,
    ) -> ServiceResult<Booking> {
        Functions::update_booking_status(self, caller, request).await
    }

    async fn list_bookings(
        &self,
        caller: &Caller,
        request: ListBookingsRequest,
    ) -> ServiceResult<Vec<Booking>> {
        Functions::list_bookings(self, caller, request).await
    }

    async fn list_works(
        &self,
        caller: &Caller,
        request: ListWorksRequest,
    ) -> ServiceResult<WorkPage> {
        Functions::list_works(self, caller, request).await
    }

    async fn delete_work(
        &self,
        caller: &Caller,
        request: DeleteWorkRequest,
    ) -> ServiceResult<DeletedWork> {
        Functions::delete_work(self, caller, request).await
    }

    async fn set_favorite(
        &self,
        caller: &Caller,
        work_id: &str,
        favorited: bool,
    ) -> ServiceResult<()> {
        Functions::set_favorite(self, caller, work_id, favorited).await
    }
}
