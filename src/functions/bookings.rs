use serde::{Deserialize, Serialize};

use crate::{
    caller::Caller,
    db::{Booking, BookingScope},
    error::{ServiceError, ServiceResult},
    lifecycle::{engine::present, parse_target, CreateBookingRequest},
    notify::new_booking_notification,
};

use super::Functions;

/// Which side of the booking relation a listing covers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Bookings the caller requested.
    #[default]
    Sent,
    /// Bookings addressed to the caller's photographer profile.
    Received,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    pub booking_id: Option<String>,
    pub status: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListBookingsRequest {
    #[serde(default, alias = "type")]
    pub direction: Direction,
    /// A status name, or `"all"` / absent for no filter.
    #[serde(default, alias = "status")]
    pub status_filter: Option<String>,
}

impl Functions {
    pub async fn create_booking(
        &self,
        caller: &Caller,
        request: CreateBookingRequest,
    ) -> ServiceResult<Booking> {
        let valid = request.validate()?;
        let booking = self.engine.create_booking(caller, valid).await?;

        // Detached: delivery failures are logged by the dispatcher only.
        drop(self.notifier.dispatch(new_booking_notification(&booking)));

        Ok(booking)
    }

    pub async fn update_booking_status(
        &self,
        caller: &Caller,
        request: UpdateBookingRequest,
    ) -> ServiceResult<Booking> {
        let (booking_id, status) = match (present(&request.booking_id), present(&request.status)) {
            (Some(booking_id), Some(status)) => (booking_id, status),
            (booking_id, status) => {
                let mut missing = Vec::new();
                if booking_id.is_none() {
                    missing.push("bookingId");
                }
                if status.is_none() {
                    missing.push("status");
                }
                return Err(ServiceError::MissingParameters(missing));
            }
        };

        let target = parse_target(&status)?;
        self.engine
            .request_transition(&booking_id, target, caller, present(&request.note))
            .await
    }

    pub async fn list_bookings(
        &self,
        caller: &Caller,
        request: ListBookingsRequest,
    ) -> ServiceResult<Vec<Booking>> {
        let status = match request.status_filter.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(parse_target(raw)?),
        };

        let scope = match request.direction {
            Direction::Sent => BookingScope::Requester(caller.as_str().to_string()),
            Direction::Received => {
                let photographer = self
                    .db
                    .find_photographer_by_owner(caller.as_str())
                    .await?
                    .ok_or(ServiceError::NotAPhotographer)?;
                BookingScope::Photographer(photographer.id)
            }
        };

        Ok(self.db.list_bookings(scope, status).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::{
        db::{BookingStatus, Database, Schema},
        error::ErrorKind,
    };

    async fn seeded() -> Functions {
        let db = Database::in_memory(Schema::Remote).unwrap();
        let functions = Functions::new(db);
        functions
            .init_data(&Caller::new("studio-owner"), false)
            .await
            .unwrap();
        functions
    }

    fn portrait_request() -> CreateBookingRequest {
        CreateBookingRequest {
            photographer_id: Some("default".into()),
            shoot_type: Some("个人写真".into()),
            date: Some("2024-02-15".into()),
            client_phone: Some("13800000000".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_appends_notification_for_photographer() {
        let functions = seeded().await;
        let booking = functions
            .create_booking(&Caller::new("client-1"), portrait_request())
            .await
            .unwrap();

        let mut delivered = Vec::new();
        for _ in 0..50 {
            delivered = functions
                .database()
                .notifications_for_photographer("default")
                .await
                .unwrap();
            if !delivered.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].booking_id.as_deref(), Some(booking.id.as_str()));
        assert_eq!(delivered[0].content, "匿名用户 预约了 个人写真");
    }

    #[tokio::test]
    async fn missing_fields_write_nothing() {
        let functions = seeded().await;
        let caller = Caller::new("client-1");
        for strip in 0..4 {
            let mut request = portrait_request();
            match strip {
                0 => request.photographer_id = None,
                1 => request.shoot_type = None,
                2 => request.date = None,
                _ => request.client_phone = Some(String::new()),
            }
            let err = functions
                .create_booking(&caller, request)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MissingParameters);
        }

        let sent = functions
            .list_bookings(&caller, ListBookingsRequest::default())
            .await
            .unwrap();
        assert!(sent.is_empty());
    }

    #[tokio::test]
    async fn update_rejects_unknown_status_before_lookup() {
        let functions = seeded().await;
        let err = functions
            .update_booking_status(
                &Caller::new("studio-owner"),
                UpdateBookingRequest {
                    booking_id: Some("BK-missing".into()),
                    status: Some("archived".into()),
                    note: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::InvalidStatus("archived".into()));

        let err = functions
            .update_booking_status(
                &Caller::new("studio-owner"),
                UpdateBookingRequest {
                    booking_id: Some("BK-missing".into()),
                    status: Some("confirmed".into()),
                    note: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn received_listing_requires_photographer_profile() {
        let functions = seeded().await;
        functions
            .create_booking(&Caller::new("client-1"), portrait_request())
            .await
            .unwrap();

        let err = functions
            .list_bookings(
                &Caller::new("client-1"),
                ListBookingsRequest {
                    direction: Direction::Received,
                    status_filter: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::NotAPhotographer);

        let received = functions
            .list_bookings(
                &Caller::new("studio-owner"),
                ListBookingsRequest {
                    direction: Direction::Received,
                    status_filter: Some("all".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn invoke_wraps_results_in_envelope() {
        let functions = seeded().await;
        let caller = Caller::new("client-1");

        let created = functions
            .invoke(
                &caller,
                "createBooking",
                json!({
                    "photographerId": "default",
                    "type": "情侣照",
                    "date": "2024-02-18",
                    "clientPhone": "13900000000",
                    "clientName": "晓晓"
                }),
            )
            .await;
        assert_eq!(created["success"], true);
        assert_eq!(created["data"]["status"], "pending");
        assert_eq!(created["data"]["clientName"], "晓晓");
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let illegal = functions
            .invoke(
                &Caller::new("studio-owner"),
                "updateBooking",
                json!({ "bookingId": id, "status": "completed" }),
            )
            .await;
        assert_eq!(illegal["success"], false);
        assert_eq!(illegal["code"], "illegalTransition");
        assert_eq!(illegal["error"], "illegal transition from pending to completed");

        let listed = functions
            .invoke(&caller, "getBookings", json!({ "type": "sent", "status": "pending" }))
            .await;
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);

        let unknown = functions.invoke(&caller, "sendInvoice", json!({})).await;
        assert_eq!(unknown["code"], "notFound");
    }
}
