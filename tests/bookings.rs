mod common;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use common::{portrait_request, Fixture, Link, CLIENT, OWNER};
use photobook_lib::{
    client::PROVISIONAL_PREFIX,
    db::Notification,
    functions::{ListBookingsRequest, UpdateBookingRequest},
    notify::{NotificationDispatcher, NotificationSink, NotifyError},
    sync::ViewSource,
    BookingStatus, Caller, Database, Direction, ErrorKind, Functions, Schema, ServiceError,
};

#[tokio::test]
async fn created_booking_is_pending_with_photographer_snapshot() {
    let fixture = Fixture::new().await;
    let device = fixture.device(CLIENT).await;

    let created = device.create_booking(portrait_request()).await.unwrap();
    assert!(created.is_confirmed());
    let booking = &created.value;
    assert_eq!(booking.status, BookingStatus::Pending);
    assert!(booking.id.starts_with("BK"));
    assert_eq!(booking.photographer_name, "光影诗人");

    let photographer = fixture
        .remote
        .database()
        .get_photographer("default")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(booking.photographer_avatar, photographer.avatar);

    let state = device.state();
    assert_eq!(state.bookings.len(), 1);
    assert_eq!(state.bookings[0].value.id, booking.id);
}

#[tokio::test]
async fn snapshot_is_not_refreshed_after_profile_change() {
    let fixture = Fixture::new().await;
    let device = fixture.device(CLIENT).await;
    let created = device.create_booking(portrait_request()).await.unwrap();

    fixture
        .remote
        .database()
        .update_photographer_profile("default", "新名字".into(), "https://example.com/new.jpg".into())
        .await
        .unwrap();

    let listed = device.load_bookings(Direction::Sent).await.unwrap();
    assert_eq!(listed.source, ViewSource::Remote);
    let booking = &listed.items[0].value;
    assert_eq!(booking.id, created.value.id);
    assert_eq!(booking.photographer_name, "光影诗人");
    assert_eq!(booking.photographer_avatar, created.value.photographer_avatar);
}

#[tokio::test]
async fn missing_fields_fail_without_any_write() {
    let fixture = Fixture::new().await;
    let device = fixture.device(CLIENT).await;

    let mut request = portrait_request();
    request.date = None;
    let err = device.create_booking(request).await.unwrap_err();
    assert_eq!(err, ServiceError::MissingParameters(vec!["date"]));

    assert!(device.state().bookings.is_empty());
    let reopened = fixture.device(CLIENT).await;
    assert!(reopened.state().bookings.is_empty());
    let remote = fixture
        .remote
        .list_bookings(&Caller::new(CLIENT), ListBookingsRequest::default())
        .await
        .unwrap();
    assert!(remote.is_empty());
}

#[tokio::test]
async fn illegal_transition_is_rejected_at_both_layers() {
    let fixture = Fixture::new().await;
    let client = fixture.device(CLIENT).await;
    let booking = client.create_booking(portrait_request()).await.unwrap().value;

    let err = client
        .update_booking_status(&booking.id, "completed", None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::IllegalTransition {
            from: BookingStatus::Pending,
            to: BookingStatus::Completed,
        }
    );

    let err = fixture
        .remote
        .update_booking_status(
            &Caller::new(OWNER),
            UpdateBookingRequest {
                booking_id: Some(booking.id.clone()),
                status: Some("completed".into()),
                note: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalTransition);

    let stored = fixture
        .remote
        .database()
        .booking_status(&booking.id)
        .await
        .unwrap();
    assert_eq!(stored, Some(BookingStatus::Pending));
    assert_eq!(
        client.state().booking(&booking.id).unwrap().value.status,
        BookingStatus::Pending
    );
}

#[tokio::test]
async fn confirming_advances_updated_at() {
    let fixture = Fixture::new().await;
    let client = fixture.device(CLIENT).await;
    let booking = client.create_booking(portrait_request()).await.unwrap().value;

    let photographer = fixture.device(OWNER).await;
    photographer.set_photographer_mode(true);
    let received = photographer.load_bookings(Direction::Received).await.unwrap();
    assert_eq!(received.items.len(), 1);

    let confirmed = photographer
        .update_booking_status(&booking.id, "confirmed", Some("周六上午见".into()))
        .await
        .unwrap();
    assert!(confirmed.is_confirmed());
    assert_eq!(confirmed.value.status, BookingStatus::Confirmed);
    assert_eq!(confirmed.value.note.as_deref(), Some("周六上午见"));
    assert!(confirmed.value.updated_at > booking.updated_at);

    let trail = fixture
        .remote
        .database()
        .transitions_for_booking(&booking.id)
        .await
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].to, BookingStatus::Confirmed);
}

#[tokio::test]
async fn received_listing_needs_photographer_profile() {
    let fixture = Fixture::new().await;
    let client = fixture.device(CLIENT).await;

    let err = client.load_bookings(Direction::Received).await.unwrap_err();
    assert_eq!(err, ServiceError::NotAPhotographer);
}

#[tokio::test]
async fn timeout_keeps_pending_create_until_next_listing() {
    let fixture = Fixture::new().await;
    let device = fixture.device_with(CLIENT, Duration::from_millis(50)).await;

    fixture.link.set(Link::Hang);
    let pending = device.create_booking(portrait_request()).await.unwrap();
    assert!(!pending.is_confirmed());
    assert!(pending.value.id.starts_with(PROVISIONAL_PREFIX));
    assert_eq!(device.state().unconfirmed_bookings().count(), 1);

    let reopened = fixture.device(CLIENT).await;
    assert_eq!(reopened.state().unconfirmed_bookings().count(), 1);

    let offline = device.load_bookings(Direction::Sent).await.unwrap();
    assert_eq!(offline.source, ViewSource::LocalSnapshot);
    assert_eq!(offline.items.len(), 1);

    fixture.link.set(Link::Online);
    let listed = device.load_bookings(Direction::Sent).await.unwrap();
    assert_eq!(listed.source, ViewSource::Remote);
    assert!(listed.items.is_empty());
    assert!(device.state().bookings.is_empty());
}

#[tokio::test]
async fn unreachable_transition_is_shown_until_listing_restores_server_value() {
    let fixture = Fixture::new().await;
    let client = fixture.device(CLIENT).await;
    let booking = client.create_booking(portrait_request()).await.unwrap().value;

    fixture.link.set(Link::Offline);
    let shown = client
        .update_booking_status(&booking.id, "cancelled", None)
        .await
        .unwrap();
    assert!(!shown.is_confirmed());
    assert_eq!(shown.value.status, BookingStatus::Cancelled);

    fixture.link.set(Link::Online);
    let listed = client.load_bookings(Direction::Sent).await.unwrap();
    let restored = &listed.items[0];
    assert!(restored.is_confirmed());
    assert_eq!(restored.value.status, BookingStatus::Pending);
}

#[tokio::test]
async fn rejected_transition_rolls_back_optimistic_status() {
    let fixture = Fixture::new().await;
    let client = fixture.device(CLIENT).await;
    let booking = client.create_booking(portrait_request()).await.unwrap().value;

    // Another device cancels; this device's snapshot still says pending.
    fixture
        .remote
        .update_booking_status(
            &Caller::new(OWNER),
            UpdateBookingRequest {
                booking_id: Some(booking.id.clone()),
                status: Some("cancelled".into()),
                note: None,
            },
        )
        .await
        .unwrap();

    let err = client
        .update_booking_status(&booking.id, "confirmed", None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::IllegalTransition {
            from: BookingStatus::Cancelled,
            to: BookingStatus::Confirmed,
        }
    );

    let local = client.state().booking(&booking.id).cloned().unwrap();
    assert!(local.is_confirmed());
    assert_eq!(local.value.status, BookingStatus::Pending);
}

#[tokio::test]
async fn abandoned_create_still_reaches_remote_and_reconciles() {
    let fixture = Fixture::new().await;
    let device = fixture.device_with(CLIENT, Duration::from_secs(2)).await;
    fixture.link.set(Link::Slow(Duration::from_millis(100)));

    let abandoned =
        tokio::time::timeout(Duration::from_millis(10), device.create_booking(portrait_request()))
            .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;

    let remote = fixture
        .remote
        .list_bookings(&Caller::new(CLIENT), ListBookingsRequest::default())
        .await
        .unwrap();
    assert_eq!(remote.len(), 1);

    let state = device.state();
    assert_eq!(state.bookings.len(), 1);
    assert!(state.bookings[0].is_confirmed());
    assert_eq!(state.bookings[0].value.id, remote[0].id);
}

#[tokio::test]
async fn confirmed_create_clears_booking_draft() {
    let fixture = Fixture::new().await;
    let device = fixture.device(CLIENT).await;

    let mut draft = portrait_request();
    draft.notes = Some("想在海边拍".into());
    device.save_booking_draft(&draft).await.unwrap();
    assert_eq!(device.booking_draft("default").await.unwrap(), Some(draft.clone()));

    device.create_booking(draft).await.unwrap();
    assert!(device.booking_draft("default").await.unwrap().is_none());
}

struct BrokenSink;

#[async_trait]
impl NotificationSink for BrokenSink {
    async fn deliver(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Storage("disk full".into()))
    }
}

#[tokio::test]
async fn notification_failure_does_not_fail_create() {
    let db = Database::in_memory(Schema::Remote).unwrap();
    let (notifier, mut failures) =
        NotificationDispatcher::new(Arc::new(BrokenSink)).with_failure_channel();
    let remote = Functions::with_notifier(db, notifier);
    remote.init_data(&Caller::new(OWNER), false).await.unwrap();

    let booking = remote
        .create_booking(&Caller::new(CLIENT), portrait_request())
        .await
        .unwrap();

    let failure = tokio::time::timeout(Duration::from_secs(1), failures.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failure.notification.booking_id.as_deref(), Some(booking.id.as_str()));
    assert!(remote
        .database()
        .get_booking(&booking.id)
        .await
        .unwrap()
        .is_some());
}
