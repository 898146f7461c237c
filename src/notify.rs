//! Best-effort notifications.
//!
//! Delivery runs on its own task and reports failures through [`NotifyError`],
//! which never converts into the primary operation's error type. A failed
//! delivery is logged and, when a failure channel is attached, forwarded there.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error};
use thiserror::Error;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::db::{helpers::now, Booking, Database, Notification};

pub const NEW_BOOKING_KIND: &str = "new_booking";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification store rejected write: {0}")]
    Storage(String),
    #[error("notification sink unavailable")]
    Unavailable,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[async_trait]
impl NotificationSink for Database {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.insert_notification(notification)
            .await
            .map_err(|err| NotifyError::Storage(format!("{err:#}")))
    }
}

#[derive(Debug)]
pub struct NotifyFailure {
    pub notification: Notification,
    pub error: NotifyError,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    sink: Arc<dyn NotificationSink>,
    failures: Option<UnboundedSender<NotifyFailure>>,
}

impl NotificationDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            failures: None,
        }
    }

    /// Attach a channel that receives every failed delivery.
    pub fn with_failure_channel(mut self) -> (Self, UnboundedReceiver<NotifyFailure>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.failures = Some(tx);
        (self, rx)
    }

    /// Fire and forget. The returned handle is only for callers that want to
    /// wait for the attempt; it never carries an error.
    pub fn dispatch(&self, notification: Notification) -> JoinHandle<()> {
        let sink = self.sink.clone();
        let failures = self.failures.clone();

        tokio::spawn(async move {
            match sink.deliver(&notification).await {
                Ok(()) => debug!(
                    "Delivered {} notification to photographer {}",
                    notification.kind, notification.photographer_id
                ),
                Err(err) => {
                    error!(
                        "Failed to deliver {} notification to photographer {}: {}",
                        notification.kind, notification.photographer_id, err
                    );
                    if let Some(tx) = failures {
                        let _ = tx.send(NotifyFailure {
                            notification,
                            error: err,
                        });
                    }
                }
            }
        })
    }
}

pub fn new_booking_notification(booking: &Booking) -> Notification {
    Notification {
        id: format!("nt_{}", Uuid::new_v4()),
        photographer_id: booking.photographer_id.clone(),
        kind: NEW_BOOKING_KIND.to_string(),
        title: "新的预约".to_string(),
        content: format!("{} 预约了 {}", booking.client_name, booking.shoot_type),
        booking_id: Some(booking.id.clone()),
        is_read: false,
        created_at: now(),
    }
}
