use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BookingStatus;

/// How the caller relates to the booking it is transitioning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ActorRole {
    Photographer,
    Requester,
    Other,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Photographer => "photographer",
            ActorRole::Requester => "requester",
            ActorRole::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "photographer" => Some(ActorRole::Photographer),
            "requester" => Some(ActorRole::Requester),
            "other" => Some(ActorRole::Other),
            _ => None,
        }
    }
}

/// Audit row written for every accepted status transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    pub id: i64,
    pub booking_id: String,
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub actor_id: String,
    pub actor_role: ActorRole,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}
