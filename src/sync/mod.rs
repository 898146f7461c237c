//! Reconciliation of optimistic local writes with remote outcomes.
//!
//! Every entity the client writes optimistically is held as a [`Tracked`]
//! value whose [`SyncState`] says whether the remote store has acknowledged
//! it. [`reconcile`] folds a [`RemoteOutcome`] into the pending write:
//!
//! - confirmed: the server record replaces the local one
//! - rejected: the pre-mutation value is restored and the reason surfaced
//! - unreachable: the optimistic value stays, still marked pending

pub mod sequencer;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

pub use sequencer::{SequenceGuard, Sequencer, Watermark};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    PendingLocal,
    ConfirmedRemote,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::PendingLocal => "pending_local",
            SyncState::ConfirmedRemote => "confirmed_remote",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending_local" => Some(SyncState::PendingLocal),
            "confirmed_remote" => Some(SyncState::ConfirmedRemote),
            _ => None,
        }
    }
}

/// Entities that can be keyed in a snapshot.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for crate::db::Booking {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for crate::db::Work {
    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tracked<T> {
    pub value: T,
    pub sync: SyncState,
    pub pending_since: Option<DateTime<Utc>>,
}

impl<T> Tracked<T> {
    pub fn confirmed(value: T) -> Self {
        Self {
            value,
            sync: SyncState::ConfirmedRemote,
            pending_since: None,
        }
    }

    pub fn pending(value: T, since: DateTime<Utc>) -> Self {
        Self {
            value,
            sync: SyncState::PendingLocal,
            pending_since: Some(since),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.sync == SyncState::ConfirmedRemote
    }
}

/// An optimistic write as the client applied it: the value it replaced
/// (`None` for a create) and the value now shown.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite<T> {
    pub before: Option<Tracked<T>>,
    pub after: Tracked<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome<T> {
    Confirmed(T),
    Rejected(ServiceError),
    Unreachable(String),
}

impl<T> From<ServiceResult<T>> for RemoteOutcome<T> {
    fn from(result: ServiceResult<T>) -> Self {
        match result {
            Ok(value) => RemoteOutcome::Confirmed(value),
            Err(ServiceError::RemoteUnavailable(reason)) => RemoteOutcome::Unreachable(reason),
            Err(err) => RemoteOutcome::Rejected(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled<T> {
    Confirmed(Tracked<T>),
    RolledBack {
        restored: Option<Tracked<T>>,
        reason: ServiceError,
    },
    Retained(Tracked<T>),
}

impl<T> Reconciled<T> {
    /// What the local snapshot should now hold for the entity.
    pub fn view(&self) -> Option<&Tracked<T>> {
        match self {
            Reconciled::Confirmed(tracked) | Reconciled::Retained(tracked) => Some(tracked),
            Reconciled::RolledBack { restored, .. } => restored.as_ref(),
        }
    }
}

pub fn reconcile<T>(local: PendingWrite<T>, outcome: RemoteOutcome<T>) -> Reconciled<T> {
    match outcome {
        RemoteOutcome::Confirmed(server) => Reconciled::Confirmed(Tracked::confirmed(server)),
        RemoteOutcome::Rejected(reason) => Reconciled::RolledBack {
            restored: local.before,
            reason,
        },
        RemoteOutcome::Unreachable(_) => Reconciled::Retained(local.after),
    }
}

/// Where a listed view came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ViewSource {
    Remote,
    LocalSnapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListView<T> {
    pub items: Vec<T>,
    pub source: ViewSource,
}

impl<T> ListView<T> {
    pub fn is_stale(&self) -> bool {
        self.source == ViewSource::LocalSnapshot
    }
}

/// Replace a local snapshot with a freshly fetched remote list.
///
/// Entries in `keep` were reconciled after the fetch was issued; their local
/// value is newer than the listed one and survives, even when the listing
/// predates them entirely. Every other local entry is overwritten or dropped.
pub fn merge_snapshot<T: Keyed + Clone>(
    local: &[Tracked<T>],
    remote: Vec<T>,
    keep: &HashSet<String>,
) -> Vec<Tracked<T>> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Tracked<T>> = remote
        .into_iter()
        .map(|item| {
            seen.insert(item.key().to_string());
            if keep.contains(item.key()) {
                if let Some(newer) = local.iter().find(|t| t.value.key() == item.key()) {
                    return newer.clone();
                }
            }
            Tracked::confirmed(item)
        })
        .collect();

    let mut fresh: Vec<Tracked<T>> = local
        .iter()
        .filter(|t| keep.contains(t.value.key()) && !seen.contains(t.value.key()))
        .cloned()
        .collect();
    fresh.append(&mut merged);
    fresh
}
