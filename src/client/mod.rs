//! Device-side storefront.
//!
//! Reads come from the in-memory [`AppState`] (hydrated from the
//! [`LocalCache`]); writes are applied locally first and then settled against
//! the [`Backend`] on a spawned task, so dropping the caller's future never
//! cancels a write that already left the device.

pub mod state;

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use anyhow::Result;
use log::error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    cache::LocalCache,
    caller::Caller,
    config::StorefrontConfig,
    db::{helpers::now, Booking, BookingStatus, DeletedWork, FavoriteStats, LocalFavorite, Work},
    error::{ServiceError, ServiceResult},
    functions::{Backend, DeleteWorkRequest, Direction, ListBookingsRequest, ListWorksRequest, UpdateBookingRequest},
    lifecycle::{
        check_transition, engine::PhotographerSnapshot, next_updated_at, parse_target,
        CreateBookingRequest, Transition,
    },
    log_debug, log_info, log_warn,
    sync::{
        merge_snapshot, reconcile, ListView, PendingWrite, Reconciled, RemoteOutcome, Sequencer,
        Tracked, ViewSource,
    },
};

pub use state::{AppState, StateCommand};

const ENABLE_LOGS: bool = true;

/// IDs given to bookings before the remote store has assigned one.
pub const PROVISIONAL_PREFIX: &str = "local-";

const DEFAULT_DRAFT_PHOTOGRAPHER: &str = "default";

#[derive(Debug, Clone, Copy)]
pub struct StorefrontOptions {
    pub remote_timeout: Duration,
    pub page_size: u32,
}

impl Default for StorefrontOptions {
    fn default() -> Self {
        StorefrontOptions::from(&StorefrontConfig::default())
    }
}

impl From<&StorefrontConfig> for StorefrontOptions {
    fn from(config: &StorefrontConfig) -> Self {
        Self {
            remote_timeout: config.remote_timeout,
            page_size: config.page_size,
        }
    }
}

#[derive(Clone)]
pub struct Storefront {
    caller: Caller,
    backend: Arc<dyn Backend>,
    cache: LocalCache,
    state: Arc<RwLock<AppState>>,
    sequencer: Arc<Sequencer>,
    /// Serializes snapshot writes so the cache always ends on the latest state.
    persist: Arc<tokio::sync::Mutex<()>>,
    background: Arc<Mutex<Vec<JoinHandle<()>>>>,
    options: StorefrontOptions,
}

fn draft_key(photographer_id: &str) -> String {
    format!("booking:{photographer_id}")
}

impl Storefront {
    /// Build a storefront whose initial state is whatever the cache holds.
    pub async fn open(
        caller: Caller,
        backend: Arc<dyn Backend>,
        cache: LocalCache,
        options: StorefrontOptions,
    ) -> Result<Self> {
        let state = AppState {
            photographer_mode: false,
            works: cache.works().await?,
            bookings: cache.bookings().await?,
            favorites: cache.favorites().await?,
        };

        log_info!(
            "Hydrated storefront for {}: {} works, {} bookings ({} unconfirmed), {} favorites",
            caller,
            state.works.len(),
            state.bookings.len(),
            state.unconfirmed_bookings().count(),
            state.favorites.len()
        );

        Ok(Self {
            caller,
            backend,
            cache,
            state: Arc::new(RwLock::new(state)),
            sequencer: Arc::new(Sequencer::new()),
            persist: Arc::new(tokio::sync::Mutex::new(())),
            background: Arc::new(Mutex::new(Vec::new())),
            options,
        })
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    fn read_state(&self) -> RwLockReadGuard<'_, AppState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, AppState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn background_tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        match self.background.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn state(&self) -> AppState {
        self.read_state().clone()
    }

    /// Apply a command to the in-memory state and return the resulting state.
    /// Nothing is persisted.
    pub fn dispatch(&self, command: StateCommand) -> AppState {
        let mut guard = self.write_state();
        let next = guard.apply(command);
        *guard = next.clone();
        next
    }

    pub fn set_photographer_mode(&self, enabled: bool) {
        self.dispatch(StateCommand::SetPhotographerMode(enabled));
    }

    async fn with_timeout<T>(
        &self,
        operation: &str,
        call: impl Future<Output = ServiceResult<T>>,
    ) -> ServiceResult<T> {
        match tokio::time::timeout(self.options.remote_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                log_warn!(
                    "{} gave no answer within {}ms",
                    operation,
                    self.options.remote_timeout.as_millis()
                );
                Err(ServiceError::RemoteUnavailable(format!(
                    "{operation} timed out after {}ms",
                    self.options.remote_timeout.as_millis()
                )))
            }
        }
    }

    /// Run `task` to completion on its own tokio task and wait for it.
    async fn detached<T, F>(task: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(task)
            .await
            .map_err(|err| ServiceError::Internal(format!("background task failed: {err}")))?
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.background_tasks();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Wait for every best-effort background write started so far.
    pub async fn settle(&self) {
        let tasks = std::mem::take(&mut *self.background_tasks());
        for task in tasks {
            if let Err(err) = task.await {
                error!("Background storefront task failed: {err}");
            }
        }
    }

    async fn persist_bookings(&self) {
        let _turn = self.persist.lock().await;
        let bookings = self.read_state().bookings.clone();
        match self.cache.replace_bookings(&bookings).await {
            Ok(()) => log_debug!("Cached {} bookings", bookings.len()),
            Err(err) => error!("Failed to write booking snapshot: {err:#}"),
        }
    }

    async fn persist_works(&self) {
        let _turn = self.persist.lock().await;
        let works = self.read_state().works.clone();
        if let Err(err) = self.cache.replace_works(&works).await {
            error!("Failed to write works snapshot: {err:#}");
        }
    }

    // Favorites

    /// Local read only; never touches the network.
    pub fn is_favorited(&self, work_id: &str) -> bool {
        self.read_state().is_favorited(work_id)
    }

    pub fn favorites(&self) -> Vec<LocalFavorite> {
        self.read_state().favorites.clone()
    }

    pub fn favorite_stats(&self) -> FavoriteStats {
        self.read_state().favorite_stats()
    }

    /// Flip the favorite bit for a work on this device and return the new value.
    ///
    /// The remote copy is updated in the background; if that write fails the
    /// local toggle stands.
    pub async fn toggle_favorite(&self, work_id: &str) -> Result<bool> {
        let favorited = if self.is_favorited(work_id) {
            self.cache.remove_favorite(work_id).await?;
            self.dispatch(StateCommand::RemoveFavorite(work_id.to_string()));
            false
        } else {
            let favorite = {
                let state = self.read_state();
                let work = state.work(work_id);
                LocalFavorite {
                    work_id: work_id.to_string(),
                    style: work.map(|work| work.style.clone()).unwrap_or_default(),
                    cover_url: work.and_then(|work| work.cover_url().map(str::to_string)),
                    added_at: now(),
                }
            };
            self.cache.put_favorite(&favorite).await?;
            self.dispatch(StateCommand::AddFavorite(favorite));
            true
        };

        self.push_remote_favorite(work_id);
        Ok(favorited)
    }

    fn push_remote_favorite(&self, work_id: &str) {
        let this = self.clone();
        let work_id = work_id.to_string();

        let handle = tokio::spawn(async move {
            let _gate = this.sequencer.lock(&format!("favorite:{work_id}")).await;
            // Send the device's current bit, not the toggle that queued this write.
            let favorited = this.is_favorited(&work_id);
            let result = this
                .with_timeout(
                    "setFavorite",
                    this.backend.set_favorite(&this.caller, &work_id, favorited),
                )
                .await;
            match result {
                Ok(()) => log_info!("Remote favorite for {} set to {}", work_id, favorited),
                Err(err) => log::warn!(
                    "Remote favorite for {work_id} not updated, keeping local value {favorited}: {err}"
                ),
            }
        });
        self.track(handle);
    }

    /// Empty this device's favorites. The remote favorites collection is not touched.
    pub async fn clear_favorites(&self) -> Result<usize> {
        let removed = self.cache.clear_favorites().await?;
        self.dispatch(StateCommand::ClearFavorites);
        log_info!("Cleared {} local favorites", removed);
        Ok(removed)
    }

    // Works

    /// First page of a photographer's works. Falls back to the cached
    /// snapshot when the remote store cannot be reached.
    pub async fn load_works(
        &self,
        photographer_id: &str,
        style: Option<&str>,
    ) -> ServiceResult<ListView<Work>> {
        let request = ListWorksRequest {
            photographer_id: photographer_id.to_string(),
            style: style.map(str::to_string),
            page: 1,
            page_size: self.options.page_size,
        };
        let result = self
            .with_timeout("getWorks", self.backend.list_works(&self.caller, request))
            .await;

        match RemoteOutcome::from(result) {
            RemoteOutcome::Confirmed(page) => {
                let works: Vec<Work> = page.items.into_iter().map(|listing| listing.work).collect();
                self.dispatch(StateCommand::ReplaceWorks(works.clone()));
                self.persist_works().await;
                Ok(ListView {
                    items: works,
                    source: ViewSource::Remote,
                })
            }
            RemoteOutcome::Unreachable(reason) => {
                log_warn!("Showing cached works: {}", reason);
                let items = self.read_state().works.clone();
                Ok(ListView {
                    items,
                    source: ViewSource::LocalSnapshot,
                })
            }
            RemoteOutcome::Rejected(err) => Err(err),
        }
    }

    /// Remote-authoritative delete; the local snapshot follows only after
    /// the remote store accepted it.
    pub async fn delete_work(&self, work_id: &str) -> ServiceResult<DeletedWork> {
        let this = self.clone();
        let work_id = work_id.to_string();
        Self::detached(async move { this.settle_delete(work_id).await }).await
    }

    async fn settle_delete(&self, work_id: String) -> ServiceResult<DeletedWork> {
        let request = DeleteWorkRequest {
            work_id: Some(work_id),
        };
        let deleted = self
            .with_timeout("deleteWork", self.backend.delete_work(&self.caller, request))
            .await?;

        // The remote store already accepted the delete; a cache failure must not
        // keep the work on screen.
        if let Err(err) = self.cache.remove_favorite(&deleted.work_id).await {
            error!("Failed to drop cached favorite {}: {err:#}", deleted.work_id);
        }
        self.dispatch(StateCommand::RemoveWork(deleted.work_id.clone()));
        self.persist_works().await;
        Ok(deleted)
    }

    // Bookings

    /// Refresh the booking snapshot from the remote store.
    ///
    /// A successful listing replaces unconfirmed local entries outright, apart
    /// from bookings whose own reconciliation finished after the listing was
    /// requested. When the remote store is unreachable the snapshot is
    /// returned as-is.
    pub async fn load_bookings(
        &self,
        direction: Direction,
    ) -> ServiceResult<ListView<Tracked<Booking>>> {
        let watermark = self.sequencer.watermark();
        let request = ListBookingsRequest {
            direction,
            status_filter: None,
        };
        let result = self
            .with_timeout("getBookings", self.backend.list_bookings(&self.caller, request))
            .await;

        match RemoteOutcome::from(result) {
            RemoteOutcome::Confirmed(remote) => {
                let merged = {
                    let mut state = self.write_state();
                    let keep = self.sequencer.committed_since(&watermark);
                    let merged = merge_snapshot(&state.bookings, remote, &keep);
                    *state = state.apply(StateCommand::ReplaceBookings(merged.clone()));
                    merged
                };
                self.persist_bookings().await;
                Ok(ListView {
                    items: merged,
                    source: ViewSource::Remote,
                })
            }
            RemoteOutcome::Unreachable(reason) => {
                log_warn!("Showing cached bookings: {}", reason);
                let items = self.read_state().bookings.clone();
                Ok(ListView {
                    items,
                    source: ViewSource::LocalSnapshot,
                })
            }
            RemoteOutcome::Rejected(err) => Err(err),
        }
    }

    /// Submit a booking.
    ///
    /// Missing required fields fail before anything is written. Otherwise a
    /// provisional booking is shown immediately; the result is the
    /// server-confirmed booking, or the still-pending provisional one when the
    /// remote store could not be reached.
    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> ServiceResult<Tracked<Booking>> {
        let valid = request.validate()?;
        let provisional = valid.into_booking(
            format!("{PROVISIONAL_PREFIX}{}", Uuid::new_v4().simple()),
            &self.caller,
            &PhotographerSnapshot::default(),
            now(),
        );

        let this = self.clone();
        Self::detached(async move { this.settle_create(request, provisional).await }).await
    }

    async fn settle_create(
        &self,
        request: CreateBookingRequest,
        provisional: Booking,
    ) -> ServiceResult<Tracked<Booking>> {
        let guard = self.sequencer.lock(&provisional.id).await;

        let shown = Tracked::pending(provisional.clone(), now());
        self.dispatch(StateCommand::UpsertBooking(shown.clone()));
        self.persist_bookings().await;

        let outcome: RemoteOutcome<Booking> = self
            .with_timeout("createBooking", self.backend.create_booking(&self.caller, request))
            .await
            .into();
        let merged = reconcile(
            PendingWrite {
                before: None,
                after: shown,
            },
            outcome,
        );

        {
            let mut state = self.write_state();
            let mut next = state.apply(StateCommand::RemoveBooking(provisional.id.clone()));
            if let Some(view) = merged.view() {
                next = next.apply(StateCommand::UpsertBooking(view.clone()));
            }
            *state = next;
            guard.commit();
            if let Reconciled::Confirmed(confirmed) = &merged {
                guard.commit_alias(&confirmed.value.id);
            }
        }
        self.persist_bookings().await;

        match merged {
            Reconciled::Confirmed(confirmed) => {
                log_info!(
                    "Booking {} confirmed as {}",
                    provisional.id,
                    confirmed.value.id
                );
                if let Err(err) = self
                    .cache
                    .clear_draft(&draft_key(&provisional.photographer_id))
                    .await
                {
                    error!("Failed to clear booking draft: {err:#}");
                }
                Ok(confirmed)
            }
            Reconciled::Retained(pending) => {
                log_warn!("Booking {} kept as unconfirmed", provisional.id);
                Ok(pending)
            }
            Reconciled::RolledBack { reason, .. } => {
                log_warn!("Booking {} rejected: {}", provisional.id, reason);
                Err(reason)
            }
        }
    }

    /// Move a booking to `status`.
    ///
    /// When the booking is in the local snapshot the transition is checked
    /// against it and shown optimistically; the remote store checks again.
    pub async fn update_booking_status(
        &self,
        booking_id: &str,
        status: &str,
        note: Option<String>,
    ) -> ServiceResult<Tracked<Booking>> {
        let booking_id = booking_id.trim();
        if booking_id.is_empty() {
            return Err(ServiceError::MissingParameters(vec!["bookingId"]));
        }
        let target = parse_target(status)?;
        let note = note.filter(|note| !note.trim().is_empty());

        let this = self.clone();
        let booking_id = booking_id.to_string();
        Self::detached(async move { this.settle_transition(booking_id, target, note).await }).await
    }

    async fn settle_transition(
        &self,
        booking_id: String,
        target: BookingStatus,
        note: Option<String>,
    ) -> ServiceResult<Tracked<Booking>> {
        let guard = self.sequencer.lock(&booking_id).await;

        let before = self.read_state().booking(&booking_id).cloned();
        let optimistic = match &before {
            Some(current) => match check_transition(current.value.status, target)? {
                Transition::Unchanged(_) => None,
                Transition::Advance { to, .. } => {
                    let mut next = current.value.clone();
                    next.status = to;
                    if note.is_some() {
                        next.note = note.clone();
                    }
                    next.updated_at = next_updated_at(current.value.updated_at, now());
                    Some(Tracked::pending(next, now()))
                }
            },
            None => None,
        };

        if let Some(shown) = &optimistic {
            self.dispatch(StateCommand::UpsertBooking(shown.clone()));
            self.persist_bookings().await;
        }

        let request = UpdateBookingRequest {
            booking_id: Some(booking_id.clone()),
            status: Some(target.as_str().to_string()),
            note,
        };
        let outcome: RemoteOutcome<Booking> = self
            .with_timeout(
                "updateBooking",
                self.backend.update_booking_status(&self.caller, request),
            )
            .await
            .into();

        let shown = optimistic.or_else(|| before.clone());
        let merged = match shown.clone() {
            Some(after) => reconcile(PendingWrite { before, after }, outcome),
            None => match outcome {
                RemoteOutcome::Confirmed(booking) => {
                    Reconciled::Confirmed(Tracked::confirmed(booking))
                }
                RemoteOutcome::Rejected(reason) => return Err(reason),
                RemoteOutcome::Unreachable(reason) => {
                    return Err(ServiceError::RemoteUnavailable(reason))
                }
            },
        };

        let applied = {
            let mut state = self.write_state();
            let current = state.booking(&booking_id).cloned();
            // A listing may have replaced the entry while the call was out;
            // only a confirmed record is newer than that.
            let stale = !matches!(merged, Reconciled::Confirmed(_)) && current != shown;
            if !stale {
                if let Some(view) = merged.view() {
                    *state = state.apply(StateCommand::UpsertBooking(view.clone()));
                }
                guard.commit();
            }
            !stale
        };

        if applied {
            self.persist_bookings().await;
        } else {
            log_warn!(
                "Dropped stale outcome for booking {}; snapshot already refreshed",
                booking_id
            );
        }

        match merged {
            Reconciled::Confirmed(confirmed) => Ok(confirmed),
            Reconciled::Retained(pending) => {
                log_warn!("Booking {} transition to {} unconfirmed", booking_id, target);
                Ok(pending)
            }
            Reconciled::RolledBack { reason, .. } => Err(reason),
        }
    }

    // Drafts

    pub async fn save_booking_draft(&self, draft: &CreateBookingRequest) -> Result<()> {
        let photographer_id = draft
            .photographer_id
            .as_deref()
            .unwrap_or(DEFAULT_DRAFT_PHOTOGRAPHER);
        self.cache.save_draft(&draft_key(photographer_id), draft).await
    }

    pub async fn booking_draft(&self, photographer_id: &str) -> Result<Option<CreateBookingRequest>> {
        self.cache.load_draft(&draft_key(photographer_id)).await
    }

    pub async fn clear_booking_draft(&self, photographer_id: &str) -> Result<bool> {
        self.cache.clear_draft(&draft_key(photographer_id)).await
    }
}
