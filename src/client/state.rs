//! Explicit client state container.
//!
//! [`AppState`] is a plain value; every change goes through a
//! [`StateCommand`] and [`AppState::apply`] returns the next state, leaving
//! the current one untouched.

use serde::{Deserialize, Serialize};

use crate::{
    db::{Booking, FavoriteStats, LocalFavorite, Work},
    sync::Tracked,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub photographer_mode: bool,
    pub works: Vec<Work>,
    /// Newest first.
    pub bookings: Vec<Tracked<Booking>>,
    /// Newest first.
    pub favorites: Vec<LocalFavorite>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateCommand {
    SetPhotographerMode(bool),
    ReplaceWorks(Vec<Work>),
    RemoveWork(String),
    ReplaceBookings(Vec<Tracked<Booking>>),
    UpsertBooking(Tracked<Booking>),
    RemoveBooking(String),
    AddFavorite(LocalFavorite),
    RemoveFavorite(String),
    ClearFavorites,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, command: StateCommand) -> AppState {
        let mut next = self.clone();
        match command {
            StateCommand::SetPhotographerMode(enabled) => next.photographer_mode = enabled,
            StateCommand::ReplaceWorks(works) => next.works = works,
            StateCommand::RemoveWork(work_id) => {
                next.works.retain(|work| work.id != work_id);
                next.favorites.retain(|favorite| favorite.work_id != work_id);
            }
            StateCommand::ReplaceBookings(bookings) => next.bookings = bookings,
            StateCommand::UpsertBooking(tracked) => {
                match next
                    .bookings
                    .iter_mut()
                    .find(|existing| existing.value.id == tracked.value.id)
                {
                    Some(existing) => *existing = tracked,
                    None => next.bookings.push(tracked),
                }
                next.bookings
                    .sort_by(|a, b| b.value.created_at.cmp(&a.value.created_at));
            }
            StateCommand::RemoveBooking(booking_id) => {
                next.bookings.retain(|tracked| tracked.value.id != booking_id)
            }
            StateCommand::AddFavorite(favorite) => {
                if !next.is_favorited(&favorite.work_id) {
                    next.favorites.insert(0, favorite);
                }
            }
            StateCommand::RemoveFavorite(work_id) => {
                next.favorites.retain(|favorite| favorite.work_id != work_id)
            }
            StateCommand::ClearFavorites => next.favorites.clear(),
        }
        next
    }

    pub fn is_favorited(&self, work_id: &str) -> bool {
        self.favorites.iter().any(|favorite| favorite.work_id == work_id)
    }

    pub fn booking(&self, booking_id: &str) -> Option<&Tracked<Booking>> {
        self.bookings
            .iter()
            .find(|tracked| tracked.value.id == booking_id)
    }

    pub fn work(&self, work_id: &str) -> Option<&Work> {
        self.works.iter().find(|work| work.id == work_id)
    }

    pub fn favorite_stats(&self) -> FavoriteStats {
        FavoriteStats::from_favorites(&self.favorites)
    }

    pub fn unconfirmed_bookings(&self) -> impl Iterator<Item = &Tracked<Booking>> {
        self.bookings.iter().filter(|tracked| !tracked.is_confirmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::helpers::now;

    fn favorite(work_id: &str, style: &str) -> LocalFavorite {
        LocalFavorite {
            work_id: work_id.into(),
            style: style.into(),
            cover_url: None,
            added_at: now(),
        }
    }

    #[test]
    fn apply_returns_new_state_without_touching_old() {
        let empty = AppState::new();
        let one = empty.apply(StateCommand::AddFavorite(favorite("wk_1", "人像")));
        assert!(!empty.is_favorited("wk_1"));
        assert!(one.is_favorited("wk_1"));

        let again = one.apply(StateCommand::AddFavorite(favorite("wk_1", "人像")));
        assert_eq!(again.favorites.len(), 1);

        let back = again.apply(StateCommand::RemoveFavorite("wk_1".into()));
        assert_eq!(back, empty);
    }

    #[test]
    fn stats_group_by_style() {
        let state = AppState::new()
            .apply(StateCommand::AddFavorite(favorite("wk_1", "人像")))
            .apply(StateCommand::AddFavorite(favorite("wk_2", "人像")))
            .apply(StateCommand::AddFavorite(favorite("wk_3", "风光")));
        let stats = state.favorite_stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_style["人像"], 2);
        assert_eq!(stats.by_style["风光"], 1);

        assert_eq!(state.apply(StateCommand::ClearFavorites).favorite_stats().total, 0);
    }
}
