pub mod connection;
pub mod helpers;
pub mod migrations;
pub mod models;
pub mod repositories;

pub use connection::Database;
pub use migrations::Schema;
pub use models::{
    ActorRole, Booking, BookingStatus, Comment, DeletedWork, Favorite, FavoriteStats, LocalFavorite,
    Notification, Photographer, TransitionRecord, Work, WorkListing, WorkPage, WorkPhoto,
};
pub use repositories::bookings::BookingScope;
