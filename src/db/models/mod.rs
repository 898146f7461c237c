pub mod booking;
pub mod comment;
pub mod favorite;
pub mod notification;
pub mod photographer;
pub mod transition;
pub mod work;

pub use booking::{Booking, BookingStatus};
pub use comment::Comment;
pub use favorite::{Favorite, FavoriteStats, LocalFavorite};
pub use notification::Notification;
pub use photographer::Photographer;
pub use transition::{ActorRole, TransitionRecord};
pub use work::{DeletedWork, Work, WorkListing, WorkPage, WorkPhoto};
