pub mod bookings;
pub mod comments;
pub mod favorites;
pub mod notifications;
pub mod photographers;
pub mod works;
