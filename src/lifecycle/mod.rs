pub mod engine;
pub mod transitions;

pub use engine::{BookingEngine, CreateBookingRequest, ValidBookingRequest};
pub use transitions::{allowed_targets, check_transition, next_updated_at, parse_target, Transition};
