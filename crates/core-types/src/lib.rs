//! # Rideshare Core Types
//!
//! Plain records shared by every layer of the persistence stack. Nothing in this
//! crate performs I/O; rows are converted into these types at the database
//! boundary and handed to callers fully materialized.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::BookingStatus;
pub use error::CoreError;
pub use structs::{Booking, NewBooking, NewReview, NewRide, NewUser, Review, Ride, User};
