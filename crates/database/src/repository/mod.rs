//! Explicit query methods for each table.
//!
//! Every method takes a `&mut PgConnection`, so it runs inside whatever
//! transaction the caller holds (pass `&mut session`). Results are fully
//! materialized; related rows are fetched by dedicated methods such as
//! [`BookingRepository::get_ride_for_booking`], never implicitly.

pub mod bookings;
pub mod reviews;
pub mod rides;
pub mod users;

pub use bookings::BookingRepository;
pub use reviews::{RatingSummary, ReviewRepository};
pub use rides::RideRepository;
pub use users::UserRepository;
