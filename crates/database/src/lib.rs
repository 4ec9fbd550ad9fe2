//! # Rideshare Database Crate
//!
//! This crate is the application's only route to the PostgreSQL store. It owns
//! the connection pool, the transactional session contract, the schema
//! migrations and the queries for bookings, reviews, rides and users.
//!
//! ## Architectural Principles
//!
//! - **Explicit lifecycle:** a [`ConnectionManager`] is constructed, initialized
//!   once at startup and shut down once at exit. It is passed to whoever needs
//!   it; there is no global state.
//! - **Unit of work:** every read and write happens inside a [`Session`]. A
//!   scoped session commits on success and rolls back on failure, and its
//!   connection always returns to the pool.
//! - **Store-enforced integrity:** seat counts, ratings, amounts, statuses and
//!   review uniqueness are checked by constraints in `migrations/`, and their
//!   violations surface as typed [`DbError`] variants.
//! - **No hidden I/O:** relationships are loaded by explicit repository methods.
//!
//! ## Public API
//!
//! - `ConnectionManager`: pool lifecycle, `acquire_session`, `with_session`, `run_migrations`.
//! - `Session` / `UnitOfWork` / `scoped`: the transactional scope.
//! - `BookingRepository`, `ReviewRepository`, `RideRepository`, `UserRepository`.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;
pub mod session;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{ConnectionManager, MIGRATOR, NormalizedUrl, PoolStatus, normalize_url};
pub use error::DbError;
pub use repository::{
    BookingRepository, RatingSummary, ReviewRepository, RideRepository, UserRepository,
};
pub use session::{Session, UnitOfWork, scoped};
