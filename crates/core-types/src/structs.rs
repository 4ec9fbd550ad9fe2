use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::BookingStatus;

/// A passenger's reservation of one or more seats on a ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub passenger_id: Uuid,
    /// Always at least 1 (`check_seats_reserved_positive`).
    pub seats_reserved: i32,
    /// USD, two decimal places, never negative (`check_amount_positive`).
    pub amount_paid: Decimal,
    pub status: BookingStatus,
    pub booked_at: DateTime<Utc>,
}

/// Input for a new booking. The id, status and timestamp come from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub ride_id: Uuid,
    pub passenger_id: Uuid,
    pub seats_reserved: i32,
    /// `None` leaves the column default (0.00) in place.
    #[serde(default)]
    pub amount_paid: Option<Decimal>,
}

impl NewBooking {
    pub fn new(ride_id: Uuid, passenger_id: Uuid, seats_reserved: i32) -> Self {
        Self {
            ride_id,
            passenger_id,
            seats_reserved,
            amount_paid: None,
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount_paid = Some(amount);
        self
    }
}

/// Feedback one participant of a ride leaves about another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    /// 1 (worst) to 5 (best).
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub ride_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

/// The parts of a ride this layer needs to resolve booking and review references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub seats_total: i32,
    pub price_share: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRide {
    pub driver_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub seats_total: i32,
    pub price_share: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
}
