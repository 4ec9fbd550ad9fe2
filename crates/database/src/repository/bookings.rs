use chrono::{DateTime, Utc};
use core_types::{Booking, BookingStatus, NewBooking, Ride, User};
use rust_decimal::Decimal;
use sqlx::FromRow;
use sqlx::postgres::PgConnection;
use uuid::Uuid;

use super::rides::RideRow;
use super::users::UserRow;
use crate::error::DbError;

const BOOKING_COLUMNS: &str =
    "id, ride_id, passenger_id, seats_reserved, amount_paid, status, booked_at";

/// Represents a row from the `bookings` table. `status` stays a string until
/// it is checked against [`BookingStatus`].
#[derive(Debug, Clone, FromRow)]
struct BookingRow {
    id: Uuid,
    ride_id: Uuid,
    passenger_id: Uuid,
    seats_reserved: i32,
    amount_paid: Decimal,
    status: String,
    booked_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = DbError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            ride_id: row.ride_id,
            passenger_id: row.passenger_id,
            seats_reserved: row.seats_reserved,
            amount_paid: row.amount_paid,
            status: row.status.parse().map_err(DbError::Decode)?,
            booked_at: row.booked_at,
        })
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>, DbError> {
    rows.into_iter().map(Booking::try_from).collect()
}

pub struct BookingRepository;

impl BookingRepository {
    /// Inserts a booking. Seat count, amount and status are checked by the
    /// store; a violation comes back as [`DbError::CheckViolation`]. The new
    /// booking is `pending` and, unless an amount is given, unpaid (0.00).
    pub async fn create(conn: &mut PgConnection, booking: &NewBooking) -> Result<Booking, DbError> {
        let row = match booking.amount_paid {
            Some(amount) => {
                let sql = format!(
                    "INSERT INTO bookings (ride_id, passenger_id, seats_reserved, amount_paid)
                     VALUES ($1, $2, $3, $4)
                     RETURNING {BOOKING_COLUMNS}"
                );
                sqlx::query_as::<_, BookingRow>(&sql)
                    .bind(booking.ride_id)
                    .bind(booking.passenger_id)
                    .bind(booking.seats_reserved)
                    .bind(amount)
                    .fetch_one(&mut *conn)
                    .await?
            }
            None => {
                let sql = format!(
                    "INSERT INTO bookings (ride_id, passenger_id, seats_reserved)
                     VALUES ($1, $2, $3)
                     RETURNING {BOOKING_COLUMNS}"
                );
                sqlx::query_as::<_, BookingRow>(&sql)
                    .bind(booking.ride_id)
                    .bind(booking.passenger_id)
                    .bind(booking.seats_reserved)
                    .fetch_one(&mut *conn)
                    .await?
            }
        };

        let created = Booking::try_from(row)?;
        tracing::debug!(booking_id = %created.id, ride_id = %created.ride_id, seats = created.seats_reserved, "Booking created.");
        Ok(created)
    }

    pub async fn get(conn: &mut PgConnection, id: Uuid) -> Result<Option<Booking>, DbError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .map(Booking::try_from)
            .transpose()
    }

    /// All bookings on a ride, oldest first.
    pub async fn list_for_ride(conn: &mut PgConnection, ride_id: Uuid) -> Result<Vec<Booking>, DbError> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE ride_id = $1 ORDER BY booked_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(ride_id)
            .fetch_all(&mut *conn)
            .await?;
        into_bookings(rows)
    }

    /// A passenger's bookings, newest first.
    pub async fn list_for_passenger(
        conn: &mut PgConnection,
        passenger_id: Uuid,
    ) -> Result<Vec<Booking>, DbError> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE passenger_id = $1 ORDER BY booked_at DESC, id ASC"
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(passenger_id)
            .fetch_all(&mut *conn)
            .await?;
        into_bookings(rows)
    }

    /// The ride a booking refers to, or `None` if the booking does not exist.
    pub async fn get_ride_for_booking(
        conn: &mut PgConnection,
        booking_id: Uuid,
    ) -> Result<Option<Ride>, DbError> {
        let row = sqlx::query_as::<_, RideRow>(
            "SELECT r.id, r.driver_id, r.origin, r.destination, r.departure_time,
                    r.seats_total, r.price_share, r.created_at
             FROM rides AS r
             JOIN bookings AS b ON b.ride_id = r.id
             WHERE b.id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(Ride::from))
    }

    /// The passenger who made a booking, or `None` if the booking does not exist.
    pub async fn get_passenger_for_booking(
        conn: &mut PgConnection,
        booking_id: Uuid,
    ) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT u.id, u.email, u.full_name, u.created_at
             FROM users AS u
             JOIN bookings AS b ON b.passenger_id = u.id
             WHERE b.id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(User::from))
    }

    /// Moves a booking to `next`, enforcing the status state machine.
    ///
    /// The row is locked for the rest of the caller's transaction so two
    /// sessions cannot both move the same booking out of the same state.
    pub async fn update_status(
        conn: &mut PgConnection,
        id: Uuid,
        next: BookingStatus,
    ) -> Result<Booking, DbError> {
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        let current: BookingStatus = current
            .ok_or(DbError::NotFound)?
            .parse()
            .map_err(DbError::Decode)?;

        let next = current
            .transition_to(next)
            .map_err(DbError::InvalidTransition)?;

        let sql = format!("UPDATE bookings SET status = $1 WHERE id = $2 RETURNING {BOOKING_COLUMNS}");
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(next.as_str())
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;

        tracing::info!(booking_id = %id, from = %current, to = %next, "Booking status changed.");
        Booking::try_from(row)
    }

    /// Records the amount paid for a booking. Negative amounts are rejected by
    /// the store's `check_amount_positive` constraint.
    pub async fn record_payment(
        conn: &mut PgConnection,
        id: Uuid,
        amount: Decimal,
    ) -> Result<Booking, DbError> {
        let sql = format!("UPDATE bookings SET amount_paid = $1 WHERE id = $2 RETURNING {BOOKING_COLUMNS}");
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(amount)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(DbError::NotFound)?;
        Booking::try_from(row)
    }
}
