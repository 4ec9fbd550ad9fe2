use chrono::{DateTime, Utc};
use core_types::{NewRide, Ride};
use rust_decimal::Decimal;
use sqlx::FromRow;
use sqlx::postgres::PgConnection;
use uuid::Uuid;

use crate::error::DbError;

pub(crate) const RIDE_COLUMNS: &str =
    "id, driver_id, origin, destination, departure_time, seats_total, price_share, created_at";

/// Represents a row from the `rides` table.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct RideRow {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub seats_total: i32,
    pub price_share: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<RideRow> for Ride {
    fn from(row: RideRow) -> Self {
        Ride {
            id: row.id,
            driver_id: row.driver_id,
            origin: row.origin,
            destination: row.destination,
            departure_time: row.departure_time,
            seats_total: row.seats_total,
            price_share: row.price_share,
            created_at: row.created_at,
        }
    }
}

pub struct RideRepository;

impl RideRepository {
    pub async fn create(conn: &mut PgConnection, ride: &NewRide) -> Result<Ride, DbError> {
        let sql = format!(
            "INSERT INTO rides (driver_id, origin, destination, departure_time, seats_total, price_share)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {RIDE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RideRow>(&sql)
            .bind(ride.driver_id)
            .bind(&ride.origin)
            .bind(&ride.destination)
            .bind(ride.departure_time)
            .bind(ride.seats_total)
            .bind(ride.price_share)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.into())
    }

    pub async fn get(conn: &mut PgConnection, id: Uuid) -> Result<Option<Ride>, DbError> {
        let sql = format!("SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1");
        let row = sqlx::query_as::<_, RideRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(Ride::from))
    }

    /// Deletes a ride. Its bookings and reviews go with it (`ON DELETE CASCADE`).
    /// Returns whether a row was removed.
    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM rides WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
